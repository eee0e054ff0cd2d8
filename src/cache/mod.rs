//! Ephemeral verification store.
//!
//! A bounded in-process cache mapping an opaque request token to the pending
//! `{email, code}` pair, keyed under the `auth:email:` namespace. Entries
//! carry their own TTL and are gone after expiry or explicit deletion.
//! Eviction under memory pressure is acceptable loss: verification codes are
//! short-lived and re-requestable.

use moka::{sync::Cache, Expiry};
use std::time::{Duration, Instant};

const KEY_PREFIX: &str = "auth:email:";

/// A code request waiting for confirmation. Keyed by request token, not by
/// email, so concurrent pending verifications for one address stay
/// independent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingVerification {
    pub email: String,
    pub code: String,
}

#[derive(Clone, Debug)]
struct Entry {
    value: PendingVerification,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// TTL keyed cache for pending verifications. Point lookups only; per-key
/// operations are atomic, so racing confirmations resolve to a single
/// winner.
#[derive(Clone)]
pub struct VerificationStore {
    cache: Cache<String, Entry>,
}

impl VerificationStore {
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .name("verification")
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    pub fn set(&self, token: &str, value: PendingVerification, ttl: Duration) {
        self.cache.insert(Self::key(token), Entry { value, ttl });
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<PendingVerification> {
        self.cache.get(&Self::key(token)).map(|entry| entry.value)
    }

    pub fn delete(&self, token: &str) {
        self.cache.invalidate(&Self::key(token));
    }

    fn key(token: &str) -> String {
        format!("{KEY_PREFIX}{token}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TTL: Duration = Duration::from_secs(600);

    fn pending(email: &str, code: &str) -> PendingVerification {
        PendingVerification {
            email: email.to_string(),
            code: code.to_string(),
        }
    }

    #[test]
    fn set_get_delete() {
        let store = VerificationStore::new(100);
        store.set("t1", pending("a@example.com", "123456"), TTL);

        assert_eq!(store.get("t1"), Some(pending("a@example.com", "123456")));

        store.delete("t1");
        assert_eq!(store.get("t1"), None);
    }

    #[test]
    fn get_absent_token() {
        let store = VerificationStore::new(100);
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let store = VerificationStore::new(100);
        store.set(
            "short",
            pending("a@example.com", "123456"),
            Duration::from_millis(50),
        );
        assert!(store.get("short").is_some());

        sleep(Duration::from_millis(120));
        assert_eq!(store.get("short"), None);
    }

    #[test]
    fn entries_carry_independent_ttls() {
        let store = VerificationStore::new(100);
        store.set(
            "short",
            pending("a@example.com", "111111"),
            Duration::from_millis(50),
        );
        store.set("long", pending("a@example.com", "222222"), TTL);

        sleep(Duration::from_millis(120));
        assert_eq!(store.get("short"), None);
        assert_eq!(store.get("long"), Some(pending("a@example.com", "222222")));
    }

    #[test]
    fn same_email_multiple_tokens_are_independent() {
        let store = VerificationStore::new(100);
        store.set("t1", pending("a@example.com", "111111"), TTL);
        store.set("t2", pending("a@example.com", "222222"), TTL);

        store.delete("t1");

        assert_eq!(store.get("t1"), None);
        assert_eq!(store.get("t2"), Some(pending("a@example.com", "222222")));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = VerificationStore::new(100);
        store.set("t1", pending("a@example.com", "123456"), TTL);
        store.delete("t1");
        store.delete("t1");
        assert_eq!(store.get("t1"), None);
    }
}
