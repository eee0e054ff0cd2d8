//! # Sesamo (Passwordless Email Authentication API)
//!
//! `sesamo` issues short-lived email confirmation codes and exchanges them
//! for JWT session cookies. There are no passwords: a client requests a code
//! for an email address, confirms it, and receives an `HttpOnly` session
//! cookie. Users are created (or reactivated) on first successful
//! confirmation.
//!
//! ## Verification flow
//!
//! - `POST /api/v1/auth/request-code` mints an opaque request token, stores
//!   the pending `{email, code}` pair in a bounded TTL cache, and dispatches
//!   the code over SMTP (best effort — delivery failures are logged, never
//!   fatal).
//! - `POST /api/v1/auth/confirm-code` validates the code against the exact
//!   token it was minted with, upserts the user, consumes the token, and
//!   sets the session cookie. A failed code match does not consume the
//!   token, so the client may retry until the entry expires.
//! - `POST /api/v1/auth/refresh` re-signs the verified session payload with
//!   a fresh expiry without touching the user directory.
//!
//! ## Users
//!
//! Standard CRUD behind the session cookie. Deletion is soft: `DELETE`
//! flips `is_active` and returns the record. Listings only include active
//! users, while lookup-by-id intentionally returns inactive ones as well.

pub mod api;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod mail;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
