//! Database queries for the user directory.

use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::User;

const USER_COLUMNS: &str = "id, email, name, is_active, created_at";

/// Activate an existing user or create a new active one for `email`.
///
/// The upsert makes confirmation idempotent: repeated confirmations for the
/// same address reactivate instead of duplicating.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn activate_or_create(pool: &PgPool, email: &str) -> Result<User, sqlx::Error> {
    let query = format!(
        r"
        INSERT INTO users (email, is_active)
        VALUES ($1, TRUE)
        ON CONFLICT (email)
        DO UPDATE SET is_active = TRUE
        RETURNING {USER_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(map_user(&row))
}

/// Insert a new user record. Duplicate emails surface as a unique violation
/// for the caller to translate.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn create(pool: &PgPool, email: &str, name: Option<&str>) -> Result<User, sqlx::Error> {
    let query = format!(
        r"
        INSERT INTO users (email, name)
        VALUES ($1, $2)
        RETURNING {USER_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .bind(name)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(map_user(&row))
}

/// List active users, newest first. Soft-deleted users are excluded here
/// while staying individually fetchable via [`fetch`].
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn list_active(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    let query = format!(
        r"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE is_active
        ORDER BY created_at DESC
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    Ok(rows.iter().map(map_user).collect())
}

/// Fetch a user by id. Intentionally does NOT filter on `is_active`, so a
/// soft-deleted user is still visible to direct lookups.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn fetch(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    let query = format!(
        r"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE id = $1
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    Ok(row.as_ref().map(map_user))
}

/// Update the display name; `None` leaves the stored name untouched.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn update_name(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    let query = format!(
        r"
        UPDATE users
        SET name = COALESCE($2, name)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    Ok(row.as_ref().map(map_user))
}

/// Soft-delete a user and return the updated record.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    let query = format!(
        r"
        UPDATE users
        SET is_active = FALSE
        WHERE id = $1
        RETURNING {USER_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    Ok(row.as_ref().map(map_user))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn map_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
