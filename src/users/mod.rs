//! User directory backed by Postgres.
//!
//! Schema lives in `db/schema.sql`. Email uniqueness is enforced here by the
//! database constraint, not by callers.

pub mod repo;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A directory record. `is_active = false` is a soft delete: the record
/// stays fetchable by id but disappears from listings.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
