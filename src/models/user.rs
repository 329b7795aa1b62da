use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Public-facing user record exposed to clients.
///
/// Never carries the password hash; the credential side of an account lives
/// exclusively inside the store implementations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UserIdentity {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
