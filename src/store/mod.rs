//!
//! # Persistence Layer
//!
//! The credential store owns everything password-related: it is the only part
//! of the application that ever sees a password hash, and callers only get
//! back public `UserIdentity` records or typed errors. The task store is the
//! protected resource the session middleware guards; every operation is
//! scoped by the owning user's id.
//!
//! Both stores are traits so the HTTP layer can run against Postgres in
//! production (`postgres` module) and against an in-process map in tests and
//! demos (`memory` module).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::models::{Task, TaskInput, UserIdentity};

pub use memory::{MemoryCredentialStore, MemoryTaskStore};
pub use postgres::{PgCredentialStore, PgTaskStore};

/// Typed failures returned by the stores.
///
/// `EmailTaken`, `NotFound` and `PasswordMismatch` are expected outcomes the
/// HTTP layer translates into client errors; `Hash` and `Storage` are
/// internal faults that surface as 500s and are not retried here.
#[derive(Debug)]
pub enum StoreError {
    EmailTaken,
    NotFound,
    PasswordMismatch,
    Hash(String),
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::EmailTaken => write!(f, "email already registered"),
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::PasswordMismatch => write!(f, "password mismatch"),
            StoreError::Hash(msg) => write!(f, "password hashing failed: {}", msg),
            StoreError::Storage(msg) => write!(f, "storage failure: {}", msg),
        }
    }
}

impl From<bcrypt::BcryptError> for StoreError {
    fn from(error: bcrypt::BcryptError) -> StoreError {
        StoreError::Hash(error.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> StoreError {
        match error {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Storage(other.to_string()),
        }
    }
}

/// Persists user accounts and their password hashes, keyed by email.
///
/// Implementations must make the uniqueness-check-plus-insert of `create`
/// and the read-verify-write of `update_password` atomic per user, so
/// concurrent registrations or profile edits cannot race.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Creates an account. Fails with `EmailTaken` if the email exists.
    /// The plaintext password is hashed before storage and never logged.
    async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, StoreError>;

    /// Checks a password against the stored hash for the given email.
    /// Fails with `NotFound` or `PasswordMismatch`.
    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, StoreError>;

    /// Looks up the public identity for a user id.
    async fn find_by_id(&self, user_id: i32) -> Result<UserIdentity, StoreError>;

    /// Updates username and email. Fails with `EmailTaken` if the new email
    /// collides with a different user.
    async fn update_profile(
        &self,
        user_id: i32,
        username: &str,
        email: &str,
    ) -> Result<UserIdentity, StoreError>;

    /// Replaces the password hash after re-verifying the old password.
    async fn update_password(
        &self,
        user_id: i32,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), StoreError>;
}

/// Persists tasks, always scoped to their owner.
///
/// A task belonging to another user is indistinguishable from a missing one:
/// every lookup fails with `NotFound` rather than leaking existence.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self, user_id: i32) -> Result<Vec<Task>, StoreError>;

    async fn insert(&self, task: Task) -> Result<Task, StoreError>;

    async fn find(&self, user_id: i32, task_id: Uuid) -> Result<Task, StoreError>;

    async fn update(
        &self,
        user_id: i32,
        task_id: Uuid,
        input: TaskInput,
    ) -> Result<Task, StoreError>;

    async fn delete(&self, user_id: i32, task_id: Uuid) -> Result<(), StoreError>;
}
