use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::models::{Task, TaskInput, UserIdentity};
use crate::store::{CredentialStore, StoreError, TaskStore};

/// Postgres-backed credential store.
///
/// Uniqueness of emails is enforced by the `users_email_key` unique index;
/// the insert itself is the atomic check. Password changes run inside a
/// transaction with the row locked, so concurrent changes to one user
/// serialize at the database.
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i32,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
    password_hash: String,
}

impl CredentialRow {
    fn into_parts(self) -> (UserIdentity, String) {
        (
            UserIdentity {
                id: self.id,
                username: self.username,
                email: self.email,
                created_at: self.created_at,
            },
            self.password_hash,
        )
    }
}

fn map_unique(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::EmailTaken,
        _ => StoreError::from(error),
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, StoreError> {
        let password_hash = hash_password(password)?;

        sqlx::query_as::<_, UserIdentity>(
            "INSERT INTO users (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING id, username, email, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique)
    }

    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, username, email, created_at, password_hash
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        let (identity, password_hash) = row.into_parts();
        if verify_password(password, &password_hash)? {
            Ok(identity)
        } else {
            Err(StoreError::PasswordMismatch)
        }
    }

    async fn find_by_id(&self, user_id: i32) -> Result<UserIdentity, StoreError> {
        sqlx::query_as::<_, UserIdentity>(
            "SELECT id, username, email, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn update_profile(
        &self,
        user_id: i32,
        username: &str,
        email: &str,
    ) -> Result<UserIdentity, StoreError> {
        sqlx::query_as::<_, UserIdentity>(
            "UPDATE users SET username = $2, email = $3
             WHERE id = $1
             RETURNING id, username, email, created_at",
        )
        .bind(user_id)
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique)?
        .ok_or(StoreError::NotFound)
    }

    async fn update_password(
        &self,
        user_id: i32,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock so the verify-then-replace cannot interleave with a
        // concurrent change for the same user.
        let stored_hash = sqlx::query_as::<_, (String,)>(
            "SELECT password_hash FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?
        .0;

        if !verify_password(old_password, &stored_hash)? {
            return Err(StoreError::PasswordMismatch);
        }

        let new_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(new_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Postgres-backed task store. All queries are scoped by the owner's id.
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn list(&self, user_id: i32) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT id, title, notes, done, created_at, updated_at, user_id
             FROM tasks WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        let inserted = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (id, title, notes, done, created_at, updated_at, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, title, notes, done, created_at, updated_at, user_id",
        )
        .bind(task.id)
        .bind(task.title)
        .bind(task.notes)
        .bind(task.done)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn find(&self, user_id: i32, task_id: Uuid) -> Result<Task, StoreError> {
        sqlx::query_as::<_, Task>(
            "SELECT id, title, notes, done, created_at, updated_at, user_id
             FROM tasks WHERE id = $1 AND user_id = $2",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        user_id: i32,
        task_id: Uuid,
        input: TaskInput,
    ) -> Result<Task, StoreError> {
        sqlx::query_as::<_, Task>(
            "UPDATE tasks SET title = $1, notes = $2, done = $3, updated_at = now()
             WHERE id = $4 AND user_id = $5
             RETURNING id, title, notes, done, created_at, updated_at, user_id",
        )
        .bind(input.title)
        .bind(input.notes)
        .bind(input.done)
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, user_id: i32, task_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
