use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::models::{Task, TaskInput, UserIdentity};
use crate::store::{CredentialStore, StoreError, TaskStore};

struct UserRecord {
    identity: UserIdentity,
    password_hash: String,
}

/// In-process credential store backed by a map under a single `RwLock`.
///
/// The whole-map write lock makes the uniqueness check and insert of
/// `create`, and the read-verify-write of `update_password`, atomic without
/// any further coordination. Used by the test suites and by demo setups that
/// run without a database.
pub struct MemoryCredentialStore {
    inner: RwLock<CredentialInner>,
}

struct CredentialInner {
    next_id: i32,
    users: HashMap<i32, UserRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CredentialInner {
                next_id: 1,
                users: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, StoreError> {
        // Hash outside the lock; the uniqueness check below re-runs under it.
        let password_hash = hash_password(password)?;

        let mut inner = self.inner.write().expect("credential store lock poisoned");
        if inner.users.values().any(|r| r.identity.email == email) {
            return Err(StoreError::EmailTaken);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let identity = UserIdentity {
            id,
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        inner.users.insert(
            id,
            UserRecord {
                identity: identity.clone(),
                password_hash,
            },
        );

        Ok(identity)
    }

    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, StoreError> {
        let (identity, password_hash) = {
            let inner = self.inner.read().expect("credential store lock poisoned");
            let record = inner
                .users
                .values()
                .find(|r| r.identity.email == email)
                .ok_or(StoreError::NotFound)?;
            (record.identity.clone(), record.password_hash.clone())
        };

        if verify_password(password, &password_hash)? {
            Ok(identity)
        } else {
            Err(StoreError::PasswordMismatch)
        }
    }

    async fn find_by_id(&self, user_id: i32) -> Result<UserIdentity, StoreError> {
        let inner = self.inner.read().expect("credential store lock poisoned");
        inner
            .users
            .get(&user_id)
            .map(|r| r.identity.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn update_profile(
        &self,
        user_id: i32,
        username: &str,
        email: &str,
    ) -> Result<UserIdentity, StoreError> {
        let mut inner = self.inner.write().expect("credential store lock poisoned");

        let collision = inner
            .users
            .values()
            .any(|r| r.identity.email == email && r.identity.id != user_id);
        if collision {
            return Err(StoreError::EmailTaken);
        }

        let record = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        record.identity.username = username.to_string();
        record.identity.email = email.to_string();
        Ok(record.identity.clone())
    }

    async fn update_password(
        &self,
        user_id: i32,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        // The write lock is held across verify-and-replace so concurrent
        // password changes for the same user cannot interleave.
        let mut inner = self.inner.write().expect("credential store lock poisoned");
        let record = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        if !verify_password(old_password, &record.password_hash)? {
            return Err(StoreError::PasswordMismatch);
        }

        record.password_hash = hash_password(new_password)?;
        Ok(())
    }
}

/// In-process task store, map under an `RwLock`.
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self, user_id: i32) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().expect("task store lock poisoned");
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().expect("task store lock poisoned");
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find(&self, user_id: i32, task_id: Uuid) -> Result<Task, StoreError> {
        let tasks = self.tasks.read().expect("task store lock poisoned");
        tasks
            .get(&task_id)
            .filter(|t| t.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        user_id: i32,
        task_id: Uuid,
        input: TaskInput,
    ) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().expect("task store lock poisoned");
        let task = tasks
            .get_mut(&task_id)
            .filter(|t| t.user_id == user_id)
            .ok_or(StoreError::NotFound)?;

        task.title = input.title;
        task.notes = input.notes;
        task.done = input.done;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete(&self, user_id: i32, task_id: Uuid) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().expect("task store lock poisoned");
        match tasks.get(&task_id) {
            Some(t) if t.user_id == user_id => {
                tasks.remove(&task_id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}
