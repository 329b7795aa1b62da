use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Input structure for creating or updating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task. Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Optional free-form notes. Maximum length of 1000 characters.
    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    /// Whether the task is completed.
    #[serde(default)]
    pub done: bool,
}

/// A task entity as stored and as returned by the API.
///
/// Every task is owned by exactly one user; handlers scope all queries by the
/// authenticated user's id, so tasks of other users read as absent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub notes: Option<String>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: i32,
}

impl Task {
    /// Creates a new `Task` from `TaskInput` for the given owner.
    pub fn new(input: TaskInput, user_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            notes: input.notes,
            done: input.done,
            created_at: now,
            updated_at: now,
            user_id,
        }
    }
}
