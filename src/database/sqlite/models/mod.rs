
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use crate::embeddings::vector::vector_from_blob;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BoardColumn {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBoardColumn {
    pub project_id: i64,
    pub title: String,
    /// Appended after the last column when absent
    pub position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Appended after the last task of the column when absent
    pub position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<i64>,
}

/// Derived index entry for a task; regenerated whenever the task is saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaskEmbedding {
    pub id: i64,
    pub task_id: i64,
    pub text_chunk: String,
    /// Little-endian `f32` values
    pub embedding: Vec<u8>,
    pub dimension: i64,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskEmbedding {
    pub task_id: i64,
    pub text_chunk: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Question typed by a person
    User,
    /// Answer produced by the assistant
    Ai,
}

impl std::fmt::Display for Sender {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Sender::User => write!(f, "user"),
            Sender::Ai => write!(f, "ai"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub sender: Sender,
    pub message: String,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub project_id: i64,
    pub user_id: i64,
    pub sender: Sender,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatistics {
    pub project: Project,
    pub total_columns: i64,
    pub total_tasks: i64,
    pub indexed_tasks: i64,
    pub total_messages: i64,
}

impl TaskEmbedding {
    /// Decode the stored vector
    #[inline]
    pub fn vector(&self) -> Vec<f32> {
        vector_from_blob(&self.embedding)
    }
}

impl ChatMessage {
    #[inline]
    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}

impl ProjectStatistics {
    /// Tasks whose embedding is missing
    #[inline]
    pub fn unindexed_tasks(&self) -> i64 {
        (self.total_tasks - self.indexed_tasks).max(0)
    }
}
