
use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::embeddings::vector::vector_to_blob;

pub struct UserQueries;

impl UserQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, username: &str) -> Result<User> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query("INSERT INTO users (username, created_date) VALUES (?, ?)")
            .bind(username)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create user")?
            .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created user"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, username, created_date FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by id")?;

        Ok(user)
    }

    #[inline]
    pub async fn get_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_date FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

        Ok(user)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, created_date FROM users ORDER BY username",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

        Ok(users)
    }
}

pub struct ProjectQueries;

impl ProjectQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_project: NewProject) -> Result<Project> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO projects (owner_id, name, description, created_date) VALUES (?, ?, ?, ?)",
        )
        .bind(new_project.owner_id)
        .bind(&new_project.name)
        .bind(&new_project.description)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create project")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created project"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, owner_id, name, description, created_date
            FROM projects WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get project by id")?;

        Ok(project)
    }

    /// Fetch a project only if it belongs to `owner_id`
    #[inline]
    pub async fn get_owned(pool: &SqlitePool, id: i64, owner_id: i64) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, owner_id, name, description, created_date
            FROM projects WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get owned project")?;

        Ok(project)
    }

    #[inline]
    pub async fn list_for_owner(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, owner_id, name, description, created_date
            FROM projects WHERE owner_id = ? ORDER BY created_date, id
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list projects")?;

        Ok(projects)
    }

    #[inline]
    pub async fn rename(pool: &SqlitePool, id: i64, name: &str) -> Result<Option<Project>> {
        let result = sqlx::query("UPDATE projects SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to rename project")?;

        if result.rows_affected() == 0 {
            debug!("No project with id {} to rename", id);
            return Ok(None);
        }

        Self::get_by_id(pool, id).await
    }

    /// Delete a project; its columns, tasks, embeddings and chat history cascade
    #[inline]
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete project")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn get_statistics(pool: &SqlitePool, id: i64) -> Result<Option<ProjectStatistics>> {
        let Some(project) = Self::get_by_id(pool, id).await? else {
            return Ok(None);
        };

        let total_columns: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM board_columns WHERE project_id = ?")
                .bind(id)
                .fetch_one(pool)
                .await
                .context("Failed to count columns")?;

        let total_tasks: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tasks t
            JOIN board_columns c ON t.column_id = c.id
            WHERE c.project_id = ?
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to count tasks")?;

        let indexed_tasks: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT e.task_id) FROM task_embeddings e
            JOIN tasks t ON e.task_id = t.id
            JOIN board_columns c ON t.column_id = c.id
            WHERE c.project_id = ?
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to count indexed tasks")?;

        let total_messages = ChatMessageQueries::count_for_project(pool, id).await?;

        Ok(Some(ProjectStatistics {
            project,
            total_columns,
            total_tasks,
            indexed_tasks,
            total_messages,
        }))
    }
}

pub struct ColumnQueries;

impl ColumnQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_column: NewBoardColumn) -> Result<BoardColumn> {
        let position = match new_column.position {
            Some(position) => position,
            None => sqlx::query_scalar(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM board_columns WHERE project_id = ?",
            )
            .bind(new_column.project_id)
            .fetch_one(pool)
            .await
            .context("Failed to compute column position")?,
        };

        let id =
            sqlx::query("INSERT INTO board_columns (project_id, title, position) VALUES (?, ?, ?)")
                .bind(new_column.project_id)
                .bind(&new_column.title)
                .bind(position)
                .execute(pool)
                .await
                .context("Failed to create column")?
                .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created column"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<BoardColumn>> {
        let column = sqlx::query_as::<_, BoardColumn>(
            "SELECT id, project_id, title, position FROM board_columns WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get column by id")?;

        Ok(column)
    }

    /// Fetch a column only if its project belongs to `owner_id`
    #[inline]
    pub async fn get_owned(
        pool: &SqlitePool,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<BoardColumn>> {
        let column = sqlx::query_as::<_, BoardColumn>(
            r#"
            SELECT c.id, c.project_id, c.title, c.position
            FROM board_columns c
            JOIN projects p ON c.project_id = p.id
            WHERE c.id = ? AND p.owner_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get owned column")?;

        Ok(column)
    }

    #[inline]
    pub async fn list_for_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<BoardColumn>> {
        let columns = sqlx::query_as::<_, BoardColumn>(
            r#"
            SELECT id, project_id, title, position
            FROM board_columns WHERE project_id = ? ORDER BY position, id
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
        .context("Failed to list columns")?;

        Ok(columns)
    }

    #[inline]
    pub async fn rename(pool: &SqlitePool, id: i64, title: &str) -> Result<Option<BoardColumn>> {
        let result = sqlx::query("UPDATE board_columns SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to rename column")?;

        if result.rows_affected() == 0 {
            debug!("No column with id {} to rename", id);
            return Ok(None);
        }

        Self::get_by_id(pool, id).await
    }

    /// Delete a column; its tasks and their embeddings cascade
    #[inline]
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM board_columns WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete column")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct TaskQueries;

impl TaskQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_task: NewTask) -> Result<Task> {
        let position = match new_task.position {
            Some(position) => position,
            None => Self::next_position(pool, new_task.column_id).await?,
        };

        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            r#"
            INSERT INTO tasks (column_id, title, description, position, created_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_task.column_id)
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(position)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create task")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created task"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, column_id, title, description, position, created_date
            FROM tasks WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get task by id")?;

        Ok(task)
    }

    /// Fetch a task only if its project belongs to `owner_id`
    #[inline]
    pub async fn get_owned(pool: &SqlitePool, id: i64, owner_id: i64) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.column_id, t.title, t.description, t.position, t.created_date
            FROM tasks t
            JOIN board_columns c ON t.column_id = c.id
            JOIN projects p ON c.project_id = p.id
            WHERE t.id = ? AND p.owner_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get owned task")?;

        Ok(task)
    }

    #[inline]
    pub async fn update(pool: &SqlitePool, id: i64, update: TaskUpdate) -> Result<Option<Task>> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                position = COALESCE(?, position)
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.position)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update task")?;

        if result.rows_affected() == 0 {
            debug!("No task with id {} to update", id);
            return Ok(None);
        }

        Self::get_by_id(pool, id).await
    }

    /// Move a task to the end of another column
    #[inline]
    pub async fn move_to_column(pool: &SqlitePool, id: i64, column_id: i64) -> Result<Option<Task>> {
        let position = Self::next_position(pool, column_id).await?;

        let result = sqlx::query("UPDATE tasks SET column_id = ?, position = ? WHERE id = ?")
            .bind(column_id)
            .bind(position)
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to move task")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::get_by_id(pool, id).await
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete task")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn list_for_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.column_id, t.title, t.description, t.position, t.created_date
            FROM tasks t
            JOIN board_columns c ON t.column_id = c.id
            WHERE c.project_id = ?
            ORDER BY c.position, t.position, t.id
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
        .context("Failed to list tasks for project")?;

        Ok(tasks)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, column_id, title, description, position, created_date
            FROM tasks ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to list all tasks")?;

        Ok(tasks)
    }

    async fn next_position(pool: &SqlitePool, column_id: i64) -> Result<i64> {
        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE column_id = ?",
        )
        .bind(column_id)
        .fetch_one(pool)
        .await
        .context("Failed to compute task position")?;

        Ok(position)
    }
}

pub struct TaskEmbeddingQueries;

impl TaskEmbeddingQueries {
    /// Delete every embedding of the task and insert the fresh one in a single transaction
    #[inline]
    pub async fn replace_for_task(
        pool: &SqlitePool,
        new_embedding: NewTaskEmbedding,
    ) -> Result<TaskEmbedding> {
        let mut tx = pool
            .begin()
            .await
            .context("Failed to begin embedding transaction")?;

        let removed = sqlx::query("DELETE FROM task_embeddings WHERE task_id = ?")
            .bind(new_embedding.task_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete previous task embeddings")?
            .rows_affected();

        let now = Utc::now().naive_utc();
        let dimension = i64::try_from(new_embedding.vector.len())
            .context("Embedding dimension does not fit in i64")?;
        let id = sqlx::query(
            r#"
            INSERT INTO task_embeddings (task_id, text_chunk, embedding, dimension, created_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_embedding.task_id)
        .bind(&new_embedding.text_chunk)
        .bind(vector_to_blob(&new_embedding.vector))
        .bind(dimension)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to insert task embedding")?
        .last_insert_rowid();

        tx.commit()
            .await
            .context("Failed to commit embedding transaction")?;

        debug!(
            "Replaced {} embedding(s) for task {} with embedding {}",
            removed, new_embedding.task_id, id
        );

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created task embedding"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<TaskEmbedding>> {
        let embedding = sqlx::query_as::<_, TaskEmbedding>(
            r#"
            SELECT id, task_id, text_chunk, embedding, dimension, created_date
            FROM task_embeddings WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get task embedding by id")?;

        Ok(embedding)
    }

    #[inline]
    pub async fn list_for_task(pool: &SqlitePool, task_id: i64) -> Result<Vec<TaskEmbedding>> {
        let embeddings = sqlx::query_as::<_, TaskEmbedding>(
            r#"
            SELECT id, task_id, text_chunk, embedding, dimension, created_date
            FROM task_embeddings WHERE task_id = ? ORDER BY id
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
        .context("Failed to list task embeddings")?;

        Ok(embeddings)
    }

    /// Every embedding whose task currently sits in one of the project's columns
    #[inline]
    pub async fn list_for_project(
        pool: &SqlitePool,
        project_id: i64,
    ) -> Result<Vec<TaskEmbedding>> {
        let embeddings = sqlx::query_as::<_, TaskEmbedding>(
            r#"
            SELECT e.id, e.task_id, e.text_chunk, e.embedding, e.dimension, e.created_date
            FROM task_embeddings e
            JOIN tasks t ON e.task_id = t.id
            JOIN board_columns c ON t.column_id = c.id
            WHERE c.project_id = ?
            ORDER BY e.id
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
        .context("Failed to list task embeddings for project")?;

        Ok(embeddings)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<TaskEmbedding>> {
        let embeddings = sqlx::query_as::<_, TaskEmbedding>(
            r#"
            SELECT id, task_id, text_chunk, embedding, dimension, created_date
            FROM task_embeddings ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to list all task embeddings")?;

        Ok(embeddings)
    }
}

pub struct ChatMessageQueries;

impl ChatMessageQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_message: NewChatMessage) -> Result<ChatMessage> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            r#"
            INSERT INTO chat_messages (project_id, user_id, sender, message, created_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_message.project_id)
        .bind(new_message.user_id)
        .bind(new_message.sender)
        .bind(&new_message.message)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create chat message")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created chat message"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<ChatMessage>> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, project_id, user_id, sender, message, created_date
            FROM chat_messages WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get chat message by id")?;

        Ok(message)
    }

    /// One user's conversation within a project, oldest first
    #[inline]
    pub async fn list_for_user_in_project(
        pool: &SqlitePool,
        project_id: i64,
        user_id: i64,
    ) -> Result<Vec<ChatMessage>> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, project_id, user_id, sender, message, created_date
            FROM chat_messages
            WHERE project_id = ? AND user_id = ?
            ORDER BY created_date, id
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list chat messages")?;

        Ok(messages)
    }

    #[inline]
    pub async fn count_for_project(pool: &SqlitePool, project_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE project_id = ?")
                .bind(project_id)
                .fetch_one(pool)
                .await
                .context("Failed to count chat messages")?;

        Ok(count)
    }
}
