use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

pub use models::*;
pub use queries::*;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_url: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_url)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        let db_path = config_dir.join("board.db");

        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(&db_path).await
    }

    // User operations
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserQueries::get_by_username(&self.pool, username).await
    }

    // Task operations
    pub async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>> {
        TaskQueries::get_by_id(&self.pool, id).await
    }

    pub async fn get_tasks_for_project(&self, project_id: i64) -> Result<Vec<Task>> {
        TaskQueries::list_for_project(&self.pool, project_id).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        TaskQueries::list_all(&self.pool).await
    }

    // Task embedding operations
    pub async fn replace_task_embedding(
        &self,
        embedding: &NewTaskEmbedding,
    ) -> Result<TaskEmbedding> {
        TaskEmbeddingQueries::replace_for_task(&self.pool, embedding.clone()).await
    }

    pub async fn get_embeddings_for_task(&self, task_id: i64) -> Result<Vec<TaskEmbedding>> {
        TaskEmbeddingQueries::list_for_task(&self.pool, task_id).await
    }

    pub async fn get_embeddings_for_project(&self, project_id: i64) -> Result<Vec<TaskEmbedding>> {
        TaskEmbeddingQueries::list_for_project(&self.pool, project_id).await
    }

    pub async fn list_embeddings(&self) -> Result<Vec<TaskEmbedding>> {
        TaskEmbeddingQueries::list_all(&self.pool).await
    }

    // Chat message operations
    pub async fn insert_chat_message(&self, message: &NewChatMessage) -> Result<ChatMessage> {
        ChatMessageQueries::create(&self.pool, message.clone()).await
    }

    pub async fn get_chat_history(&self, project_id: i64, user_id: i64) -> Result<Vec<ChatMessage>> {
        ChatMessageQueries::list_for_user_in_project(&self.pool, project_id, user_id).await
    }
}
