// Indexer module
// Keeps each task's embedding in step with its title and description


pub mod consistency;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::database::sqlite::{Database, NewTaskEmbedding, Task, TaskEmbedding};
use crate::embeddings::{TextEncoder, check_dimension, encode_checked};
use crate::{BoardError, Result};

pub use consistency::{ConsistencyReport, ConsistencyValidator};

const DEFAULT_BATCH_SIZE: usize = 16;

/// Text stored and embedded for a task
#[inline]
pub fn index_text(title: &str, description: Option<&str>) -> String {
    format!(
        "Title: {}. Description: {}",
        title,
        description.unwrap_or_default()
    )
}

/// Result of indexing a task right after it was saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    /// The embedding reflects the saved content
    Fresh { embedding_id: i64 },
    /// Indexing failed; the previous embedding (if any) is left in place
    Stale { reason: String },
}

impl IndexState {
    #[inline]
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }
}

/// Statistics about a reindex pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexStats {
    pub tasks_seen: usize,
    pub tasks_indexed: usize,
    pub errors_encountered: usize,
}

#[derive(Clone)]
pub struct TaskIndexer {
    database: Database,
    encoder: Arc<dyn TextEncoder>,
    batch_size: usize,
}

impl TaskIndexer {
    #[inline]
    pub fn new(database: Database, encoder: Arc<dyn TextEncoder>) -> Self {
        Self {
            database,
            encoder,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Replace the task's embedding with one computed from its current content
    #[inline]
    pub async fn reindex_task(&self, task: &Task) -> Result<TaskEmbedding> {
        let text = index_text(&task.title, task.description.as_deref());
        let vector = encode_checked(self.encoder.as_ref(), &text)?;
        self.store(task.id, text, vector).await
    }

    /// Index a task that has just been committed.
    ///
    /// Failures never undo the save; they are logged and reported as `Stale`.
    #[inline]
    pub async fn on_task_saved(&self, task: &Task) -> IndexState {
        match self.reindex_task(task).await {
            Ok(embedding) => {
                debug!("Indexed task {} as embedding {}", task.id, embedding.id);
                IndexState::Fresh {
                    embedding_id: embedding.id,
                }
            }
            Err(e) => {
                warn!("Task {} saved but its embedding is stale: {}", task.id, e);
                IndexState::Stale {
                    reason: e.to_string(),
                }
            }
        }
    }

    #[inline]
    pub async fn reindex_project<F>(&self, project_id: i64, on_progress: F) -> Result<ReindexStats>
    where
        F: FnMut(usize),
    {
        let tasks = self
            .database
            .get_tasks_for_project(project_id)
            .await
            .map_err(|e| BoardError::database(&e))?;
        info!("Reindexing {} tasks in project {}", tasks.len(), project_id);
        self.reindex_tasks(&tasks, on_progress).await
    }

    #[inline]
    pub async fn reindex_all<F>(&self, on_progress: F) -> Result<ReindexStats>
    where
        F: FnMut(usize),
    {
        let tasks = self
            .database
            .list_tasks()
            .await
            .map_err(|e| BoardError::database(&e))?;
        info!("Reindexing all {} tasks", tasks.len());
        self.reindex_tasks(&tasks, on_progress).await
    }

    /// Regenerate embeddings for `tasks` in encoder batches.
    ///
    /// `on_progress` receives the number of tasks finished after each batch.
    /// A failing batch is logged and counted; the pass continues with the next one.
    #[inline]
    pub async fn reindex_tasks<F>(&self, tasks: &[Task], mut on_progress: F) -> Result<ReindexStats>
    where
        F: FnMut(usize),
    {
        let mut stats = ReindexStats {
            tasks_seen: tasks.len(),
            ..ReindexStats::default()
        };

        for batch in tasks.chunks(self.batch_size) {
            let texts: Vec<String> = batch
                .iter()
                .map(|task| index_text(&task.title, task.description.as_deref()))
                .collect();

            match self.encoder.encode_batch(&texts) {
                Ok(vectors) if vectors.len() == batch.len() => {
                    for ((task, text), vector) in batch.iter().zip(texts).zip(vectors) {
                        let stored = match check_dimension(self.encoder.dimension(), &vector) {
                            Ok(()) => self.store(task.id, text, vector).await.map(|_| ()),
                            Err(e) => Err(e),
                        };
                        match stored {
                            Ok(()) => stats.tasks_indexed += 1,
                            Err(e) => {
                                error!("Failed to reindex task {}: {}", task.id, e);
                                stats.errors_encountered += 1;
                            }
                        }
                    }
                }
                Ok(vectors) => {
                    error!(
                        "Encoder returned {} vectors for a batch of {} tasks",
                        vectors.len(),
                        batch.len()
                    );
                    stats.errors_encountered += batch.len();
                }
                Err(e) => {
                    error!("Failed to encode batch of {} tasks: {:#}", batch.len(), e);
                    stats.errors_encountered += batch.len();
                }
            }

            on_progress(batch.len());
        }

        info!(
            "Reindexed {}/{} tasks ({} errors)",
            stats.tasks_indexed, stats.tasks_seen, stats.errors_encountered
        );
        Ok(stats)
    }

    async fn store(&self, task_id: i64, text: String, vector: Vec<f32>) -> Result<TaskEmbedding> {
        self.database
            .replace_task_embedding(&NewTaskEmbedding {
                task_id,
                text_chunk: text,
                vector,
            })
            .await
            .map_err(|e| BoardError::database(&e))
    }
}
