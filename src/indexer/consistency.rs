// Index consistency validation
// Detects tasks whose embedding no longer matches their content


use itertools::Itertools;
use std::collections::HashMap;
use tracing::{info, warn};

use super::{ReindexStats, TaskIndexer, index_text};
use crate::database::sqlite::{Database, Task, TaskEmbedding};
use crate::{BoardError, Result};

/// Index problems found across all tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub total_tasks: usize,
    pub total_embeddings: usize,
    /// Tasks with no embedding
    pub missing: Vec<i64>,
    /// Tasks with more than one embedding
    pub duplicated: Vec<i64>,
    /// Tasks whose embedded text differs from their current title and description
    pub stale: Vec<i64>,
    /// Tasks whose stored vector has the wrong number of values
    pub wrong_dimension: Vec<i64>,
}

pub struct ConsistencyValidator<'a> {
    database: &'a Database,
    expected_dimension: usize,
}

impl<'a> ConsistencyValidator<'a> {
    #[inline]
    pub fn new(database: &'a Database, expected_dimension: usize) -> Self {
        Self {
            database,
            expected_dimension,
        }
    }

    #[inline]
    pub async fn validate(&self) -> Result<ConsistencyReport> {
        info!("Starting index consistency validation");

        let tasks = self
            .database
            .list_tasks()
            .await
            .map_err(|e| BoardError::database(&e))?;
        let embeddings = self
            .database
            .list_embeddings()
            .await
            .map_err(|e| BoardError::database(&e))?;

        let report = self.check(&tasks, embeddings);

        if report.is_consistent() {
            info!("Index consistency validation passed");
        } else {
            warn!("Index consistency validation found issues");
            log_consistency_issues(&report);
        }

        Ok(report)
    }

    /// Regenerate the embedding of every task named in `report`
    #[inline]
    pub async fn repair(
        &self,
        indexer: &TaskIndexer,
        report: &ConsistencyReport,
    ) -> Result<ReindexStats> {
        if report.is_consistent() {
            info!("Index is consistent, no repair needed");
            return Ok(ReindexStats::default());
        }

        let mut tasks = Vec::new();
        for task_id in report.affected_tasks() {
            match self.database.get_task_by_id(task_id).await {
                Ok(Some(task)) => tasks.push(task),
                Ok(None) => warn!("Task {} disappeared before repair", task_id),
                Err(e) => return Err(BoardError::database(&e)),
            }
        }

        info!("Repairing embeddings for {} tasks", tasks.len());
        indexer.reindex_tasks(&tasks, |_| {}).await
    }

    fn check(&self, tasks: &[Task], embeddings: Vec<TaskEmbedding>) -> ConsistencyReport {
        let total_embeddings = embeddings.len();
        let by_task: HashMap<i64, Vec<TaskEmbedding>> = embeddings
            .into_iter()
            .into_group_map_by(|embedding| embedding.task_id);

        let mut report = ConsistencyReport {
            total_tasks: tasks.len(),
            total_embeddings,
            ..ConsistencyReport::default()
        };

        for task in tasks {
            match by_task.get(&task.id).map(Vec::as_slice) {
                None | Some([]) => report.missing.push(task.id),
                Some([embedding]) => {
                    if embedding.text_chunk != index_text(&task.title, task.description.as_deref())
                    {
                        report.stale.push(task.id);
                    }
                    if !self.has_expected_dimension(embedding) {
                        report.wrong_dimension.push(task.id);
                    }
                }
                Some(_) => report.duplicated.push(task.id),
            }
        }

        report
    }

    fn has_expected_dimension(&self, embedding: &TaskEmbedding) -> bool {
        embedding.dimension == self.expected_dimension as i64
            && embedding.embedding.len() == self.expected_dimension * size_of::<f32>()
    }
}

fn log_consistency_issues(report: &ConsistencyReport) {
    if !report.missing.is_empty() {
        warn!("Found {} tasks without an embedding", report.missing.len());
    }
    if !report.duplicated.is_empty() {
        warn!(
            "Found {} tasks with duplicate embeddings",
            report.duplicated.len()
        );
    }
    if !report.stale.is_empty() {
        warn!("Found {} tasks with stale embeddings", report.stale.len());
    }
    if !report.wrong_dimension.is_empty() {
        warn!(
            "Found {} embeddings with an unexpected dimension",
            report.wrong_dimension.len()
        );
    }
}

impl ConsistencyReport {
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.total_issues() == 0
    }

    /// Get a human-readable summary of the consistency report
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent() {
            format!(
                "Index is consistent: {} tasks, {} embeddings",
                self.total_tasks, self.total_embeddings
            )
        } else {
            format!(
                "Index inconsistencies found: {} missing, {} duplicated, {} stale, {} wrong dimension",
                self.missing.len(),
                self.duplicated.len(),
                self.stale.len(),
                self.wrong_dimension.len()
            )
        }
    }

    #[inline]
    pub fn total_issues(&self) -> usize {
        self.affected_tasks().len()
    }

    /// Distinct task ids with at least one problem, ascending
    #[inline]
    pub fn affected_tasks(&self) -> Vec<i64> {
        self.missing
            .iter()
            .chain(&self.duplicated)
            .chain(&self.stale)
            .chain(&self.wrong_dimension)
            .copied()
            .sorted_unstable()
            .dedup()
            .collect()
    }
}
