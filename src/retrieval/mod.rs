// Retrieval module
// Nearest-neighbour search over the task embeddings of one project

#[cfg(test)]
mod tests;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::database::sqlite::{Database, TaskEmbedding};
use crate::embeddings::l2_distance;
use crate::{BoardError, Result};

/// Number of chunks handed to the generator for every question
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub embedding_id: i64,
    pub task_id: i64,
    pub text_chunk: String,
    /// Euclidean distance to the query vector
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct SimilarityRetriever {
    database: Database,
}

impl SimilarityRetriever {
    #[inline]
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Return the `k` embeddings of `project_id` closest to `query`, nearest first.
    ///
    /// Only embeddings whose task sits in a column of the project are candidates.
    /// Ties are broken by ascending embedding id.
    #[inline]
    pub async fn retrieve(
        &self,
        project_id: i64,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .database
            .get_embeddings_for_project(project_id)
            .await
            .map_err(|e| BoardError::database(&e))?;

        debug!(
            "Ranking {} embeddings for project {}",
            candidates.len(),
            project_id
        );

        let comparable = candidates.into_iter().filter(|embedding| {
            let matches = embedding.dimension == query.len() as i64
                && embedding.embedding.len() == query.len() * size_of::<f32>();
            if !matches {
                warn!(
                    "Skipping embedding {} for task {}: {} dimensions, query has {}",
                    embedding.id,
                    embedding.task_id,
                    embedding.dimension,
                    query.len()
                );
            }
            matches
        });

        Ok(rank_by_distance(query, comparable, k))
    }
}

/// Order `candidates` by distance to `query` and keep the nearest `k`
#[inline]
pub fn rank_by_distance<I>(query: &[f32], candidates: I, k: usize) -> Vec<RetrievedChunk>
where
    I: IntoIterator<Item = TaskEmbedding>,
{
    candidates
        .into_iter()
        .map(|embedding| RetrievedChunk {
            distance: l2_distance(query, &embedding.vector()),
            embedding_id: embedding.id,
            task_id: embedding.task_id,
            text_chunk: embedding.text_chunk,
        })
        .k_smallest_by(k, |a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.embedding_id.cmp(&b.embedding_id))
        })
        .collect()
}
