// Embeddings module
// Sentence-embedding seam, Ollama integration and vector helpers

pub mod ollama;
pub mod vector;

use anyhow::Result;

use crate::BoardError;

pub use ollama::{EmbeddingResult, OllamaClient};
pub use vector::{l2_distance, vector_from_blob, vector_to_blob};

/// Converts text into a fixed-dimension vector.
///
/// Implementations are loaded once at startup and shared read-only between
/// requests, so they must be safe to call concurrently.
pub trait TextEncoder: Send + Sync {
    /// Number of values in every vector this encoder produces
    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode several texts at once; the output order matches the input order
    #[inline]
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

/// Encode `text` and reject vectors whose length differs from the encoder's dimension
#[inline]
pub fn encode_checked(encoder: &dyn TextEncoder, text: &str) -> crate::Result<Vec<f32>> {
    let vector = encoder
        .encode(text)
        .map_err(|e| BoardError::Embedding(format!("{:#}", e)))?;
    check_dimension(encoder.dimension(), &vector)?;
    Ok(vector)
}

#[inline]
pub fn check_dimension(expected: usize, vector: &[f32]) -> crate::Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(BoardError::Embedding(format!(
            "Expected a {}-dimensional embedding, got {} values",
            expected,
            vector.len()
        )))
    }
}
