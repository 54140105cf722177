// Shared fixtures for unit tests

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tempfile::TempDir;

use crate::assistant::{GenerationError, TextGenerator};
use crate::board::Board;
use crate::database::sqlite::{BoardColumn, Database, Project, User};
use crate::embeddings::TextEncoder;

/// Counts occurrences of each vocabulary word; one axis per word
pub struct KeywordEncoder {
    vocabulary: Vec<&'static str>,
}

impl KeywordEncoder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
        }
    }

    pub fn shared(vocabulary: &[&'static str]) -> Arc<dyn TextEncoder> {
        Arc::new(Self::new(vocabulary))
    }
}

impl TextEncoder for KeywordEncoder {
    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        Ok(self
            .vocabulary
            .iter()
            .map(|term| words.iter().filter(|w| w.as_str() == *term).count() as f32)
            .collect())
    }
}

/// Returns the same vector for every input, whatever dimension it claims
pub struct FixedEncoder {
    pub dimension: usize,
    pub vector: Vec<f32>,
}

impl TextEncoder for FixedEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.vector.clone())
    }
}

pub struct FailingEncoder;

impl TextEncoder for FailingEncoder {
    fn dimension(&self) -> usize {
        3
    }

    fn encode(&self, _text: &str) -> Result<Vec<f32>> {
        Err(anyhow::anyhow!("encoder unavailable"))
    }
}

/// Replays a canned result and remembers every prompt it was given
pub struct StubGenerator {
    reply: std::result::Result<String, GenerationError>,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn replying(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: GenerationError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock poisoned").clone()
    }
}

impl TextGenerator for StubGenerator {
    fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.prompts
            .lock()
            .expect("prompt lock poisoned")
            .push(prompt.to_string());
        self.reply.clone()
    }
}

pub async fn test_database() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let database = Database::initialize_from_config_dir(temp_dir.path())
        .await
        .expect("should open database");
    (temp_dir, database)
}

/// A user owning one project with a single "To Do" column
pub async fn seed_project(board: &Board, username: &str) -> (User, Project, BoardColumn) {
    let user = board
        .register_user(username)
        .await
        .expect("should register user");
    let project = board
        .create_project(&user, &format!("{} board", username), None)
        .await
        .expect("should create project");
    let column = board
        .add_column(&user, project.id, "To Do")
        .await
        .expect("should add column");
    (user, project, column)
}
