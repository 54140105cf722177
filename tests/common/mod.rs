// Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use kanban_rag::board::{Board, TaskEditor};
use kanban_rag::config::OllamaConfig;
use kanban_rag::database::sqlite::{BoardColumn, Database, Project, User};
use kanban_rag::embeddings::TextEncoder;
use kanban_rag::indexer::TaskIndexer;
use tempfile::TempDir;
use wiremock::MockServer;

pub const VOCABULARY: &[&str] = &["buy", "need", "milk", "eggs", "call", "bank", "report"];

/// Deterministic stand-in for a sentence encoder: one axis per vocabulary word
pub struct KeywordEncoder;

impl TextEncoder for KeywordEncoder {
    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        Ok(VOCABULARY
            .iter()
            .map(|term| words.iter().filter(|w| w.as_str() == *term).count() as f32)
            .collect())
    }
}

pub struct Workspace {
    pub temp_dir: TempDir,
    pub database: Database,
    pub editor: TaskEditor,
    pub user: User,
    pub project: Project,
    pub column: BoardColumn,
}

impl Workspace {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let database = Database::initialize_from_config_dir(temp_dir.path())
            .await
            .expect("should open database");
        let board = Board::new(database.clone());

        let user = board
            .register_user("alice")
            .await
            .expect("should register user");
        let project = board
            .create_project(&user, "Groceries", Some("Weekly shopping"))
            .await
            .expect("should create project");
        let column = board
            .add_column(&user, project.id, "To Do")
            .await
            .expect("should add column");

        let editor = TaskEditor::new(
            board,
            TaskIndexer::new(database.clone(), Arc::new(KeywordEncoder)),
        );

        Self {
            temp_dir,
            database,
            editor,
            user,
            project,
            column,
        }
    }

    pub fn board(&self) -> &Board {
        self.editor.board()
    }

    pub async fn add_task(&self, title: &str, description: Option<&str>) -> i64 {
        let saved = self
            .editor
            .create_task(&self.user, self.column.id, title, description)
            .await
            .expect("should create task");
        assert!(saved.index.is_fresh());
        saved.task.id
    }
}

/// Ollama settings pointing at a mock server
pub fn ollama_config_for(server: &MockServer) -> OllamaConfig {
    let address = server.address();
    OllamaConfig {
        host: address.ip().to_string(),
        port: address.port(),
        embedding_dimension: VOCABULARY.len() as u32,
        ..OllamaConfig::default()
    }
}
