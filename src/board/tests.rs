use super::*;
use std::sync::Arc;

use crate::conversation::ConversationLog;
use crate::database::sqlite::{Sender, TaskEmbedding};
use crate::indexer::index_text;
use crate::retrieval::SimilarityRetriever;
use crate::test_support::{FailingEncoder, KeywordEncoder, seed_project, test_database};

const VOCABULARY: &[&str] = &["buy", "milk", "eggs", "call", "bank"];

fn editor(database: &Database) -> TaskEditor {
    TaskEditor::new(
        Board::new(database.clone()),
        TaskIndexer::new(database.clone(), KeywordEncoder::shared(VOCABULARY)),
    )
}

async fn single_embedding(database: &Database, task_id: i64) -> TaskEmbedding {
    let mut embeddings = database
        .get_embeddings_for_task(task_id)
        .await
        .expect("should list embeddings");
    assert_eq!(embeddings.len(), 1, "task {} should have one embedding", task_id);
    embeddings.remove(0)
}

#[tokio::test]
async fn users_are_unique_and_resolvable() {
    let (_temp_dir, database) = test_database().await;
    let board = Board::new(database);

    let alice = board.register_user("alice").await.expect("should register");
    assert_eq!(
        board.resolve_user("alice").await.expect("should resolve").id,
        alice.id
    );

    assert!(matches!(
        board.register_user("alice").await,
        Err(BoardError::Validation(_))
    ));
    assert!(matches!(
        board.register_user("  ").await,
        Err(BoardError::Validation(_))
    ));
    assert!(matches!(
        board.resolve_user("nobody").await,
        Err(BoardError::NotFound(_))
    ));
    assert_eq!(board.list_users().await.expect("should list").len(), 1);
}

#[tokio::test]
async fn projects_are_scoped_to_their_owner() {
    let (_temp_dir, database) = test_database().await;
    let board = Board::new(database);
    let (alice, project, _) = seed_project(&board, "alice").await;
    let bob = board.register_user("bob").await.expect("should register");

    assert_eq!(
        board.list_projects(&alice).await.expect("should list"),
        vec![project.clone()]
    );
    assert!(board.list_projects(&bob).await.expect("should list").is_empty());
    assert!(matches!(
        board.owned_project(&bob, project.id).await,
        Err(BoardError::NotFound(_))
    ));
    assert!(matches!(
        board.add_column(&bob, project.id, "Sneaky").await,
        Err(BoardError::NotFound(_))
    ));
}

#[tokio::test]
async fn columns_keep_their_order() {
    let (_temp_dir, database) = test_database().await;
    let board = Board::new(database);
    let (alice, project, todo) = seed_project(&board, "alice").await;

    let done = board
        .add_column(&alice, project.id, "Done")
        .await
        .expect("should add column");
    assert!(done.position > todo.position);

    let titles: Vec<String> = board
        .list_columns(&alice, project.id)
        .await
        .expect("should list")
        .into_iter()
        .map(|c| c.title)
        .collect();
    assert_eq!(titles, vec!["To Do", "Done"]);
}

#[tokio::test]
async fn created_task_is_indexed_before_returning() {
    let (_temp_dir, database) = test_database().await;
    let editor = editor(&database);
    let (alice, _, column) = seed_project(editor.board(), "alice").await;

    let saved = editor
        .create_task(&alice, column.id, "Buy milk", Some("2% milk, 1 gallon"))
        .await
        .expect("should create task");

    let embedding = single_embedding(&database, saved.task.id).await;
    assert_eq!(
        saved.index,
        IndexState::Fresh {
            embedding_id: embedding.id
        }
    );
    assert_eq!(
        embedding.text_chunk,
        "Title: Buy milk. Description: 2% milk, 1 gallon"
    );
}

#[tokio::test]
async fn updates_and_moves_reindex_the_task() {
    let (_temp_dir, database) = test_database().await;
    let editor = editor(&database);
    let (alice, project, todo) = seed_project(editor.board(), "alice").await;
    let done = editor
        .board()
        .add_column(&alice, project.id, "Done")
        .await
        .expect("should add column");

    let created = editor
        .create_task(&alice, todo.id, "Buy milk", None)
        .await
        .expect("should create task");
    let first = single_embedding(&database, created.task.id).await;

    let updated = editor
        .update_task(
            &alice,
            created.task.id,
            TaskUpdate {
                title: Some("Buy eggs".to_string()),
                ..TaskUpdate::default()
            },
        )
        .await
        .expect("should update task");
    let second = single_embedding(&database, created.task.id).await;
    assert_ne!(first.id, second.id);
    assert_eq!(second.text_chunk, index_text("Buy eggs", None));
    assert!(updated.index.is_fresh());

    let moved = editor
        .move_task(&alice, created.task.id, done.id)
        .await
        .expect("should move task");
    let third = single_embedding(&database, created.task.id).await;
    assert_eq!(moved.task.column_id, done.id);
    assert_ne!(second.id, third.id);
    assert_eq!(third.text_chunk, second.text_chunk);
}

#[tokio::test]
async fn indexing_failure_does_not_roll_back_the_save() {
    let (_temp_dir, database) = test_database().await;
    let board = Board::new(database.clone());
    let editor = TaskEditor::new(
        board.clone(),
        TaskIndexer::new(database.clone(), Arc::new(FailingEncoder)),
    );
    let (alice, project, column) = seed_project(&board, "alice").await;

    let saved = editor
        .create_task(&alice, column.id, "Buy milk", None)
        .await
        .expect("save should succeed");

    assert!(matches!(saved.index, IndexState::Stale { .. }));
    assert_eq!(
        board.list_tasks(&alice, project.id).await.expect("should list"),
        vec![saved.task.clone()]
    );
    assert!(
        database
            .get_embeddings_for_task(saved.task.id)
            .await
            .expect("should list embeddings")
            .is_empty()
    );
}

#[tokio::test]
async fn task_edits_validate_input_and_ownership() {
    let (_temp_dir, database) = test_database().await;
    let editor = editor(&database);
    let (alice, _, column) = seed_project(editor.board(), "alice").await;
    let (bob, _, bob_column) = seed_project(editor.board(), "bob").await;

    assert!(matches!(
        editor.create_task(&alice, column.id, " ", None).await,
        Err(BoardError::Validation(_))
    ));
    assert!(matches!(
        editor.create_task(&bob, column.id, "Sneaky", None).await,
        Err(BoardError::NotFound(_))
    ));

    let task = editor
        .create_task(&alice, column.id, "Buy milk", None)
        .await
        .expect("should create task");

    assert!(matches!(
        editor
            .update_task(
                &alice,
                task.task.id,
                TaskUpdate {
                    title: Some(String::new()),
                    ..TaskUpdate::default()
                }
            )
            .await,
        Err(BoardError::Validation(_))
    ));
    assert!(matches!(
        editor.move_task(&alice, task.task.id, bob_column.id).await,
        Err(BoardError::NotFound(_))
    ));
    assert!(matches!(
        editor.board().delete_task(&bob, task.task.id).await,
        Err(BoardError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_task_removes_its_embedding() {
    let (_temp_dir, database) = test_database().await;
    let editor = editor(&database);
    let (alice, project, column) = seed_project(editor.board(), "alice").await;

    let saved = editor
        .create_task(&alice, column.id, "Buy milk", None)
        .await
        .expect("should create task");
    editor
        .board()
        .delete_task(&alice, saved.task.id)
        .await
        .expect("should delete task");

    assert!(
        database
            .get_embeddings_for_project(project.id)
            .await
            .expect("should list embeddings")
            .is_empty()
    );
    assert!(matches!(
        editor.board().delete_task(&alice, saved.task.id).await,
        Err(BoardError::NotFound(_))
    ));
}

#[tokio::test]
async fn statistics_count_indexed_tasks() {
    let (_temp_dir, database) = test_database().await;
    let editor = editor(&database);
    let (alice, project, column) = seed_project(editor.board(), "alice").await;

    editor
        .create_task(&alice, column.id, "Buy milk", None)
        .await
        .expect("should create task");

    let stats = editor
        .board()
        .project_statistics(&alice, project.id)
        .await
        .expect("should get statistics");
    assert_eq!(stats.total_tasks, 1);
    assert_eq!(stats.indexed_tasks, 1);
    assert_eq!(stats.unindexed_tasks(), 0);
}

#[tokio::test]
async fn updated_titles_are_trimmed_like_created_ones() {
    let (_temp_dir, database) = test_database().await;
    let editor = editor(&database);
    let (alice, _, column) = seed_project(editor.board(), "alice").await;

    let created = editor
        .create_task(&alice, column.id, "  Buy milk  ", None)
        .await
        .expect("should create task");
    assert_eq!(created.task.title, "Buy milk");

    let updated = editor
        .update_task(
            &alice,
            created.task.id,
            TaskUpdate {
                title: Some("  Buy eggs ".to_string()),
                ..TaskUpdate::default()
            },
        )
        .await
        .expect("should update task");
    assert_eq!(updated.task.title, "Buy eggs");
    assert_eq!(
        single_embedding(&database, created.task.id).await.text_chunk,
        "Title: Buy eggs. Description: "
    );
}

#[tokio::test]
async fn columns_can_be_renamed_only_by_their_owner() {
    let (_temp_dir, database) = test_database().await;
    let board = Board::new(database);
    let (alice, _, column) = seed_project(&board, "alice").await;
    let bob = board.register_user("bob").await.expect("should register");

    let renamed = board
        .rename_column(&alice, column.id, " Backlog ")
        .await
        .expect("should rename column");
    assert_eq!(renamed.title, "Backlog");
    assert_eq!(renamed.position, column.position);

    assert!(matches!(
        board.rename_column(&alice, column.id, "").await,
        Err(BoardError::Validation(_))
    ));
    assert!(matches!(
        board.rename_column(&bob, column.id, "Mine").await,
        Err(BoardError::NotFound(_))
    ));
    assert!(matches!(
        board.delete_column(&bob, column.id).await,
        Err(BoardError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_column_removes_its_tasks_from_retrieval() {
    let (_temp_dir, database) = test_database().await;
    let editor = editor(&database);
    let (alice, project, column) = seed_project(editor.board(), "alice").await;

    editor
        .create_task(&alice, column.id, "Buy milk", None)
        .await
        .expect("should create task");
    editor
        .create_task(&alice, column.id, "Call bank", None)
        .await
        .expect("should create task");

    let retriever = SimilarityRetriever::new(database.clone());
    let query = vec![1.0, 1.0, 0.0, 0.0, 0.0];
    assert_eq!(
        retriever
            .retrieve(project.id, &query, 3)
            .await
            .expect("should retrieve")
            .len(),
        2
    );

    editor
        .board()
        .delete_column(&alice, column.id)
        .await
        .expect("should delete column");

    assert!(
        retriever
            .retrieve(project.id, &query, 3)
            .await
            .expect("should retrieve")
            .is_empty()
    );
    assert!(
        editor
            .board()
            .list_tasks(&alice, project.id)
            .await
            .expect("should list tasks")
            .is_empty()
    );
    assert!(matches!(
        editor.board().delete_column(&alice, column.id).await,
        Err(BoardError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_project_removes_its_board_and_history() {
    let (_temp_dir, database) = test_database().await;
    let editor = editor(&database);
    let (alice, project, column) = seed_project(editor.board(), "alice").await;
    let bob = editor
        .board()
        .register_user("bob")
        .await
        .expect("should register");

    let saved = editor
        .create_task(&alice, column.id, "Buy milk", None)
        .await
        .expect("should create task");
    ConversationLog::new(database.clone())
        .append(project.id, alice.id, Sender::User, "What do I need?")
        .await
        .expect("should append message");

    let renamed = editor
        .board()
        .rename_project(&alice, project.id, "Errands")
        .await
        .expect("should rename project");
    assert_eq!(renamed.name, "Errands");

    assert!(matches!(
        editor.board().delete_project(&bob, project.id).await,
        Err(BoardError::NotFound(_))
    ));
    editor
        .board()
        .delete_project(&alice, project.id)
        .await
        .expect("should delete project");

    assert!(
        editor
            .board()
            .list_projects(&alice)
            .await
            .expect("should list projects")
            .is_empty()
    );
    assert!(
        database
            .get_task_by_id(saved.task.id)
            .await
            .expect("should query task")
            .is_none()
    );
    assert!(
        database
            .get_embeddings_for_task(saved.task.id)
            .await
            .expect("should list embeddings")
            .is_empty()
    );
    assert!(
        database
            .get_chat_history(project.id, alice.id)
            .await
            .expect("should list history")
            .is_empty()
    );
}
