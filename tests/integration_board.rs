#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Index lifecycle across board edits, validation and reindexing

mod common;

use std::sync::Arc;

use common::{KeywordEncoder, VOCABULARY, Workspace};
use kanban_rag::database::sqlite::{TaskQueries, TaskUpdate};
use kanban_rag::indexer::{ConsistencyValidator, TaskIndexer, index_text};

#[tokio::test]
async fn every_edit_leaves_exactly_one_current_embedding() {
    let workspace = Workspace::new().await;
    let done = workspace
        .board()
        .add_column(&workspace.user, workspace.project.id, "Done")
        .await
        .expect("should add column");

    let task_id = workspace.add_task("Buy milk", None).await;

    let edits = [
        TaskUpdate {
            description: Some("2% milk, 1 gallon".to_string()),
            ..TaskUpdate::default()
        },
        TaskUpdate {
            title: Some("Buy eggs".to_string()),
            ..TaskUpdate::default()
        },
        TaskUpdate::default(),
    ];

    let mut previous_ids = Vec::new();
    for update in edits {
        let saved = workspace
            .editor
            .update_task(&workspace.user, task_id, update)
            .await
            .expect("should update task");
        assert!(saved.index.is_fresh());

        let embeddings = workspace
            .database
            .get_embeddings_for_task(task_id)
            .await
            .expect("should list embeddings");
        assert_eq!(embeddings.len(), 1);
        assert_eq!(
            embeddings[0].text_chunk,
            index_text(&saved.task.title, saved.task.description.as_deref())
        );
        assert!(!previous_ids.contains(&embeddings[0].id));
        previous_ids.push(embeddings[0].id);
    }

    workspace
        .editor
        .move_task(&workspace.user, task_id, done.id)
        .await
        .expect("should move task");
    assert_eq!(
        workspace
            .database
            .get_embeddings_for_task(task_id)
            .await
            .expect("should list embeddings")
            .len(),
        1
    );

    workspace
        .board()
        .delete_task(&workspace.user, task_id)
        .await
        .expect("should delete task");
    assert!(
        workspace
            .database
            .get_embeddings_for_project(workspace.project.id)
            .await
            .expect("should list embeddings")
            .is_empty()
    );
}

#[tokio::test]
async fn out_of_band_edits_are_detected_and_repaired() {
    let workspace = Workspace::new().await;
    let milk = workspace.add_task("Buy milk", None).await;
    workspace.add_task("Call bank", None).await;

    TaskQueries::update(
        workspace.database.pool(),
        milk,
        TaskUpdate {
            title: Some("Buy eggs".to_string()),
            ..TaskUpdate::default()
        },
    )
    .await
    .expect("should update task directly");

    let validator = ConsistencyValidator::new(&workspace.database, VOCABULARY.len());
    let report = validator.validate().await.expect("should validate");
    assert_eq!(report.stale, vec![milk]);
    assert!(report.missing.is_empty());

    let indexer = TaskIndexer::new(workspace.database.clone(), Arc::new(KeywordEncoder));
    let stats = indexer
        .reindex_project(workspace.project.id, |_| {})
        .await
        .expect("should reindex");
    assert_eq!(stats.tasks_indexed, 2);

    let report = validator.validate().await.expect("should validate");
    assert!(report.is_consistent(), "{}", report.summary());

    let embeddings = workspace
        .database
        .get_embeddings_for_task(milk)
        .await
        .expect("should list embeddings");
    assert_eq!(embeddings[0].text_chunk, "Title: Buy eggs. Description: ");
}
