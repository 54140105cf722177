use super::*;
use crate::board::Board;
use crate::database::sqlite::{NewTask, NewTaskEmbedding, TaskQueries};
use crate::embeddings::vector_to_blob;
use crate::test_support::{seed_project, test_database};
use chrono::Utc;

fn embedding(id: i64, task_id: i64, vector: &[f32]) -> TaskEmbedding {
    TaskEmbedding {
        id,
        task_id,
        text_chunk: format!("chunk {}", id),
        embedding: vector_to_blob(vector),
        dimension: vector.len() as i64,
        created_date: Utc::now().naive_utc(),
    }
}

async fn store(database: &Database, column_id: i64, title: &str, vector: Vec<f32>) -> TaskEmbedding {
    let task = TaskQueries::create(
        database.pool(),
        NewTask {
            column_id,
            title: title.to_string(),
            description: None,
            position: None,
        },
    )
    .await
    .expect("should create task");

    database
        .replace_task_embedding(&NewTaskEmbedding {
            task_id: task.id,
            text_chunk: title.to_string(),
            vector,
        })
        .await
        .expect("should store embedding")
}

#[test]
fn ranking_orders_by_distance() {
    let query = [0.0, 0.0];
    let candidates = vec![
        embedding(1, 10, &[3.0, 4.0]),
        embedding(2, 20, &[1.0, 0.0]),
        embedding(3, 30, &[0.0, 2.0]),
        embedding(4, 40, &[10.0, 0.0]),
    ];

    let ranked = rank_by_distance(&query, candidates, 3);
    let ids: Vec<i64> = ranked.iter().map(|c| c.embedding_id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
    assert_eq!(ranked[0].distance, 1.0);
    assert_eq!(ranked[2].distance, 5.0);
    assert_eq!(ranked[1].task_id, 30);
    assert_eq!(ranked[1].text_chunk, "chunk 3");
}

#[test]
fn ranking_breaks_ties_by_embedding_id() {
    let query = [0.0, 0.0];
    let candidates = vec![
        embedding(9, 1, &[1.0, 0.0]),
        embedding(4, 2, &[0.0, 1.0]),
        embedding(7, 3, &[-1.0, 0.0]),
    ];

    let ids: Vec<i64> = rank_by_distance(&query, candidates, 2)
        .iter()
        .map(|c| c.embedding_id)
        .collect();
    assert_eq!(ids, vec![4, 7]);
}

#[test]
fn ranking_respects_k_bounds() {
    let candidates = || vec![embedding(1, 1, &[1.0]), embedding(2, 2, &[2.0])];

    assert!(rank_by_distance(&[0.0], candidates(), 0).is_empty());
    assert_eq!(rank_by_distance(&[0.0], candidates(), 10).len(), 2);
    assert!(rank_by_distance(&[0.0], Vec::new(), 3).is_empty());
}

#[tokio::test]
async fn retrieval_is_scoped_to_the_project() {
    let (_temp_dir, database) = test_database().await;
    let board = Board::new(database.clone());
    let (_, mine, my_column) = seed_project(&board, "alice").await;
    let (_, _, their_column) = seed_project(&board, "bob").await;

    let near = store(&database, my_column.id, "near", vec![1.0, 0.0]).await;
    let far = store(&database, my_column.id, "far", vec![5.0, 5.0]).await;
    store(&database, their_column.id, "closest but foreign", vec![0.0, 0.0]).await;

    let retriever = SimilarityRetriever::new(database);
    let chunks = retriever
        .retrieve(mine.id, &[0.0, 0.0], DEFAULT_TOP_K)
        .await
        .expect("should retrieve");

    let ids: Vec<i64> = chunks.iter().map(|c| c.embedding_id).collect();
    assert_eq!(ids, vec![near.id, far.id]);
}

#[tokio::test]
async fn retrieval_skips_mismatched_dimensions() {
    let (_temp_dir, database) = test_database().await;
    let board = Board::new(database.clone());
    let (_, project, column) = seed_project(&board, "alice").await;

    store(&database, column.id, "old model", vec![0.0, 0.0, 0.0]).await;
    let current = store(&database, column.id, "current model", vec![3.0, 4.0]).await;

    let retriever = SimilarityRetriever::new(database);
    let chunks = retriever
        .retrieve(project.id, &[0.0, 0.0], 3)
        .await
        .expect("should retrieve");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].embedding_id, current.id);
    assert_eq!(chunks[0].text_chunk, "current model");
}

#[tokio::test]
async fn retrieval_of_unindexed_project_is_empty() {
    let (_temp_dir, database) = test_database().await;
    let board = Board::new(database.clone());
    let (_, project, _) = seed_project(&board, "alice").await;

    let retriever = SimilarityRetriever::new(database);
    assert!(
        retriever
            .retrieve(project.id, &[1.0, 2.0], 3)
            .await
            .expect("should retrieve")
            .is_empty()
    );
    assert!(
        retriever
            .retrieve(project.id, &[1.0, 2.0], 0)
            .await
            .expect("should retrieve")
            .is_empty()
    );
}
