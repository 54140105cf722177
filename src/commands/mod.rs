
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{error, info};

use crate::assistant::AnswerComposer;
use crate::board::{Board, SavedTask, TaskEditor};
use crate::config::{Config, get_config_dir};
use crate::database::sqlite::{Database, Sender, TaskUpdate, User};
use crate::embeddings::{OllamaClient, TextEncoder};
use crate::indexer::{ConsistencyValidator, IndexState, TaskIndexer};
use crate::{BoardError, Result};

/// Load configuration and open the board database in the application directory
async fn open_board() -> Result<(Config, Board)> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;
    let database = Database::initialize_from_config_dir(&config_dir).await?;
    Ok((config, Board::new(database)))
}

/// Connect to Ollama and verify the embedding model, failing before any work starts
fn connect_ollama(config: &Config) -> Result<Arc<OllamaClient>> {
    let client = OllamaClient::connect(&config.ollama).map_err(|e| {
        error!("Failed to connect to Ollama: {:#}", e);
        println!(
            "Error: Ollama at {}:{} is not ready",
            config.ollama.host, config.ollama.port
        );
        println!("Please ensure Ollama is running and the configured models are pulled.");
        println!("Use 'kanban-rag config' to update connection settings.");
        BoardError::Network(format!("{:#}", e))
    })?;

    info!(
        "Ollama connected at {}:{} with models {} / {}",
        config.ollama.host,
        config.ollama.port,
        config.ollama.embedding_model,
        config.ollama.generation_model
    );
    Ok(Arc::new(client))
}

async fn acting_user(board: &Board, username: Option<&str>) -> Result<User> {
    let username = username.ok_or_else(|| {
        BoardError::Validation(
            "No acting user; pass --user or set KANBAN_RAG_USER".to_string(),
        )
    })?;
    board.resolve_user(username).await
}

/// Share one Ollama connection as both the encoder and the generator
fn answer_composer(board: Board, client: Arc<OllamaClient>, top_k: usize) -> AnswerComposer {
    let encoder: Arc<dyn TextEncoder> = Arc::<OllamaClient>::clone(&client);
    AnswerComposer::new(board, encoder, client).with_top_k(top_k)
}

async fn task_editor(username: Option<&str>) -> Result<(TaskEditor, User)> {
    let (config, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let client = connect_ollama(&config)?;
    let indexer = TaskIndexer::new(board.database().clone(), client)
        .with_batch_size(config.ollama.batch_size as usize);
    Ok((TaskEditor::new(board, indexer), user))
}

fn print_saved(action: &str, saved: &SavedTask) {
    println!("{} task: {} (ID: {})", action, saved.task.title, saved.task.id);
    match &saved.index {
        IndexState::Fresh { .. } => println!("   Index: up to date"),
        IndexState::Stale { reason } => {
            println!("   ⚠️  Index: stale ({})", reason);
            println!("   Run 'kanban-rag reindex' once the encoder is available.");
        }
    }
}

fn progress_bar(length: usize) -> ProgressBar {
    if console::user_attended_stderr() {
        let bar = ProgressBar::new(length as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{pos}/{len}] Reindexing {msg}")
        {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    }
}

#[inline]
pub async fn add_user(username: &str) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = board.register_user(username).await?;
    println!("Created user: {} (ID: {})", user.username, user.id);
    Ok(())
}

#[inline]
pub async fn list_users() -> Result<()> {
    let (_, board) = open_board().await?;
    let users = board.list_users().await?;

    if users.is_empty() {
        println!("No users have been added yet.");
        println!("Use 'kanban-rag user add <name>' to add one.");
        return Ok(());
    }

    println!("Users ({} total):", users.len());
    for user in &users {
        println!(
            "👤 {} (ID: {}, created {})",
            user.username,
            user.id,
            user.created_date.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

#[inline]
pub async fn add_project(
    username: Option<&str>,
    name: &str,
    description: Option<&str>,
) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let project = board.create_project(&user, name, description).await?;
    println!("Created project: {} (ID: {})", project.name, project.id);
    Ok(())
}

/// List the acting user's projects with their board and index statistics
#[inline]
pub async fn list_projects(username: Option<&str>) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let projects = board.list_projects(&user).await?;

    if projects.is_empty() {
        println!("{} has no projects yet.", user.username);
        println!("Use 'kanban-rag project add <name>' to create one.");
        return Ok(());
    }

    println!("Projects of {} ({} total):", user.username, projects.len());
    println!();

    for project in &projects {
        println!("📋 {} (ID: {})", project.name, project.id);
        if let Some(description) = &project.description {
            println!("   Description: {}", description);
        }

        match board.project_statistics(&user, project.id).await {
            Ok(stats) => {
                println!("   Columns: {}", stats.total_columns);
                println!(
                    "   Tasks: {} ({} indexed)",
                    stats.total_tasks, stats.indexed_tasks
                );
                if stats.unindexed_tasks() > 0 {
                    println!("   ⚠️  Unindexed Tasks: {}", stats.unindexed_tasks());
                }
                println!("   Chat Messages: {}", stats.total_messages);
            }
            Err(e) => println!("   Statistics: Error - {}", e),
        }

        println!(
            "   Created: {}",
            project.created_date.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }
    Ok(())
}

#[inline]
pub async fn rename_project(username: Option<&str>, project_id: i64, name: &str) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let project = board.rename_project(&user, project_id, name).await?;
    println!("Renamed project {} to {}", project.id, project.name);
    Ok(())
}

/// Delete a project together with its board, index and chat history
#[inline]
pub async fn delete_project(username: Option<&str>, project_id: i64) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    board.delete_project(&user, project_id).await?;
    println!("Deleted project {}", project_id);
    Ok(())
}

#[inline]
pub async fn add_column(username: Option<&str>, project_id: i64, title: &str) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let column = board.add_column(&user, project_id, title).await?;
    println!(
        "Created column: {} (ID: {}, position {})",
        column.title, column.id, column.position
    );
    Ok(())
}

#[inline]
pub async fn rename_column(username: Option<&str>, column_id: i64, title: &str) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let column = board.rename_column(&user, column_id, title).await?;
    println!("Renamed column {} to {}", column.id, column.title);
    Ok(())
}

/// Delete a column and every task in it
#[inline]
pub async fn delete_column(username: Option<&str>, column_id: i64) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    board.delete_column(&user, column_id).await?;
    println!("Deleted column {}", column_id);
    Ok(())
}

#[inline]
pub async fn add_task(
    username: Option<&str>,
    column_id: i64,
    title: &str,
    description: Option<&str>,
) -> Result<()> {
    let (editor, user) = task_editor(username).await?;
    let saved = editor
        .create_task(&user, column_id, title, description)
        .await?;
    print_saved("Created", &saved);
    Ok(())
}

#[inline]
pub async fn update_task(
    username: Option<&str>,
    task_id: i64,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let (editor, user) = task_editor(username).await?;
    let saved = editor
        .update_task(
            &user,
            task_id,
            TaskUpdate {
                title,
                description,
                position: None,
            },
        )
        .await?;
    print_saved("Updated", &saved);
    Ok(())
}

#[inline]
pub async fn move_task(username: Option<&str>, task_id: i64, column_id: i64) -> Result<()> {
    let (editor, user) = task_editor(username).await?;
    let saved = editor.move_task(&user, task_id, column_id).await?;
    print_saved("Moved", &saved);
    Ok(())
}

#[inline]
pub async fn delete_task(username: Option<&str>, task_id: i64) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    board.delete_task(&user, task_id).await?;
    println!("Deleted task {}", task_id);
    Ok(())
}

/// Print the board of a project column by column
#[inline]
pub async fn list_tasks(username: Option<&str>, project_id: i64) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let project = board.owned_project(&user, project_id).await?;
    let columns = board.list_columns(&user, project.id).await?;
    let tasks = board.list_tasks(&user, project.id).await?;

    println!("📋 {} (ID: {})", project.name, project.id);
    if columns.is_empty() {
        println!("   No columns yet. Use 'kanban-rag column add {} <title>'.", project.id);
        return Ok(());
    }

    for column in &columns {
        println!();
        println!("▸ {} (ID: {})", column.title, column.id);
        let mut any = false;
        for task in tasks.iter().filter(|t| t.column_id == column.id) {
            any = true;
            println!("   • [{}] {}", task.id, task.title);
            if let Some(description) = &task.description {
                println!("         {}", description);
            }
        }
        if !any {
            println!("   (empty)");
        }
    }
    Ok(())
}

/// Ask the assistant a question about a project and print its answer
#[inline]
pub async fn ask(
    username: Option<&str>,
    project_id: i64,
    question: Option<&str>,
    show_prompt: bool,
) -> Result<()> {
    let (config, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let client = connect_ollama(&config)?;

    let composer = answer_composer(board, client, config.retrieval.top_k);
    let outcome = composer.ask(&user, project_id, question).await?;

    println!("{}", outcome.answer);
    if show_prompt {
        println!();
        println!("--- prompt used ---");
        println!("{}", outcome.prompt_used);
    }
    Ok(())
}

#[inline]
pub async fn show_history(username: Option<&str>, project_id: i64) -> Result<()> {
    let (_, board) = open_board().await?;
    let user = acting_user(&board, username).await?;
    let project = board.owned_project(&user, project_id).await?;
    let messages = crate::conversation::ConversationLog::new(board.database().clone())
        .list(project.id, user.id)
        .await?;

    if messages.is_empty() {
        println!("No conversation yet in {}.", project.name);
        return Ok(());
    }

    for message in &messages {
        let speaker = match message.sender {
            Sender::User => user.username.as_str(),
            Sender::Ai => "assistant",
        };
        println!(
            "[{}] {}: {}",
            message.created_date.format("%Y-%m-%d %H:%M:%S"),
            speaker,
            message.message
        );
    }
    Ok(())
}

/// Regenerate embeddings for one project of the acting user, or for every task.
///
/// With `repair` only the tasks flagged by the consistency check are re-encoded.
#[inline]
pub async fn reindex(username: Option<&str>, project_id: Option<i64>, repair: bool) -> Result<()> {
    let (config, board) = open_board().await?;
    let client = connect_ollama(&config)?;
    let indexer = TaskIndexer::new(board.database().clone(), client)
        .with_batch_size(config.ollama.batch_size as usize);

    if repair {
        let validator =
            ConsistencyValidator::new(board.database(), config.ollama.embedding_dimension as usize);
        let report = validator.validate().await?;
        println!("{}", report.summary());
        let stats = validator.repair(&indexer, &report).await?;
        println!(
            "Repaired {}/{} tasks",
            stats.tasks_indexed, stats.tasks_seen
        );
        if stats.errors_encountered > 0 {
            println!("⚠️  {} tasks could not be indexed", stats.errors_encountered);
        }
        return Ok(());
    }

    let tasks = match project_id {
        Some(project_id) => {
            let user = acting_user(&board, username).await?;
            board.list_tasks(&user, project_id).await?
        }
        None => board
            .database()
            .list_tasks()
            .await
            .map_err(|e| BoardError::database(&e))?,
    };

    let bar = progress_bar(tasks.len());
    let stats = indexer
        .reindex_tasks(&tasks, |done| bar.inc(done as u64))
        .await?;
    bar.finish_and_clear();

    println!(
        "Reindexed {}/{} tasks",
        stats.tasks_indexed, stats.tasks_seen
    );
    if stats.errors_encountered > 0 {
        println!("⚠️  {} tasks could not be indexed", stats.errors_encountered);
    }
    Ok(())
}

/// Show configuration, service health and index consistency
#[inline]
pub async fn show_status(username: Option<&str>) -> Result<()> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;

    println!("📁 Application Directory: {}", config_dir.display());
    println!();

    println!("💾 Database Status:");
    let database = match Database::initialize_from_config_dir(&config_dir).await {
        Ok(database) => {
            println!("   ✅ SQLite: Connected ({})", config.database_path().display());
            Some(database)
        }
        Err(e) => {
            println!("   ❌ SQLite: Failed to connect - {:#}", e);
            None
        }
    };

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!(
                    "   📋 Embedding Model: {} ({} dimensions)",
                    config.ollama.embedding_model, config.ollama.embedding_dimension
                );
                println!("   💬 Generation Model: {}", config.ollama.generation_model);
            }
            Err(e) => println!("   ⚠️  Ollama: Unhealthy - {:#}", e),
        },
        Err(e) => println!("   ❌ Ollama: Invalid configuration - {:#}", e),
    }

    if let Some(database) = database {
        println!();
        println!("🔍 Index Consistency:");
        let validator =
            ConsistencyValidator::new(&database, config.ollama.embedding_dimension as usize);
        match validator.validate().await {
            Ok(report) if report.is_consistent() => {
                println!("   ✅ {}", report.summary());
            }
            Ok(report) => {
                println!("   ⚠️  {}", report.summary());
                println!("   Run 'kanban-rag reindex' to regenerate the affected embeddings.");
            }
            Err(e) => println!("   ❌ Failed to check consistency: {}", e),
        }

        if let Some(username) = username {
            println!();
            let board = Board::new(database);
            match board.resolve_user(username).await {
                Ok(user) => {
                    let projects = board.list_projects(&user).await?;
                    println!("📋 Projects of {}: {}", user.username, projects.len());
                    for project in &projects {
                        if let Ok(stats) = board.project_statistics(&user, project.id).await {
                            println!(
                                "   {} (ID: {}): {} tasks, {} indexed, {} messages",
                                project.name,
                                project.id,
                                stats.total_tasks,
                                stats.indexed_tasks,
                                stats.total_messages
                            );
                        }
                    }
                }
                Err(e) => println!("   ❌ {}", e),
            }
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'kanban-rag project add <name>' to start a board");
    println!("   • Use 'kanban-rag task add <column> <title>' to add indexed tasks");
    println!("   • Use 'kanban-rag ask <project> <question>' to query the assistant");

    Ok(())
}
