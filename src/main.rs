use clap::{Parser, Subcommand};
use kanban_rag::Result;
use kanban_rag::commands::{
    add_column, add_project, add_task, add_user, ask, delete_column, delete_project, delete_task,
    list_projects, list_tasks, list_users, move_task, reindex, rename_column, rename_project,
    show_history, show_status, update_task,
};
use kanban_rag::config::{get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "kanban-rag")]
#[command(about = "A kanban board with a retrieval-augmented assistant backed by Ollama")]
#[command(version)]
struct Cli {
    /// Acting user; projects owned by anyone else are invisible
    #[arg(long, global = true, env = "KANBAN_RAG_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Manage users
    #[command(subcommand)]
    User(UserCommands),
    /// Manage projects of the acting user
    #[command(subcommand)]
    Project(ProjectCommands),
    /// Manage board columns
    #[command(subcommand)]
    Column(ColumnCommands),
    /// Manage tasks; every change is indexed immediately
    #[command(subcommand)]
    Task(TaskCommands),
    /// Ask the assistant a question about a project
    Ask {
        /// Project ID
        project: i64,
        /// Natural-language question
        question: Option<String>,
        /// Print the prompt sent to the language model
        #[arg(long)]
        show_prompt: bool,
    },
    /// Show the conversation with the assistant in a project
    History {
        /// Project ID
        project: i64,
    },
    /// Regenerate task embeddings
    Reindex {
        /// Only reindex this project of the acting user
        #[arg(long)]
        project: Option<i64>,
        /// Only regenerate embeddings the consistency check flags
        #[arg(long, conflicts_with = "project")]
        repair: bool,
    },
    /// Show service health and index consistency
    Status,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a new user
    Add { name: String },
    /// List all users
    List,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a project owned by the acting user
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List the acting user's projects
    List,
    /// Rename a project
    Rename {
        /// Project ID
        project: i64,
        name: String,
    },
    /// Delete a project with its columns, tasks and chat history
    Delete {
        /// Project ID
        project: i64,
    },
}

#[derive(Subcommand)]
enum ColumnCommands {
    /// Append a column to a project
    Add {
        /// Project ID
        project: i64,
        title: String,
    },
    /// Rename a column
    Rename {
        /// Column ID
        column: i64,
        title: String,
    },
    /// Delete a column and the tasks in it
    Delete {
        /// Column ID
        column: i64,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Create a task at the end of a column
    Add {
        /// Column ID
        column: i64,
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change a task's title or description
    Update {
        /// Task ID
        task: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Move a task to the end of another column
    Move {
        /// Task ID
        task: i64,
        /// Destination column ID
        column: i64,
    },
    /// Delete a task and its embedding
    Delete {
        /// Task ID
        task: i64,
    },
    /// Show a project's board
    List {
        /// Project ID
        project: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Config { show } => {
            let config_dir = get_config_dir()?;
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::User(UserCommands::Add { name }) => add_user(&name).await?,
        Commands::User(UserCommands::List) => list_users().await?,
        Commands::Project(ProjectCommands::Add { name, description }) => {
            add_project(user, &name, description.as_deref()).await?;
        }
        Commands::Project(ProjectCommands::List) => list_projects(user).await?,
        Commands::Project(ProjectCommands::Rename { project, name }) => {
            rename_project(user, project, &name).await?;
        }
        Commands::Project(ProjectCommands::Delete { project }) => {
            delete_project(user, project).await?;
        }
        Commands::Column(ColumnCommands::Add { project, title }) => {
            add_column(user, project, &title).await?;
        }
        Commands::Column(ColumnCommands::Rename { column, title }) => {
            rename_column(user, column, &title).await?;
        }
        Commands::Column(ColumnCommands::Delete { column }) => delete_column(user, column).await?,
        Commands::Task(TaskCommands::Add {
            column,
            title,
            description,
        }) => add_task(user, column, &title, description.as_deref()).await?,
        Commands::Task(TaskCommands::Update {
            task,
            title,
            description,
        }) => update_task(user, task, title, description).await?,
        Commands::Task(TaskCommands::Move { task, column }) => {
            move_task(user, task, column).await?;
        }
        Commands::Task(TaskCommands::Delete { task }) => delete_task(user, task).await?,
        Commands::Task(TaskCommands::List { project }) => list_tasks(user, project).await?,
        Commands::Ask {
            project,
            question,
            show_prompt,
        } => ask(user, project, question.as_deref(), show_prompt).await?,
        Commands::History { project } => show_history(user, project).await?,
        Commands::Reindex { project, repair } => reindex(user, project, repair).await?,
        Commands::Status => show_status(user).await?,
    }

    Ok(())
}
