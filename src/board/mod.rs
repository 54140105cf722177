// Board module
// Users, projects, columns and tasks, scoped to the acting user

#[cfg(test)]
mod tests;

use tracing::{debug, info};

use crate::database::sqlite::{
    BoardColumn, ColumnQueries, Database, NewBoardColumn, NewProject, NewTask, Project,
    ProjectQueries, ProjectStatistics, Task, TaskQueries, TaskUpdate, User, UserQueries,
};
use crate::indexer::{IndexState, TaskIndexer};
use crate::{BoardError, Result};

/// A committed task together with the outcome of indexing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTask {
    pub task: Task,
    pub index: IndexState,
}

/// Read and structural operations on the board.
///
/// Every lookup that takes a `User` treats rows owned by someone else as absent.
#[derive(Debug, Clone)]
pub struct Board {
    database: Database,
}

impl Board {
    #[inline]
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub async fn register_user(&self, username: &str) -> Result<User> {
        let username = required(username, "Username")?;

        if self.find_user(username).await?.is_some() {
            return Err(BoardError::Validation(format!(
                "User '{}' already exists",
                username
            )));
        }

        let user = UserQueries::create(self.database.pool(), username)
            .await
            .map_err(|e| BoardError::database(&e))?;
        info!("Registered user {}", user.username);
        Ok(user)
    }

    /// Look up the acting user by name
    #[inline]
    pub async fn resolve_user(&self, username: &str) -> Result<User> {
        self.find_user(username)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("User '{}'", username)))
    }

    #[inline]
    pub async fn list_users(&self) -> Result<Vec<User>> {
        UserQueries::list_all(self.database.pool())
            .await
            .map_err(|e| BoardError::database(&e))
    }

    #[inline]
    pub async fn create_project(
        &self,
        owner: &User,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project> {
        let name = required(name, "Project name")?;

        let project = ProjectQueries::create(
            self.database.pool(),
            NewProject {
                owner_id: owner.id,
                name: name.to_string(),
                description: description.map(str::to_string),
            },
        )
        .await
        .map_err(|e| BoardError::database(&e))?;

        info!("Created project {} for {}", project.id, owner.username);
        Ok(project)
    }

    #[inline]
    pub async fn list_projects(&self, owner: &User) -> Result<Vec<Project>> {
        ProjectQueries::list_for_owner(self.database.pool(), owner.id)
            .await
            .map_err(|e| BoardError::database(&e))
    }

    #[inline]
    pub async fn owned_project(&self, owner: &User, project_id: i64) -> Result<Project> {
        ProjectQueries::get_owned(self.database.pool(), project_id, owner.id)
            .await
            .map_err(|e| BoardError::database(&e))?
            .ok_or_else(|| BoardError::NotFound(format!("Project {}", project_id)))
    }

    #[inline]
    pub async fn rename_project(&self, owner: &User, project_id: i64, name: &str) -> Result<Project> {
        let project = self.owned_project(owner, project_id).await?;
        let name = required(name, "Project name")?;

        ProjectQueries::rename(self.database.pool(), project.id, name)
            .await
            .map_err(|e| BoardError::database(&e))?
            .ok_or_else(|| BoardError::NotFound(format!("Project {}", project_id)))
    }

    /// Delete a project with its columns, tasks, embeddings and chat history
    #[inline]
    pub async fn delete_project(&self, owner: &User, project_id: i64) -> Result<()> {
        let project = self.owned_project(owner, project_id).await?;
        let deleted = ProjectQueries::delete(self.database.pool(), project.id)
            .await
            .map_err(|e| BoardError::database(&e))?;

        if !deleted {
            return Err(BoardError::NotFound(format!("Project {}", project_id)));
        }

        info!("Deleted project {} of {}", project.id, owner.username);
        Ok(())
    }

    #[inline]
    pub async fn project_statistics(
        &self,
        owner: &User,
        project_id: i64,
    ) -> Result<ProjectStatistics> {
        let project = self.owned_project(owner, project_id).await?;
        ProjectQueries::get_statistics(self.database.pool(), project.id)
            .await
            .map_err(|e| BoardError::database(&e))?
            .ok_or_else(|| BoardError::NotFound(format!("Project {}", project_id)))
    }

    /// Append a column after the project's last one
    #[inline]
    pub async fn add_column(&self, owner: &User, project_id: i64, title: &str) -> Result<BoardColumn> {
        let project = self.owned_project(owner, project_id).await?;
        let title = required(title, "Column title")?;

        ColumnQueries::create(
            self.database.pool(),
            NewBoardColumn {
                project_id: project.id,
                title: title.to_string(),
                position: None,
            },
        )
        .await
        .map_err(|e| BoardError::database(&e))
    }

    #[inline]
    pub async fn list_columns(&self, owner: &User, project_id: i64) -> Result<Vec<BoardColumn>> {
        let project = self.owned_project(owner, project_id).await?;
        ColumnQueries::list_for_project(self.database.pool(), project.id)
            .await
            .map_err(|e| BoardError::database(&e))
    }

    #[inline]
    pub async fn rename_column(&self, owner: &User, column_id: i64, title: &str) -> Result<BoardColumn> {
        let column = self.owned_column(owner, column_id).await?;
        let title = required(title, "Column title")?;

        ColumnQueries::rename(self.database.pool(), column.id, title)
            .await
            .map_err(|e| BoardError::database(&e))?
            .ok_or_else(|| BoardError::NotFound(format!("Column {}", column_id)))
    }

    /// Delete a column; its tasks and their embeddings go with it
    #[inline]
    pub async fn delete_column(&self, owner: &User, column_id: i64) -> Result<()> {
        let column = self.owned_column(owner, column_id).await?;
        let deleted = ColumnQueries::delete(self.database.pool(), column.id)
            .await
            .map_err(|e| BoardError::database(&e))?;

        if !deleted {
            return Err(BoardError::NotFound(format!("Column {}", column_id)));
        }

        info!("Deleted column {} of project {}", column.id, column.project_id);
        Ok(())
    }

    #[inline]
    pub async fn owned_column(&self, owner: &User, column_id: i64) -> Result<BoardColumn> {
        ColumnQueries::get_owned(self.database.pool(), column_id, owner.id)
            .await
            .map_err(|e| BoardError::database(&e))?
            .ok_or_else(|| BoardError::NotFound(format!("Column {}", column_id)))
    }

    #[inline]
    pub async fn owned_task(&self, owner: &User, task_id: i64) -> Result<Task> {
        TaskQueries::get_owned(self.database.pool(), task_id, owner.id)
            .await
            .map_err(|e| BoardError::database(&e))?
            .ok_or_else(|| BoardError::NotFound(format!("Task {}", task_id)))
    }

    /// Tasks of a project ordered by column, then position
    #[inline]
    pub async fn list_tasks(&self, owner: &User, project_id: i64) -> Result<Vec<Task>> {
        let project = self.owned_project(owner, project_id).await?;
        self.database
            .get_tasks_for_project(project.id)
            .await
            .map_err(|e| BoardError::database(&e))
    }

    /// Delete a task; its embedding goes with it
    #[inline]
    pub async fn delete_task(&self, owner: &User, task_id: i64) -> Result<()> {
        let task = self.owned_task(owner, task_id).await?;
        let deleted = TaskQueries::delete(self.database.pool(), task.id)
            .await
            .map_err(|e| BoardError::database(&e))?;

        if !deleted {
            return Err(BoardError::NotFound(format!("Task {}", task_id)));
        }

        info!("Deleted task {}", task.id);
        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.database
            .get_user_by_username(username)
            .await
            .map_err(|e| BoardError::database(&e))
    }
}

/// Task mutations; every committed change is indexed before returning
#[derive(Clone)]
pub struct TaskEditor {
    board: Board,
    indexer: TaskIndexer,
}

impl TaskEditor {
    #[inline]
    pub fn new(board: Board, indexer: TaskIndexer) -> Self {
        Self { board, indexer }
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub async fn create_task(
        &self,
        owner: &User,
        column_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<SavedTask> {
        let column = self.board.owned_column(owner, column_id).await?;
        let title = required(title, "Task title")?;

        let task = TaskQueries::create(
            self.board.database.pool(),
            NewTask {
                column_id: column.id,
                title: title.to_string(),
                description: description.map(str::to_string),
                position: None,
            },
        )
        .await
        .map_err(|e| BoardError::database(&e))?;

        debug!("Created task {} in column {}", task.id, column.id);
        Ok(self.indexed(task).await)
    }

    /// Apply the fields set in `update`; unchanged content is still re-indexed
    #[inline]
    pub async fn update_task(
        &self,
        owner: &User,
        task_id: i64,
        mut update: TaskUpdate,
    ) -> Result<SavedTask> {
        let task = self.board.owned_task(owner, task_id).await?;
        if let Some(title) = update.title.take() {
            update.title = Some(required(&title, "Task title")?.to_string());
        }

        let task = TaskQueries::update(self.board.database.pool(), task.id, update)
            .await
            .map_err(|e| BoardError::database(&e))?
            .ok_or_else(|| BoardError::NotFound(format!("Task {}", task_id)))?;

        debug!("Updated task {}", task.id);
        Ok(self.indexed(task).await)
    }

    /// Move a task to the end of another column of the same owner
    #[inline]
    pub async fn move_task(&self, owner: &User, task_id: i64, column_id: i64) -> Result<SavedTask> {
        let task = self.board.owned_task(owner, task_id).await?;
        let column = self.board.owned_column(owner, column_id).await?;

        let task = TaskQueries::move_to_column(self.board.database.pool(), task.id, column.id)
            .await
            .map_err(|e| BoardError::database(&e))?
            .ok_or_else(|| BoardError::NotFound(format!("Task {}", task_id)))?;

        debug!("Moved task {} to column {}", task.id, column.id);
        Ok(self.indexed(task).await)
    }

    async fn indexed(&self, task: Task) -> SavedTask {
        let index = self.indexer.on_task_saved(&task).await;
        SavedTask { task, index }
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(BoardError::Validation(format!("{} must not be empty", field)))
    } else {
        Ok(trimmed)
    }
}
