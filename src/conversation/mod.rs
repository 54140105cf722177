// Conversation module
// Append-only record of questions and answers per project and user


use tracing::debug;

use crate::database::sqlite::{ChatMessage, Database, NewChatMessage, Sender};
use crate::{BoardError, Result};

#[derive(Debug, Clone)]
pub struct ConversationLog {
    database: Database,
}

impl ConversationLog {
    #[inline]
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    #[inline]
    pub async fn append(
        &self,
        project_id: i64,
        user_id: i64,
        sender: Sender,
        text: &str,
    ) -> Result<ChatMessage> {
        let message = self
            .database
            .insert_chat_message(&NewChatMessage {
                project_id,
                user_id,
                sender,
                message: text.to_string(),
            })
            .await
            .map_err(|e| BoardError::database(&e))?;

        debug!(
            "Recorded {} message {} in project {}",
            sender, message.id, project_id
        );
        Ok(message)
    }

    /// Messages exchanged by `user_id` in `project_id`, oldest first
    #[inline]
    pub async fn list(&self, project_id: i64, user_id: i64) -> Result<Vec<ChatMessage>> {
        self.database
            .get_chat_history(project_id, user_id)
            .await
            .map_err(|e| BoardError::database(&e))
    }
}
