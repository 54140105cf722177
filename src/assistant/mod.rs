// Assistant module
// Retrieval-augmented answers to questions about a project's tasks


pub mod prompt;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::board::Board;
use crate::conversation::ConversationLog;
use crate::database::sqlite::{ChatMessage, Sender, User};
use crate::embeddings::{TextEncoder, encode_checked};
use crate::retrieval::{DEFAULT_TOP_K, SimilarityRetriever};
use crate::{BoardError, Result};

pub use prompt::{CONTEXT_HEADER, build_context, build_prompt};

/// Answer given when no task in the project has been indexed
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "Sorry, I don't have enough information about this project to answer.";
/// Answer given when the model replied without a `response` field
pub const NO_RESPONSE_ANSWER: &str = "No response was received from the model.";
/// Prompt reported when the generator was never called
pub const NO_PROMPT: &str = "N/A";

/// Failure of a single call to the generative model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("model server returned HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("response field missing")]
    EmptyResponse,
}

/// Produces free text for a prompt.
///
/// Calls are bounded by the implementation's timeout and made exactly once.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOutcome {
    pub answer: String,
    /// Full prompt sent to the generator, or `N/A` when none was sent
    pub prompt_used: String,
}

/// Turn a generator result into the answer text shown to the user
#[inline]
pub fn answer_from_generation(result: std::result::Result<String, GenerationError>) -> String {
    match result {
        Ok(answer) => answer,
        Err(GenerationError::EmptyResponse) => NO_RESPONSE_ANSWER.to_string(),
        Err(error) => {
            warn!("Language model call failed: {}", error);
            format!("Error connecting to the language model: {}", error)
        }
    }
}

pub struct AnswerComposer {
    board: Board,
    encoder: Arc<dyn TextEncoder>,
    generator: Arc<dyn TextGenerator>,
    retriever: SimilarityRetriever,
    log: ConversationLog,
    top_k: usize,
}

impl AnswerComposer {
    #[inline]
    pub fn new(
        board: Board,
        encoder: Arc<dyn TextEncoder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let database = board.database().clone();
        Self {
            board,
            encoder,
            generator,
            retriever: SimilarityRetriever::new(database.clone()),
            log: ConversationLog::new(database),
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answer `question` about a project owned by `user`.
    ///
    /// The question and the answer are both recorded in the conversation log,
    /// even when the answer reports a model failure.
    #[inline]
    pub async fn ask(
        &self,
        user: &User,
        project_id: i64,
        question: Option<&str>,
    ) -> Result<AskOutcome> {
        let project = self.board.owned_project(user, project_id).await?;

        let question = question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| BoardError::Validation("No question was provided.".to_string()))?;

        info!(
            "Answering question from {} about project {}",
            user.username, project.id
        );

        self.log
            .append(project.id, user.id, Sender::User, question)
            .await?;

        let query = encode_checked(self.encoder.as_ref(), question)?;
        let chunks = self.retriever.retrieve(project.id, &query, self.top_k).await?;
        debug!("Retrieved {} chunks for project {}", chunks.len(), project.id);

        let outcome = if chunks.is_empty() {
            AskOutcome {
                answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                prompt_used: NO_PROMPT.to_string(),
            }
        } else {
            let prompt = build_prompt(&build_context(&chunks), question);
            let answer = answer_from_generation(self.generator.generate(&prompt));
            AskOutcome {
                answer,
                prompt_used: prompt,
            }
        };

        self.log
            .append(project.id, user.id, Sender::Ai, &outcome.answer)
            .await?;

        Ok(outcome)
    }

    /// Conversation between `user` and the assistant in one of their projects
    #[inline]
    pub async fn history(&self, user: &User, project_id: i64) -> Result<Vec<ChatMessage>> {
        let project = self.board.owned_project(user, project_id).await?;
        self.log.list(project.id, user.id).await
    }
}
