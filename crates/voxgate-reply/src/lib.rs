//! Reply generation for caller utterances.
//!
//! Given the transcribed words of one caller turn, [`ReplyEngine`] produces
//! the text to speak back. With a completion credential configured it asks
//! an OpenAI-compatible chat endpoint; without one it answers from a small
//! keyword rule table. Either way the reply is never empty.

pub mod completion;
pub mod error;
pub mod rules;

pub use completion::{CompletionClient, CompletionSettings, TROUBLE_REPLY, UNCLEAR_REPLY};
pub use error::ReplyError;

/// Produces spoken replies for caller utterances.
#[derive(Debug, Clone, Default)]
pub struct ReplyEngine {
    completion: Option<CompletionClient>,
}

impl ReplyEngine {
    /// Engine backed by the completion service when `completion` is set,
    /// and by the rule table otherwise.
    pub fn new(completion: Option<CompletionClient>) -> Self {
        Self { completion }
    }

    /// Engine that only uses the rule table.
    pub fn rule_based() -> Self {
        Self::default()
    }

    pub fn uses_completion(&self) -> bool {
        self.completion.is_some()
    }

    /// Replies to a non-empty, trimmed utterance.
    ///
    /// # Errors
    ///
    /// Returns `ReplyError` when the completion service cannot be reached or
    /// answers with a body that is not JSON.
    pub async fn reply(&self, text: &str) -> Result<String, ReplyError> {
        match &self.completion {
            Some(client) => client.complete(text).await,
            None => Ok(rules::reply(text, chrono::Local::now().naive_local())),
        }
    }
}
