//! Streaming controller
//!
//! Runs one request/response exchange at a time: records the user's
//! message, opens a fragment stream from the completion provider and appends
//! each fragment to an assistant placeholder, publishing after every
//! fragment. Failures end up in the store's `error`; nothing propagates out
//! of [`StreamingController::submit`].

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::Instrument;

use crate::ai::CompletionProvider;
use crate::state::{ChatRole, Message, MessageId};
use crate::store::ConversationStore;

const FALLBACK_ERROR: &str = "An unexpected error occurred.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyPrompt,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Input validation rejected the prompt; nothing changed
    Ignored(IgnoreReason),
    /// No completion provider; the configuration error is shown instead
    Unconfigured,
    Completed { fragments: usize },
    /// Stream failed after `fragments` were applied
    Failed { fragments: usize },
}

pub struct StreamingController {
    store: ConversationStore,
    completion: Result<Arc<dyn CompletionProvider>, String>,
}

impl StreamingController {
    pub fn new(store: ConversationStore, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            store,
            completion: Ok(completion),
        }
    }

    /// Controller without a provider. The configuration error is published
    /// once here and every later submit is blocked.
    pub fn unconfigured(store: ConversationStore, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(%reason, "completion provider unavailable, submissions disabled");
        store.set_error(reason.clone());
        Self {
            store,
            completion: Err(reason),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn is_configured(&self) -> bool {
        self.completion.is_ok()
    }

    /// "Gemini: gemini-2.5-flash", or `None` when unconfigured
    pub fn describe(&self) -> Option<String> {
        self.completion
            .as_ref()
            .ok()
            .map(|c| format!("{}: {}", c.name(), c.model()))
    }

    pub async fn submit(&self, prompt_text: &str) -> SubmitOutcome {
        let prompt = prompt_text.trim();
        if prompt.is_empty() {
            return SubmitOutcome::Ignored(IgnoreReason::EmptyPrompt);
        }

        let completion = match &self.completion {
            Ok(completion) => Arc::clone(completion),
            Err(reason) => {
                tracing::debug!("submit blocked: no completion provider");
                self.store.set_error(reason.clone());
                return SubmitOutcome::Unconfigured;
            }
        };

        let user_message = Message::new(self.store.next_id(), ChatRole::User, prompt);
        let user_id = user_message.id;
        if !self.store.begin_exchange(user_message) {
            tracing::debug!("submit ignored: exchange already in flight");
            return SubmitOutcome::Ignored(IgnoreReason::Busy);
        }

        let placeholder_id = self.store.next_id();
        self.store
            .push_message(Message::new(placeholder_id, ChatRole::Assistant, ""));

        let span = tracing::info_span!(
            "exchange",
            provider = completion.name(),
            user = %user_id,
            assistant = %placeholder_id,
            prompt_chars = prompt.chars().count(),
        );

        self.stream_reply(completion.as_ref(), prompt, placeholder_id)
            .instrument(span)
            .await
    }

    async fn stream_reply(
        &self,
        completion: &dyn CompletionProvider,
        prompt: &str,
        placeholder_id: MessageId,
    ) -> SubmitOutcome {
        let mut stream = match completion.open_stream(prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open completion stream");
                self.store.fail_exchange(error_text(&e));
                return SubmitOutcome::Failed { fragments: 0 };
            }
        };

        let mut fragments = 0;
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    fragments += 1;
                    tracing::debug!(fragment = fragments, bytes = fragment.len(), "fragment received");
                    self.store.append_fragment(placeholder_id, &fragment);
                }
                Err(e) => {
                    tracing::warn!(error = %e, fragments, "completion stream aborted");
                    self.store.fail_exchange(error_text(&e));
                    return SubmitOutcome::Failed { fragments };
                }
            }
        }

        tracing::info!(fragments, "completion finished");
        self.store.finish_exchange();
        SubmitOutcome::Completed { fragments }
    }
}

fn error_text(error: &dyn std::error::Error) -> String {
    let text = error.to_string();
    if text.trim().is_empty() {
        FALLBACK_ERROR.to_string()
    } else {
        text
    }
}
