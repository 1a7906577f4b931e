pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod knowledge;
pub mod provider;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use ai::{CompletionProvider, FragmentStream, GeminiClient, OllamaClient, OpenAIClient};
pub use config::Config;
pub use controller::{IgnoreReason, StreamingController, SubmitOutcome};
pub use error::{ConciergeError, Result};
pub use knowledge::KnowledgeBase;
pub use provider::Provider;
pub use state::{ChatRole, ChatState, Message, MessageId};
pub use store::ConversationStore;
