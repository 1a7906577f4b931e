//! Conversation store
//!
//! Owns the session's messages and loading/error flags. Every mutation
//! publishes a new [`ChatState`] snapshot through a `tokio::sync::watch`
//! channel; front ends subscribe and re-render on change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::state::{ChatRole, ChatState, Message, MessageId};

#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Inner>,
}

struct Inner {
    tx: watch::Sender<ChatState>,
    next_id: AtomicU64,
}

impl ConversationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ChatState::default());
        Self {
            inner: Arc::new(Inner {
                tx,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Store whose session opens with an assistant greeting
    pub fn with_greeting(greeting: &str) -> Self {
        let store = Self::new();
        let id = store.next_id();
        store.push_message(Message::new(id, ChatRole::Assistant, greeting));
        store
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.inner.tx.subscribe()
    }

    pub fn snapshot(&self) -> ChatState {
        self.inner.tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.tx.borrow().is_loading
    }

    pub fn next_id(&self) -> MessageId {
        MessageId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Open an exchange with the user's message.
    ///
    /// Returns false without publishing when an exchange is already in
    /// flight. The busy check, the append and the loading flag are a single
    /// update so concurrent submits cannot both pass.
    pub fn begin_exchange(&self, user_message: Message) -> bool {
        self.publish_if(|state| {
            if state.is_loading {
                return false;
            }
            state.messages.push(user_message);
            state.is_loading = true;
            state.error = None;
            true
        })
    }

    pub fn push_message(&self, message: Message) {
        self.publish_if(|state| {
            state.messages.push(message);
            true
        });
    }

    /// Concatenate a fragment onto the message with `id`.
    ///
    /// Returns false (and publishes nothing) when no such message exists.
    pub fn append_fragment(&self, id: MessageId, fragment: &str) -> bool {
        self.publish_if(|state| match state.message_mut(id) {
            Some(message) => {
                message.content.push_str(fragment);
                true
            }
            None => false,
        })
    }

    pub fn finish_exchange(&self) {
        self.publish_if(|state| {
            state.is_loading = false;
            true
        });
    }

    /// Close the exchange with an error; streamed content is left in place.
    pub fn fail_exchange(&self, error: impl Into<String>) {
        let error = error.into();
        self.publish_if(|state| {
            state.error = Some(error);
            state.is_loading = false;
            true
        });
    }

    /// Set the banner error, publishing only when the text changes
    pub fn set_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.publish_if(|state| {
            if state.error.as_deref() == Some(error.as_str()) {
                return false;
            }
            state.error = Some(error);
            true
        });
    }

    fn publish_if(&self, mutate: impl FnOnce(&mut ChatState) -> bool) -> bool {
        self.inner.tx.send_if_modified(|state| {
            let changed = mutate(state);
            if changed {
                state.revision += 1;
            }
            changed
        })
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(store: &ConversationStore, text: &str) -> Message {
        Message::new(store.next_id(), ChatRole::User, text)
    }

    #[test]
    fn test_greeting_is_first_message() {
        let store = ConversationStore::with_greeting("Hello!");
        let state = store.snapshot();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, ChatRole::Assistant);
        assert_eq!(state.messages[0].content, "Hello!");
        assert!(!state.is_loading);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = ConversationStore::new();
        let a = store.next_id();
        let b = store.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_begin_exchange_rejects_while_loading() {
        let store = ConversationStore::new();
        assert!(store.begin_exchange(user(&store, "first")));
        let before = store.snapshot();

        assert!(!store.begin_exchange(user(&store, "second")));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_begin_exchange_clears_error() {
        let store = ConversationStore::new();
        store.set_error("boom");
        assert!(store.begin_exchange(user(&store, "retry")));
        let state = store.snapshot();
        assert!(state.error.is_none());
        assert!(state.is_loading);
    }

    #[test]
    fn test_append_fragment_targets_message_by_id() {
        let store = ConversationStore::new();
        let first = store.next_id();
        let second = store.next_id();
        store.push_message(Message::new(first, ChatRole::Assistant, ""));
        store.push_message(Message::new(second, ChatRole::Assistant, ""));

        assert!(store.append_fragment(first, "Hi"));
        assert!(store.append_fragment(first, " there"));

        let state = store.snapshot();
        assert_eq!(state.message(first).unwrap().content, "Hi there");
        assert_eq!(state.message(second).unwrap().content, "");
    }

    #[test]
    fn test_append_fragment_unknown_id_does_not_publish() {
        let store = ConversationStore::new();
        let revision = store.snapshot().revision;
        assert!(!store.append_fragment(store.next_id(), "lost"));
        assert_eq!(store.snapshot().revision, revision);
    }

    #[test]
    fn test_every_mutation_bumps_revision() {
        let store = ConversationStore::new();
        let id = store.next_id();
        store.push_message(Message::new(id, ChatRole::Assistant, ""));
        store.append_fragment(id, "a");
        store.append_fragment(id, "b");
        store.finish_exchange();
        assert_eq!(store.snapshot().revision, 4);
    }

    #[test]
    fn test_set_error_publishes_once_per_text() {
        let store = ConversationStore::new();
        store.set_error("missing key");
        store.set_error("missing key");
        let state = store.snapshot();
        assert_eq!(state.error.as_deref(), Some("missing key"));
        assert_eq!(state.revision, 1);
    }

    #[test]
    fn test_fail_exchange_keeps_partial_content() {
        let store = ConversationStore::new();
        assert!(store.begin_exchange(user(&store, "X")));
        let id = store.next_id();
        store.push_message(Message::new(id, ChatRole::Assistant, ""));
        store.append_fragment(id, "Partial");
        store.fail_exchange("connection reset");

        let state = store.snapshot();
        assert_eq!(state.message(id).unwrap().content, "Partial");
        assert_eq!(state.error.as_deref(), Some("connection reset"));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let store = ConversationStore::new();
        let mut rx = store.subscribe();
        store.push_message(Message::new(store.next_id(), ChatRole::User, "ping"));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().messages.len(), 1);
    }
}
