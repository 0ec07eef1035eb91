//! Per-chat conversation state: the FSM state and the last shown result list.
//! Chats are independent; a chat never observes another chat's data.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::model::Cocktail;

pub type ChatId = i64;

/// Conversation state of one chat. Absent state is `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ChatState {
    #[default]
    Default,
    AwaitingIngredientSelection,
}

impl std::fmt::Display for ChatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatState::Default => write!(f, "Default"),
            ChatState::AwaitingIngredientSelection => write!(f, "AwaitingIngredientSelection"),
        }
    }
}

/// Shared, immutable snapshot of a result list. Readers keep their snapshot
/// even if the chat runs a new search meanwhile.
pub type ResultList = Arc<Vec<Cocktail>>;

/// Concurrent-safe session storage keyed by chat id.
pub trait SessionStore: Send + Sync {
    fn state(&self, chat_id: ChatId) -> ChatState;
    fn set_state(&self, chat_id: ChatId, state: ChatState);
    /// Return the chat to `Default`.
    fn clear_state(&self, chat_id: ChatId);

    fn last_results(&self, chat_id: ChatId) -> Option<ResultList>;
    /// Replace the last result list, even with an empty one.
    fn set_last_results(&self, chat_id: ChatId, results: Vec<Cocktail>);
}

#[derive(Debug, Default)]
struct Session {
    state: ChatState,
    last_results: Option<ResultList>,
}

/// Process-lifetime session store; sessions are never evicted.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<ChatId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn state(&self, chat_id: ChatId) -> ChatState {
        self.sessions
            .read()
            .get(&chat_id)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    fn set_state(&self, chat_id: ChatId, state: ChatState) {
        let mut sessions = self.sessions.write();
        let session = sessions.entry(chat_id).or_default();
        if session.state != state {
            debug!(chat_id, from = %session.state, to = %state, "chat state changed");
        }
        session.state = state;
    }

    fn clear_state(&self, chat_id: ChatId) {
        if let Some(session) = self.sessions.write().get_mut(&chat_id) {
            if session.state != ChatState::Default {
                debug!(chat_id, from = %session.state, "chat state cleared");
            }
            session.state = ChatState::Default;
        }
    }

    fn last_results(&self, chat_id: ChatId) -> Option<ResultList> {
        self.sessions
            .read()
            .get(&chat_id)
            .and_then(|s| s.last_results.clone())
    }

    fn set_last_results(&self, chat_id: ChatId, results: Vec<Cocktail>) {
        self.sessions.write().entry(chat_id).or_default().last_results = Some(Arc::new(results));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_chat_is_in_default_state() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.state(42), ChatState::Default);
        assert!(store.last_results(42).is_none());
        store.clear_state(42);
        assert_eq!(store.state(42), ChatState::Default);
    }

    #[test]
    fn chats_are_isolated() {
        let store = InMemorySessionStore::new();
        store.set_state(1, ChatState::AwaitingIngredientSelection);
        store.set_last_results(1, vec![Cocktail::new("11007", "Margarita")]);

        assert_eq!(store.state(2), ChatState::Default);
        assert!(store.last_results(2).is_none());
        assert_eq!(store.state(1), ChatState::AwaitingIngredientSelection);

        store.clear_state(1);
        assert_eq!(store.state(1), ChatState::Default);
        assert_eq!(store.last_results(1).unwrap().len(), 1);
    }

    #[test]
    fn empty_results_overwrite_previous_list() {
        let store = InMemorySessionStore::new();
        store.set_last_results(7, vec![Cocktail::new("1", "Mojito")]);
        let snapshot = store.last_results(7).unwrap();

        store.set_last_results(7, Vec::new());
        assert!(store.last_results(7).unwrap().is_empty());
        assert_eq!(snapshot[0].name, "Mojito");
    }
}
