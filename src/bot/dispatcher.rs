//! Per-chat finite-state router.
//!
//! `classify` is a pure function of (chat state, inbound shape) to an intent; the
//! dispatcher applies its state reset and hands the intent to the handlers.
//! All user-visible effects happen in the handlers.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use super::handlers::Handlers;
use super::messages::parse_page_callback;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::session::{ChatId, ChatState, SessionStore};
use crate::telegram::Update;

/// Inbound event reduced to what routing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text {
        chat_id: ChatId,
        message_id: i64,
        text: String,
    },
    Callback {
        chat_id: ChatId,
        message_id: i64,
        callback_id: String,
        data: String,
    },
}

impl Inbound {
    /// `None` for updates without text and without a callback (stickers, edits, joins...).
    pub fn from_update(update: Update) -> Option<Self> {
        if let Some(query) = update.callback_query {
            let message = query.message?;
            return Some(Inbound::Callback {
                chat_id: message.chat.id,
                message_id: message.message_id,
                callback_id: query.id,
                data: query.data.unwrap_or_default(),
            });
        }
        let message = update.message?;
        Some(Inbound::Text {
            chat_id: message.chat.id,
            message_id: message.message_id,
            text: message.text?,
        })
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Inbound::Text { chat_id, .. } | Inbound::Callback { chat_id, .. } => *chat_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// `/ingredients`: send the first page as a new message.
    Open,
    /// Paging button: re-render the message in place with this 0-based page.
    Turn(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    /// Trimmed, non-empty ingredient terms. Empty means "ask for a term".
    Search(Vec<String>),
    /// 1-based position in the chat's last result list.
    Select(i64),
    BrowseIngredients(PageRequest),
    /// Raw comma-separated ingredient numbers.
    MultiSelect(String),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    /// Return the chat to `Default` before running the intent.
    pub clear_state: bool,
    /// `None` when the message is a command addressed to another bot.
    pub intent: Option<Intent>,
}

fn selection_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9, ]+$").expect("static regex"))
}

/// Split a search message into ingredient terms.
pub fn split_terms(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Route an inbound event.
pub fn classify(state: ChatState, inbound: &Inbound, bot_name: &str) -> Routing {
    match inbound {
        Inbound::Callback { data, .. } => {
            let intent = if data.starts_with("/ingredients") {
                match parse_page_callback(data) {
                    Some(page) => Intent::BrowseIngredients(PageRequest::Turn(page)),
                    None => Intent::Unknown,
                }
            } else {
                Intent::Unknown
            };
            Routing {
                clear_state: false,
                intent: Some(intent),
            }
        }
        Inbound::Text { text, .. } => {
            let text = text.trim();
            if state == ChatState::AwaitingIngredientSelection {
                if selection_pattern().is_match(text) {
                    return Routing {
                        clear_state: false,
                        intent: Some(Intent::MultiSelect(text.to_string())),
                    };
                }
                // Any other text leaves selection mode, even a command for another bot.
                return Routing {
                    clear_state: true,
                    ..classify_default(text, bot_name)
                };
            }
            classify_default(text, bot_name)
        }
    }
}

fn classify_default(text: &str, bot_name: &str) -> Routing {
    let intent = if text.starts_with('/') {
        let (token, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let token = token.to_lowercase();
        let command = match token.split_once('@') {
            Some((command, target)) if target.eq_ignore_ascii_case(bot_name) => command,
            Some(_) => {
                return Routing {
                    clear_state: false,
                    intent: None,
                }
            }
            None => token.as_str(),
        };
        match command {
            "/start" => Intent::Start,
            "/search" => Intent::Search(split_terms(rest)),
            "/ingredients" => Intent::BrowseIngredients(PageRequest::Open),
            _ => Intent::Unknown,
        }
    } else if let Ok(choice) = text.parse::<i64>() {
        Intent::Select(choice)
    } else {
        Intent::Search(split_terms(text))
    };
    Routing {
        clear_state: false,
        intent: Some(intent),
    }
}

pub struct Dispatcher {
    sessions: Arc<dyn SessionStore>,
    handlers: Handlers,
    bot_name: String,
    metrics: Arc<MetricsRegistry>,
}

impl Dispatcher {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        handlers: Handlers,
        bot_name: impl Into<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            sessions,
            handlers,
            bot_name: bot_name.into(),
            metrics,
        }
    }

    pub async fn dispatch(&self, update: Update) {
        let update_id = update.update_id;
        let Some(inbound) = Inbound::from_update(update) else {
            debug!(update_id, "update without text or callback dropped");
            return;
        };
        let chat_id = inbound.chat_id();
        let span = info_span!("dispatch", chat_id, update_id, request = %Uuid::new_v4());
        self.route(inbound).instrument(span).await;
    }

    async fn route(&self, inbound: Inbound) {
        let chat_id = inbound.chat_id();
        let state = self.sessions.state(chat_id);
        let routing = classify(state, &inbound, &self.bot_name);
        if routing.clear_state {
            self.sessions.clear_state(chat_id);
        }
        let Some(intent) = routing.intent else {
            debug!(chat_id, "command for another bot ignored");
            return;
        };
        debug!(chat_id, state = %state, intent = ?intent, "routed");

        let timer = self.metrics.span(metric_names::DISPATCH);
        self.handlers.handle(&inbound, intent).await;
        timer.finish();
    }
}
