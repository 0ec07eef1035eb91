//! Command handlers: run the lookup, update the session, talk to the chat.
//! Transport failures are logged and never shown to the user.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::dispatcher::{Inbound, Intent, PageRequest};
use super::messages;
use crate::lookup::LookupService;
use crate::model::CocktailDetail;
use crate::session::{ChatId, ChatState, SessionStore};
use crate::telegram::{InlineKeyboard, Messenger, PhotoSource, MAX_CAPTION_LEN, MAX_TEXT_LEN};

pub struct Handlers {
    lookup: Arc<LookupService>,
    sessions: Arc<dyn SessionStore>,
    messenger: Arc<dyn Messenger>,
}

impl Handlers {
    pub fn new(
        lookup: Arc<LookupService>,
        sessions: Arc<dyn SessionStore>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            lookup,
            sessions,
            messenger,
        }
    }

    pub async fn handle(&self, inbound: &Inbound, intent: Intent) {
        let chat_id = inbound.chat_id();
        if let Inbound::Callback { callback_id, .. } = inbound {
            if let Err(e) = self.messenger.answer_callback(callback_id).await {
                warn!(error = %e, chat_id, "callback acknowledgement failed");
            }
        }

        match intent {
            Intent::Start => self.send(chat_id, messages::WELCOME, None).await,
            Intent::Search(terms) => self.search(chat_id, &terms).await,
            Intent::Select(choice) => self.select(chat_id, choice).await,
            Intent::BrowseIngredients(request) => self.browse_ingredients(inbound, request).await,
            Intent::MultiSelect(text) => self.multi_select(chat_id, &text).await,
            Intent::Unknown => self.send(chat_id, messages::UNKNOWN, None).await,
        }
    }

    async fn search(&self, chat_id: ChatId, terms: &[String]) {
        if terms.is_empty() {
            debug!(chat_id, "search without terms");
            self.send(chat_id, messages::SEARCH_PROMPT, None).await;
            return;
        }

        let cocktails = match terms {
            [single] => self.lookup.find_by_ingredient(single).await,
            _ => self.lookup.find_by_multiple_ingredients(terms).await,
        };
        info!(chat_id, terms = ?terms, found = cocktails.len(), "search finished");

        let text = if cocktails.is_empty() {
            messages::NOT_FOUND.to_string()
        } else {
            messages::result_list(&cocktails)
        };
        self.sessions.set_last_results(chat_id, cocktails);
        self.send(chat_id, &text, None).await;
    }

    async fn select(&self, chat_id: ChatId, choice: i64) {
        let Some(results) = self.sessions.last_results(chat_id).filter(|r| !r.is_empty()) else {
            debug!(chat_id, choice, "selection without a previous search");
            self.send(chat_id, messages::SEARCH_FIRST, None).await;
            return;
        };

        let index = usize::try_from(choice)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|&i| i < results.len());
        let Some(index) = index else {
            debug!(chat_id, choice, available = results.len(), "selection out of range");
            self.send(chat_id, messages::CHOOSE_FROM_LIST, None).await;
            return;
        };

        let cocktail = &results[index];
        info!(chat_id, index, id = %cocktail.id, "recipe requested");
        match self.lookup.find_cocktail_details_by_id(&cocktail.id).await {
            Some(detail) => self.send_recipe(chat_id, &detail).await,
            None => self.send(chat_id, messages::DETAILS_FAILED, None).await,
        }
    }

    async fn send_recipe(&self, chat_id: ChatId, detail: &CocktailDetail) {
        let text = messages::recipe(detail);
        let photo = match (&detail.image, &detail.thumbnail_url) {
            (Some(bytes), _) => Some(PhotoSource::Bytes(bytes.clone())),
            (None, Some(url)) => Some(PhotoSource::Url(url.clone())),
            (None, None) => None,
        };
        let Some(photo) = photo else {
            self.send(chat_id, &text, None).await;
            return;
        };

        let fits_caption = text.chars().count() <= MAX_CAPTION_LEN;
        let caption = if fits_caption { text.as_str() } else { detail.name.as_str() };
        match self.messenger.send_photo(chat_id, photo, caption).await {
            Ok(()) if fits_caption => {}
            Ok(()) => self.send(chat_id, &text, None).await,
            Err(e) => {
                warn!(error = %e, chat_id, id = %detail.id, "photo delivery failed, sending text only");
                self.send(chat_id, &text, None).await;
            }
        }
    }

    async fn browse_ingredients(&self, inbound: &Inbound, request: PageRequest) {
        let chat_id = inbound.chat_id();
        let ingredients = self.lookup.translated_ingredients().await;
        if ingredients.is_empty() {
            self.send(chat_id, messages::INGREDIENTS_UNAVAILABLE, None).await;
            return;
        }

        match (request, inbound) {
            (PageRequest::Turn(page), Inbound::Callback { message_id, .. }) => {
                let page = messages::clamp_page(page, ingredients.len());
                let text = messages::ingredients_page(&ingredients, page);
                let keyboard = messages::page_keyboard(page, ingredients.len());
                debug!(chat_id, page, "ingredients page turned");
                if let Err(e) = self
                    .messenger
                    .edit_text(chat_id, *message_id, &text, keyboard.as_ref())
                    .await
                {
                    warn!(error = %e, chat_id, page, "could not edit ingredients page");
                }
            }
            _ => {
                let text = messages::ingredients_page(&ingredients, 0);
                let keyboard = messages::page_keyboard(0, ingredients.len());
                self.send(chat_id, &text, keyboard.as_ref()).await;
                self.sessions
                    .set_state(chat_id, ChatState::AwaitingIngredientSelection);
                info!(chat_id, total = ingredients.len(), "ingredients browser opened");
            }
        }
    }

    async fn multi_select(&self, chat_id: ChatId, text: &str) {
        let mut numbers = Vec::new();
        for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse::<usize>() {
                Ok(n) => numbers.push(n),
                Err(_) => {
                    debug!(chat_id, token, "non-numeric ingredient number");
                    self.send(chat_id, messages::NUMBERS_EXPECTED, None).await;
                    return;
                }
            }
        }

        let all = self.lookup.translated_ingredients().await;
        let mut seen = BTreeSet::new();
        let selected: Vec<String> = numbers
            .into_iter()
            .filter(|&n| n >= 1 && n <= all.len() && seen.insert(n))
            .map(|n| all[n - 1].clone())
            .collect();
        if selected.is_empty() {
            debug!(chat_id, text, available = all.len(), "no valid ingredient numbers");
            self.send(chat_id, messages::INVALID_NUMBERS, None).await;
            return;
        }

        let cocktails = self.lookup.find_by_multiple_ingredients(&selected).await;
        info!(chat_id, ingredients = ?selected, found = cocktails.len(), "ingredient selection searched");
        if cocktails.is_empty() {
            self.send(chat_id, messages::NO_COMBINATION, None).await;
            return;
        }

        let text = messages::result_list(&cocktails);
        self.sessions.set_last_results(chat_id, cocktails);
        self.send(chat_id, &text, None).await;
        self.sessions.clear_state(chat_id);
    }

    /// Send a possibly long text; the keyboard goes with the last chunk.
    async fn send(&self, chat_id: ChatId, text: &str, keyboard: Option<&InlineKeyboard>) {
        let chunks = messages::split_text(text, MAX_TEXT_LEN);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let markup = if i == last { keyboard } else { None };
            if let Err(e) = self.messenger.send_text(chat_id, chunk, markup).await {
                warn!(error = %e, chat_id, "message delivery failed");
                return;
            }
        }
    }
}
