//! Bot API client over reqwest: long polling plus the outbound `Messenger` calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ApiResponse, InlineKeyboard, Messenger, PhotoSource, TelegramError, Update};
use crate::session::ChatId;

/// Extra time on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

pub struct TelegramClient {
    http: reqwest::Client,
    /// `<api_url>/bot<token>`; never logged.
    endpoint: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self::with_client(http, api_url, token))
    }

    pub fn with_client(http: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, TelegramError> {
        let response = self.http.post(self.url(method)).json(body).send().await?;
        Self::read_envelope(method, response).await
    }

    async fn read_envelope<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, TelegramError> {
        let status = response.status();
        let text = response.text().await?;
        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            TelegramError::Decode(format!("{method} (status {}): {e}", status.as_u16()))
        })?;
        if !envelope.ok {
            return Err(TelegramError::Api {
                method: method.to_string(),
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("status {}", status.as_u16())),
            });
        }
        envelope
            .result
            .ok_or_else(|| TelegramError::Decode(format!("{method}: ok without result")))
    }

    /// Long-poll for updates after `offset`. Returns an empty list when the poll times out.
    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        let mut body = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        let response = self
            .http
            .post(self.url("getUpdates"))
            .timeout(timeout + POLL_GRACE)
            .json(&body)
            .send()
            .await?;
        let updates: Vec<Update> = Self::read_envelope("getUpdates", response).await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), ?offset, "updates received");
        }
        Ok(updates)
    }
}

fn with_markup(mut body: Value, keyboard: Option<&InlineKeyboard>) -> Value {
    if let Some(keyboard) = keyboard.filter(|k| !k.is_empty()) {
        body["reply_markup"] = json!(keyboard);
    }
    body
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TelegramError> {
        let body = with_markup(json!({ "chat_id": chat_id, "text": text }), keyboard);
        let _: Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TelegramError> {
        let body = with_markup(
            json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
            keyboard,
        );
        match self.call::<Value>("editMessageText", &body).await {
            Ok(_) => Ok(()),
            // Re-rendering the page that is already shown is not a failure.
            Err(TelegramError::Api { description, .. })
                if description.contains("message is not modified") =>
            {
                debug!(chat_id, message_id, "edit skipped, message not modified");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: PhotoSource,
        caption: &str,
    ) -> Result<(), TelegramError> {
        match photo {
            PhotoSource::Url(url) => {
                let body = json!({ "chat_id": chat_id, "photo": url, "caption": caption });
                let _: Value = self.call("sendPhoto", &body).await?;
            }
            PhotoSource::Bytes(bytes) => {
                let size = bytes.len();
                let part = Part::bytes(bytes)
                    .file_name("cocktail.jpg")
                    .mime_str("image/jpeg")?;
                let form = Form::new()
                    .text("chat_id", chat_id.to_string())
                    .text("caption", caption.to_string())
                    .part("photo", part);
                let response = self
                    .http
                    .post(self.url("sendPhoto"))
                    .multipart(form)
                    .send()
                    .await?;
                let _: Value = Self::read_envelope("sendPhoto", response).await?;
                debug!(chat_id, size, "photo uploaded");
            }
        }
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
        let body = json!({ "callback_query_id": callback_id });
        let acknowledged: bool = self.call("answerCallbackQuery", &body).await?;
        if !acknowledged {
            warn!(callback_id, "callback query not acknowledged");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::InlineButton;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";

    fn client(server: &MockServer) -> TelegramClient {
        TelegramClient::with_client(reqwest::Client::new(), &server.uri(), TOKEN)
    }

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
    }

    #[tokio::test]
    async fn send_text_posts_message_with_keyboard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": 42,
                "text": "hi",
                "reply_markup": {"inline_keyboard": [[{"text": "Вперед ➡️", "callback_data": "/ingredients_1"}]]}
            })))
            .respond_with(ok(json!({"message_id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let keyboard = InlineKeyboard::row(vec![InlineButton::new("Вперед ➡️", "/ingredients_1")]);
        client(&server)
            .send_text(42, "hi", Some(&keyboard))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_rejection_carries_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let err = client(&server).send_text(1, "x", None).await.unwrap_err();
        match err {
            TelegramError::Api {
                method,
                description,
            } => {
                assert_eq!(method, "sendMessage");
                assert!(description.contains("chat not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unmodified_edit_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/editMessageText"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: message is not modified"
            })))
            .mount(&server)
            .await;

        client(&server).edit_text(1, 7, "same", None).await.unwrap();
    }

    #[tokio::test]
    async fn get_updates_sends_offset_and_parses_updates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/getUpdates"))
            .and(body_partial_json(json!({"offset": 11, "timeout": 0})))
            .respond_with(ok(json!([
                {"update_id": 11, "message": {"message_id": 3, "chat": {"id": 5}, "text": "/start"}},
                {"update_id": 12, "edited_message": {"message_id": 3, "chat": {"id": 5}}}
            ])))
            .mount(&server)
            .await;

        let updates = client(&server)
            .get_updates(Some(11), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].chat_id(), Some(5));
        assert!(updates[1].message.is_none());
    }

    #[tokio::test]
    async fn photo_by_url_and_callback_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .and(body_partial_json(json!({"photo": "https://img/1.jpg", "caption": "Mojito"})))
            .respond_with(ok(json!({"message_id": 2})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/answerCallbackQuery"))
            .and(body_partial_json(json!({"callback_query_id": "cb-9"})))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client
            .send_photo(3, PhotoSource::Url("https://img/1.jpg".into()), "Mojito")
            .await
            .unwrap();
        client.answer_callback("cb-9").await.unwrap();
    }

    #[tokio::test]
    async fn photo_bytes_are_uploaded_as_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .respond_with(ok(json!({"message_id": 2})))
            .mount(&server)
            .await;

        client(&server)
            .send_photo(3, PhotoSource::Bytes(vec![0xFF, 0xD8, 0xFF]), "Mojito")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"chat_id\""));
        assert!(body.contains("name=\"caption\""));
        assert!(body.contains("filename=\"cocktail.jpg\""));
    }
}
