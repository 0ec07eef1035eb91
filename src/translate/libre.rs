//! LibreTranslate HTTP client.
//! POST {q, source, target, format:"text"} -> {translatedText} | {error}.
//! Single attempt per call; failures surface as `TranslateError`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TranslateError, TranslationBackend};
use crate::config::TranslationConfig;

pub struct LibreTranslateClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TranslationRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslationResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

impl LibreTranslateClient {
    pub fn new(config: &TranslationConfig) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self::with_client(http, config.url.clone(), config.api_key.clone()))
    }

    pub fn with_client(http: reqwest::Client, url: String, api_key: Option<String>) -> Self {
        Self { http, url, api_key }
    }
}

#[async_trait]
impl TranslationBackend for LibreTranslateClient {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        let request = TranslationRequest {
            q: text,
            source: source_lang,
            target: target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // LibreTranslate reports errors as {"error": "..."} with a 4xx/5xx status.
        let parsed: TranslationResponse = serde_json::from_str(&body).map_err(|_| {
            TranslateError::UnexpectedResponse(format!(
                "status {status}: {}",
                body.chars().take(200).collect::<String>()
            ))
        })?;

        if let Some(error) = parsed.error {
            return Err(TranslateError::Api(error));
        }
        if !status.is_success() {
            return Err(TranslateError::Api(format!("status {status}")));
        }
        match parsed.translated_text {
            Some(translated) => {
                debug!(source = text, translated = %translated, "libretranslate ok");
                Ok(translated)
            }
            None => Err(TranslateError::UnexpectedResponse(
                "missing translatedText".into(),
            )),
        }
    }
}
