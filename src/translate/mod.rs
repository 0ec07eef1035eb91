//! Machine translation: backend adapter trait and the degrading service facade.
//! The facade never fails: any backend problem yields the source text unchanged.

pub mod libre;
pub mod script;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{trace, warn};

use crate::metrics::{metric_names, MetricsRegistry};

#[derive(Debug)]
pub enum TranslateError {
    Http(String),
    Api(String),
    UnexpectedResponse(String),
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::Http(msg) => write!(f, "translation request failed: {msg}"),
            TranslateError::Api(msg) => write!(f, "translation API error: {msg}"),
            TranslateError::UnexpectedResponse(msg) => {
                write!(f, "unexpected translation response: {msg}")
            }
        }
    }
}

impl std::error::Error for TranslateError {}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        TranslateError::Http(e.to_string())
    }
}

/// A remote translation backend (adapter for different providers).
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError>;
}

/// Translation entry point used by the lookup pipeline.
pub struct TranslationService {
    backend: Arc<dyn TranslationBackend>,
    enabled: bool,
    metrics: Arc<MetricsRegistry>,
}

impl TranslationService {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        enabled: bool,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            backend,
            enabled,
            metrics,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Translate `text`, returning it unchanged when translation is disabled,
    /// the text is blank, or the backend fails.
    pub async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> String {
        if !self.enabled || text.trim().is_empty() {
            trace!("translation skipped (disabled or empty text)");
            return text.to_string();
        }

        let span = self.metrics.span(metric_names::TRANSLATE_CALL);
        let result = self.backend.translate(text, source_lang, target_lang).await;
        span.finish();

        match result {
            Ok(translated) => {
                trace!(source = text, translated = %translated, "translated");
                translated
            }
            Err(e) => {
                warn!(error = %e, text, source_lang, target_lang, "translation failed, keeping source text");
                text.to_string()
            }
        }
    }
}
