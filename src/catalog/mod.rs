//! Recipe catalog access: transport trait, TheCocktailDB client and payload parser.
//! The transport returns raw JSON bodies; interpretation lives in `parser`.

pub mod cocktaildb;
pub mod parser;

use async_trait::async_trait;

#[derive(Debug)]
pub enum CatalogError {
    Http(String),
    Status { status: u16, url: String },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Http(msg) => write!(f, "catalog request failed: {msg}"),
            CatalogError::Status { status, url } => {
                write!(f, "catalog returned status {status} for {url}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        CatalogError::Http(e.to_string())
    }
}

/// Remote recipe catalog. Every call is a single attempt.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Raw `filter.php?i=<ingredient>` body.
    async fn search_by_ingredient(&self, ingredient: &str) -> Result<String, CatalogError>;
    /// Raw `lookup.php?i=<id>` body.
    async fn lookup_by_id(&self, id: &str) -> Result<String, CatalogError>;
    /// Raw `list.php?i=list` body.
    async fn list_ingredients(&self) -> Result<String, CatalogError>;
    /// Image bytes behind a thumbnail URL.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}
