//! TheCocktailDB HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{CatalogApi, CatalogError};

pub struct CocktailDbClient {
    http: reqwest::Client,
    base_url: String,
}

impl CocktailDbClient {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        // Endpoints are appended as relative names, so the base must end with '/'.
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Self { http, base_url }
    }

    async fn get_text(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<String, CatalogError> {
        let url = format!("{}{}", self.base_url, endpoint);
        info!(url = %url, query = ?query, "catalog request");
        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CatalogApi for CocktailDbClient {
    async fn search_by_ingredient(&self, ingredient: &str) -> Result<String, CatalogError> {
        self.get_text("filter.php", &[("i", ingredient)]).await
    }

    async fn lookup_by_id(&self, id: &str) -> Result<String, CatalogError> {
        self.get_text("lookup.php", &[("i", id)]).await
    }

    async fn list_ingredients(&self) -> Result<String, CatalogError> {
        self.get_text("list.php", &[("i", "list")]).await
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        debug!(url, size = bytes.len(), "image downloaded");
        Ok(bytes.to_vec())
    }
}
