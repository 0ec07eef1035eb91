//! Lookup result cache: one JSON payload per (request key, kind), plus a
//! flag recording whether the payload has been translated.
//! Entries are upserted, never duplicated, and never deleted.

pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};

/// Which lookup produced an entry. Kinds share one keyed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKind {
    IngredientSearch,
    CocktailDetails,
    IngredientsList,
}

impl CacheKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::IngredientSearch => "INGREDIENT_SEARCH",
            CacheKind::CocktailDetails => "COCKTAIL_DETAILS",
            CacheKind::IngredientsList => "INGREDIENTS_LIST",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INGREDIENT_SEARCH" => Some(CacheKind::IngredientSearch),
            "COCKTAIL_DETAILS" => Some(CacheKind::CocktailDetails),
            "INGREDIENTS_LIST" => Some(CacheKind::IngredientsList),
            _ => None,
        }
    }
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub request_key: String,
    pub kind: CacheKind,
    /// Serialized JSON of the cached records.
    pub payload: String,
    pub translated: bool,
}

/// Cache key for ingredient searches: lower-cased and trimmed.
pub fn search_key(ingredient: &str) -> String {
    ingredient.trim().to_lowercase()
}

#[derive(Debug)]
pub enum CacheError {
    Storage(String),
    Corrupt(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Storage(msg) => write!(f, "cache storage error: {msg}"),
            CacheError::Corrupt(msg) => write!(f, "corrupt cache row: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Storage(e.to_string())
    }
}

/// Keyed record store. Implementations must be safe for concurrent use;
/// concurrent upserts of one key resolve last-writer-wins.
pub trait CacheStore: Send + Sync {
    fn find(&self, request_key: &str, kind: CacheKind) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace the single entry for (request_key, kind).
    fn upsert(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize, CacheError>;

    fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
