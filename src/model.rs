//! Catalog records handed between the lookup pipeline, the cache and the chat layer.
//! Records are plain values: translation builds new values instead of rewriting shared ones.

use serde::{Deserialize, Serialize};

/// Identifier + display name, as returned by an ingredient search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cocktail {
    pub id: String,
    pub name: String,
}

impl Cocktail {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Same identifier, new display name.
    pub fn renamed(&self, name: String) -> Self {
        Self {
            id: self.id.clone(),
            name,
        }
    }
}

/// Full recipe for a single cocktail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocktailDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub instructions: Option<String>,
    /// "ingredient - measure" lines in catalog order; the measure part is optional.
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default, with = "base64_bytes")]
    pub image: Option<Vec<u8>>,
}

/// Separator between the ingredient name and its measure in an ingredient line.
pub const MEASURE_SEPARATOR: &str = " - ";

/// Split an ingredient line into its name and optional measure.
pub fn split_ingredient_line(line: &str) -> (&str, Option<&str>) {
    match line.split_once(MEASURE_SEPARATOR) {
        Some((name, measure)) => (name, Some(measure)),
        None => (line, None),
    }
}

/// Build an ingredient line from a name and an optional measure.
pub fn ingredient_line(name: &str, measure: Option<&str>) -> String {
    match measure {
        Some(m) => format!("{name}{MEASURE_SEPARATOR}{m}"),
        None => name.to_string(),
    }
}

/// Image bytes are stored as a base64 string inside the cached JSON.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
