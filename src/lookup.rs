//! Lookup pipeline: cache first, translate on demand, persist the outcome.
//!
//! Degradation rules, applied to every operation:
//! * translation failures degrade to untranslated data (cached with `translated = false`);
//! * an unreadable cache payload is a miss and gets refetched and overwritten;
//! * catalog failures become empty/absent results and are not cached.
//!
//! Nothing here returns an error to the caller. Each upstream call is attempted once.
//! Stale entries (cached untranslated) are re-translated lazily on the next read that
//! needs them, and upgraded in place once the translation is confirmed.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{search_key, CacheEntry, CacheKind, CacheStore};
use crate::catalog::{parser, CatalogApi};
use crate::metrics::{metric_names, MetricsRegistry};
use crate::model::{ingredient_line, split_ingredient_line, Cocktail, CocktailDetail};
use crate::translate::script::ScriptDetector;
use crate::translate::TranslationService;

/// Fixed cache key of the translated ingredient catalog.
pub const INGREDIENTS_CACHE_KEY: &str = "ingredients_list";

/// The catalog only understands English.
pub const CATALOG_LANG: &str = "en";

pub struct LookupService {
    translator: Arc<TranslationService>,
    catalog: Arc<dyn CatalogApi>,
    cache: Arc<dyn CacheStore>,
    script: ScriptDetector,
    metrics: Arc<MetricsRegistry>,
}

impl LookupService {
    pub fn new(
        translator: Arc<TranslationService>,
        catalog: Arc<dyn CatalogApi>,
        cache: Arc<dyn CacheStore>,
        script: ScriptDetector,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            translator,
            catalog,
            cache,
            script,
            metrics,
        }
    }

    fn target_lang(&self) -> &str {
        self.script.target_lang()
    }

    /// Results already are in the target language when the target is English.
    fn translation_applies(&self) -> bool {
        self.target_lang() != CATALOG_LANG
    }

    /// Cocktails containing `ingredient`, in catalog order.
    pub async fn find_by_ingredient(&self, ingredient: &str) -> Vec<Cocktail> {
        let span = self.metrics.span(metric_names::LOOKUP_SEARCH);
        let result = self.search(ingredient).await;
        span.finish();
        result
    }

    async fn search(&self, ingredient: &str) -> Vec<Cocktail> {
        let cache_key = search_key(ingredient);
        if cache_key.is_empty() {
            return Vec::new();
        }
        let query_is_target = self.translation_applies() && self.script.is_target_script(ingredient);

        if let Some((cocktails, translated)) =
            self.read_cache::<Vec<Cocktail>>(&cache_key, CacheKind::IngredientSearch)
        {
            info!(key = %cache_key, translated, count = cocktails.len(), "search cache hit");
            if translated || !query_is_target || cocktails.is_empty() {
                return cocktails;
            }
            debug!(key = %cache_key, "cached search is not translated, translating now");
            let renamed = self.translate_names(&cocktails).await;
            if self.names_translated(&renamed) {
                self.write_cache(&cache_key, CacheKind::IngredientSearch, &renamed, true);
                info!(key = %cache_key, "stale search entry translated and updated");
                return renamed;
            }
            warn!(key = %cache_key, "could not translate cached search, returning untranslated");
            return cocktails;
        }

        info!(key = %cache_key, "search cache miss, requesting catalog");
        // The normalized key is translated so every spelling of one key maps to one query.
        let catalog_query = if query_is_target {
            let english = self
                .translator
                .translate(&cache_key, self.target_lang(), CATALOG_LANG)
                .await;
            info!(query = %ingredient, translated = %english, "query translated for catalog");
            english
        } else {
            cache_key.clone()
        };
        let catalog_query = search_key(&catalog_query);

        let span = self.metrics.span(metric_names::CATALOG_CALL);
        let response = self.catalog.search_by_ingredient(&catalog_query).await;
        span.finish();
        let body = match response {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, query = %catalog_query, "catalog search failed");
                return Vec::new();
            }
        };
        let cocktails = match parser::parse_cocktail_list(&body) {
            Ok(cocktails) => cocktails,
            Err(e) => {
                warn!(error = %e, query = %catalog_query, "catalog search payload unreadable");
                return Vec::new();
            }
        };
        if cocktails.is_empty() {
            info!(query = %catalog_query, "no drinks found");
        }

        if query_is_target && self.script.is_target_script(&catalog_query) {
            warn!(key = %cache_key, "query translation failed, catalog searched with the original text");
        }

        if query_is_target && !cocktails.is_empty() {
            let renamed = self.translate_names(&cocktails).await;
            if self.names_translated(&renamed) {
                self.write_cache(&cache_key, CacheKind::IngredientSearch, &renamed, true);
                return renamed;
            }
            warn!(key = %cache_key, "result translation failed, caching untranslated");
        }
        self.write_cache(&cache_key, CacheKind::IngredientSearch, &cocktails, false);
        cocktails
    }

    /// Cocktails containing every ingredient, in the order of the first ingredient's results.
    pub async fn find_by_multiple_ingredients<S: AsRef<str>>(&self, ingredients: &[S]) -> Vec<Cocktail> {
        let Some((first, rest)) = ingredients.split_first() else {
            return Vec::new();
        };
        let base = self.find_by_ingredient(first.as_ref()).await;
        if base.is_empty() {
            return Vec::new();
        }

        let mut ids: HashSet<String> = base.iter().map(|c| c.id.clone()).collect();
        for ingredient in rest {
            let next = self.find_by_ingredient(ingredient.as_ref()).await;
            let next_ids: HashSet<&str> = next.iter().map(|c| c.id.as_str()).collect();
            ids.retain(|id| next_ids.contains(id.as_str()));
        }

        let mut seen = HashSet::new();
        base.into_iter()
            .filter(|c| ids.contains(&c.id) && seen.insert(c.id.clone()))
            .collect()
    }

    /// Full recipe by catalog id, or `None` when the catalog has no such drink
    /// or cannot be reached.
    pub async fn find_cocktail_details_by_id(&self, id: &str) -> Option<CocktailDetail> {
        let span = self.metrics.span(metric_names::LOOKUP_DETAILS);
        let result = self.details(id.trim()).await;
        span.finish();
        result
    }

    async fn details(&self, id: &str) -> Option<CocktailDetail> {
        if id.is_empty() {
            return None;
        }

        if let Some((detail, translated)) =
            self.read_cache::<CocktailDetail>(id, CacheKind::CocktailDetails)
        {
            info!(id, translated, "details cache hit");
            if translated || !self.translation_applies() || self.detail_translated(&detail) {
                return Some(detail);
            }
            debug!(id, "cached details are not translated, translating now");
            let translated_detail = self.translate_detail(&detail).await;
            if self.detail_translated(&translated_detail) {
                self.write_cache(id, CacheKind::CocktailDetails, &translated_detail, true);
                info!(id, "stale details entry translated and updated");
                return Some(translated_detail);
            }
            warn!(id, "could not translate cached details, returning untranslated");
            return Some(detail);
        }

        info!(id, "details cache miss, requesting catalog");
        let span = self.metrics.span(metric_names::CATALOG_CALL);
        let response = self.catalog.lookup_by_id(id).await;
        span.finish();
        let body = match response {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, id, "catalog lookup failed");
                return None;
            }
        };
        let mut detail = match parser::parse_cocktail_details(&body) {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                info!(id, "no drink with this id");
                return None;
            }
            Err(e) => {
                warn!(error = %e, id, "catalog lookup payload unreadable");
                return None;
            }
        };

        if let Some(url) = detail.thumbnail_url.clone() {
            detail.image = self.download_image(&url).await;
        }

        if self.translation_applies() {
            let translated_detail = self.translate_detail(&detail).await;
            if self.detail_translated(&translated_detail) {
                self.write_cache(id, CacheKind::CocktailDetails, &translated_detail, true);
                return Some(translated_detail);
            }
            warn!(id, "details translation failed, caching untranslated");
        }
        self.write_cache(id, CacheKind::CocktailDetails, &detail, false);
        Some(detail)
    }

    async fn download_image(&self, url: &str) -> Option<Vec<u8>> {
        let span = self.metrics.span(metric_names::IMAGE_DOWNLOAD);
        let result = self.catalog.fetch_image(url).await;
        span.finish();
        match result {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => {
                warn!(url, "empty image payload");
                None
            }
            Err(e) => {
                warn!(error = %e, url, "image download failed");
                None
            }
        }
    }

    /// The whole catalog ingredient list, translated when possible.
    pub async fn translated_ingredients(&self) -> Vec<String> {
        if let Some((ingredients, translated)) =
            self.read_cache::<Vec<String>>(INGREDIENTS_CACHE_KEY, CacheKind::IngredientsList)
        {
            info!(translated, count = ingredients.len(), "ingredients cache hit");
            if translated || !self.translation_applies() {
                return ingredients;
            }
            let translated_list = self.translate_all(&ingredients).await;
            if self.any_target_script(&translated_list) {
                self.write_cache(INGREDIENTS_CACHE_KEY, CacheKind::IngredientsList, &translated_list, true);
                info!("stale ingredients entry translated and updated");
                return translated_list;
            }
            warn!("could not translate cached ingredients, returning untranslated");
            return ingredients;
        }

        info!("ingredients cache miss, requesting catalog");
        let span = self.metrics.span(metric_names::CATALOG_CALL);
        let response = self.catalog.list_ingredients().await;
        span.finish();
        let ingredients = match response.map(|body| parser::parse_ingredients_list(&body)) {
            Ok(Ok(list)) => list,
            Ok(Err(e)) => {
                warn!(error = %e, "ingredient list payload unreadable");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "ingredient list request failed");
                return Vec::new();
            }
        };
        if ingredients.is_empty() {
            warn!("catalog returned an empty ingredient list, not caching");
            return ingredients;
        }

        if self.translation_applies() {
            let translated_list = self.translate_all(&ingredients).await;
            if self.any_target_script(&translated_list) {
                self.write_cache(INGREDIENTS_CACHE_KEY, CacheKind::IngredientsList, &translated_list, true);
                return translated_list;
            }
            warn!("ingredient list translation failed, caching untranslated");
        }
        self.write_cache(INGREDIENTS_CACHE_KEY, CacheKind::IngredientsList, &ingredients, false);
        ingredients
    }

    // --- translation passes: build new values, never touch the input ---

    async fn translate_names(&self, cocktails: &[Cocktail]) -> Vec<Cocktail> {
        let mut out = Vec::with_capacity(cocktails.len());
        for cocktail in cocktails {
            let name = self
                .translator
                .translate(&cocktail.name, CATALOG_LANG, self.target_lang())
                .await;
            out.push(cocktail.renamed(name));
        }
        out
    }

    async fn translate_all(&self, texts: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(
                self.translator
                    .translate(text, CATALOG_LANG, self.target_lang())
                    .await,
            );
        }
        out
    }

    /// Translates name, instructions and the ingredient-name part of each line.
    /// Measures are left alone so quantities and units are not mangled.
    async fn translate_detail(&self, detail: &CocktailDetail) -> CocktailDetail {
        let target = self.target_lang();
        let name = self.translator.translate(&detail.name, CATALOG_LANG, target).await;
        let instructions = match &detail.instructions {
            Some(text) => Some(self.translator.translate(text, CATALOG_LANG, target).await),
            None => None,
        };
        let mut ingredients = Vec::with_capacity(detail.ingredients.len());
        for line in &detail.ingredients {
            let (ingredient, measure) = split_ingredient_line(line);
            let translated = self.translator.translate(ingredient, CATALOG_LANG, target).await;
            ingredients.push(ingredient_line(&translated, measure));
        }
        CocktailDetail {
            id: detail.id.clone(),
            name,
            instructions,
            ingredients,
            thumbnail_url: detail.thumbnail_url.clone(),
            image: detail.image.clone(),
        }
    }

    // --- translation success checks: the script of the output, not the absence of errors ---

    fn names_translated(&self, cocktails: &[Cocktail]) -> bool {
        cocktails.iter().any(|c| self.script.is_target_script(&c.name))
    }

    fn any_target_script(&self, texts: &[String]) -> bool {
        texts.iter().any(|t| self.script.is_target_script(t))
    }

    /// Keyed off the display name only: a record whose name stayed English is stale.
    fn detail_translated(&self, detail: &CocktailDetail) -> bool {
        self.script.is_target_script(&detail.name)
    }

    // --- cache adapter ---

    /// Cached value and its translated flag. Store errors and unreadable payloads are misses.
    fn read_cache<T: DeserializeOwned>(&self, key: &str, kind: CacheKind) -> Option<(T, bool)> {
        let entry = match self.cache.find(key, kind) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, key, kind = %kind, "cache lookup failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&entry.payload) {
            Ok(value) => Some((value, entry.translated)),
            Err(e) => {
                warn!(error = %e, key, kind = %kind, "cached payload unreadable, refetching");
                None
            }
        }
    }

    fn write_cache<T: Serialize + ?Sized>(&self, key: &str, kind: CacheKind, value: &T, translated: bool) {
        let payload = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, key, kind = %kind, "could not serialize value for cache");
                return;
            }
        };
        let entry = CacheEntry {
            request_key: key.to_string(),
            kind,
            payload,
            translated,
        };
        match self.cache.upsert(entry) {
            Ok(()) => info!(key, kind = %kind, translated, "cache updated"),
            Err(e) => warn!(error = %e, key, kind = %kind, "cache write failed"),
        }
    }
}
