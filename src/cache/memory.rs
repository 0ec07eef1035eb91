//! Process-lifetime cache store. Used when no database path is configured, and in tests.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{CacheEntry, CacheError, CacheKind, CacheStore};

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<(String, CacheKind), CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn find(&self, request_key: &str, kind: CacheKind) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self
            .entries
            .read()
            .get(&(request_key.to_string(), kind))
            .cloned())
    }

    fn upsert(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries
            .write()
            .insert((entry.request_key.clone(), entry.kind), entry);
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_upsert_wins() {
        let store = MemoryCacheStore::new();
        for payload in ["first", "second"] {
            store
                .upsert(CacheEntry {
                    request_key: "gin".into(),
                    kind: CacheKind::IngredientSearch,
                    payload: payload.into(),
                    translated: false,
                })
                .unwrap();
        }
        assert_eq!(store.len().unwrap(), 1);
        let found = store.find("gin", CacheKind::IngredientSearch).unwrap().unwrap();
        assert_eq!(found.payload, "second");
    }
}
