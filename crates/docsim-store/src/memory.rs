use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use docsim_core::{Error, Result, VectorStore};

type Record = HashMap<String, String>;

/// Process-local store with the same field semantics as a Redis hash.
///
/// A whole `set_fields` call is applied under one write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.read().map(|e| e.len()).unwrap_or(0) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

fn poisoned() -> Error { Error::store("memory store lock poisoned") }

impl VectorStore for MemoryStore {
    fn set_fields(&self, key: &str, fields: &[(&str, &str)]) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let record = entries.entry(key.to_string()).or_default();
        for (field, value) in fields { record.insert((*field).to_string(), (*value).to_string()); }
        Ok(())
    }

    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).and_then(|r| r.get(field)).cloned())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_fields() {
        let store = MemoryStore::new();
        store.set_fields("embedding:a", &[("text", "cat"), ("embedding", "{\"values\":[1.0]}")]).unwrap();
        assert_eq!(store.get_field("embedding:a", "text").unwrap().as_deref(), Some("cat"));
        assert_eq!(store.get_field("embedding:a", "missing").unwrap(), None);
        assert_eq!(store.get_field("embedding:b", "text").unwrap(), None);
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let store = MemoryStore::new();
        store.set_fields("k", &[("text", "one")]).unwrap();
        store.set_fields("k", &[("text", "two")]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_field("k", "text").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn prefix_scan_only_returns_namespace() {
        let store = MemoryStore::new();
        for key in ["embedding:1", "embedding:2", "embeddings", "other:1", "a"] {
            store.set_fields(key, &[("text", key)]).unwrap();
        }
        assert_eq!(store.keys_with_prefix("embedding:").unwrap(), vec!["embedding:1", "embedding:2"]);
        assert!(store.keys_with_prefix("zzz").unwrap().is_empty());
    }
}
