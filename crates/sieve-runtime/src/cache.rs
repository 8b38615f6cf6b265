//! Classification cache.
//!
//! Batches often contain the same company more than once (different
//! sources, re-runs). Model classifications are cached by a hash of the
//! classifier's inputs so repeats cost nothing.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use sieve_core::ClassificationResult;

use crate::config::CacheConfig;

/// Cache key over `(name, text, domain)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    pub fn new(company_name: &str, company_text: &str, domain: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        company_name.trim().hash(&mut hasher);
        company_text.hash(&mut hasher);
        domain.trim().to_lowercase().hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// In-memory cache of model classifications, backed by moka.
pub struct ClassificationCache {
    cache: Cache<CacheKey, ClassificationResult>,
}

impl ClassificationCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<ClassificationResult> {
        self.cache.get(key).await
    }

    /// Store a classification. Only model results are accepted.
    pub async fn insert(&self, key: CacheKey, result: ClassificationResult) {
        if result.source != sieve_core::ClassificationSource::LlmClassification {
            return;
        }
        self.cache.insert(key, result).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ClassificationCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl std::fmt::Debug for ClassificationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationCache")
            .field("entries", &self.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_core::{ClassificationSource, CostTag, EntitySubtype, EntityType};

    fn model_result() -> ClassificationResult {
        ClassificationResult {
            entity_type: EntityType::Operator,
            entity_subtype: EntitySubtype::Unknown,
            confidence: 0.8,
            signals_positive: vec![],
            signals_negative: vec!["property management".to_string()],
            reason: "Runs buildings for owners".to_string(),
            source: ClassificationSource::LlmClassification,
            cost: CostTag::GeminiCall,
            spend_usd: 0.0001,
        }
    }

    #[test]
    fn test_key_normalizes_domain() {
        assert_eq!(
            CacheKey::new("Acme", "text", "Acme.com "),
            CacheKey::new("Acme", "text", "acme.com")
        );
        assert_ne!(
            CacheKey::new("Acme", "text", "acme.com"),
            CacheKey::new("Acme", "other text", "acme.com")
        );
    }

    #[tokio::test]
    async fn test_round_trip() {
        let cache = ClassificationCache::default();
        let key = CacheKey::new("Acme", "text", "acme.com");

        assert!(cache.get(&key).await.is_none());
        cache.insert(key, model_result()).await;
        assert_eq!(cache.get(&key).await, Some(model_result()));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = ClassificationCache::default();
        let key = CacheKey::new("Acme", "text", "acme.com");

        cache.insert(key, ClassificationResult::error("timeout")).await;
        assert!(cache.get(&key).await.is_none());
    }
}
