use std::sync::Arc;

use super::{NutrientBundle, NutrientSource};
use crate::cache::{TtlCache, NUTRITION_TTL};

/// Best-effort enrichment: every failure collapses into `None`.
pub struct NutritionEnricher {
    source: Option<Arc<dyn NutrientSource>>,
    cache: TtlCache<NutrientBundle>,
}

impl NutritionEnricher {
    pub fn new(source: Option<Arc<dyn NutrientSource>>) -> Self {
        Self {
            source,
            cache: TtlCache::in_memory(NUTRITION_TTL),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    pub async fn lookup(&self, food_name: &str) -> Option<NutrientBundle> {
        let source = self.source.as_ref()?;
        let key = normalize(food_name);
        if key.is_empty() {
            return None;
        }

        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(food = %key, "nutrition cache hit");
            return Some(hit);
        }

        match source.search(&key).await {
            Ok(Some(bundle)) => {
                self.cache.put(key, bundle.clone()).await;
                Some(bundle)
            }
            Ok(None) => {
                tracing::debug!(food = %key, "no nutrition match");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, food = %key, "nutrition lookup failed; skipping enrichment");
                None
            }
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
