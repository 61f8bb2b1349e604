use std::sync::Arc;

use crate::analysis::CachedAnalysis;
use crate::cache::{TtlCache, ANALYSIS_TTL};
use crate::config::AppConfig;
use crate::meals::{MealStore, PgMealStore};
use crate::media::{MediaStorage, PgQuotaOracle};
use crate::nutrition::{NutrientSource, NutritionEnricher, UsdaClient};
use crate::profiles::{PgProfileStore, ProfileStore};
use crate::rate_limit::RateLimiter;
use crate::storage::{Storage, StorageClient};
use crate::vision::{AnalysisSource, MockVision, OpenAiVision};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub profiles: Arc<dyn ProfileStore>,
    pub meals: Arc<dyn MealStore>,
    pub media: Arc<MediaStorage>,
    pub limiter: Arc<RateLimiter>,
    pub analysis_cache: Arc<TtlCache<CachedAnalysis>>,
    pub nutrition: Arc<NutritionEnricher>,
    pub vision: Arc<dyn AnalysisSource>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
        }

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        let media = MediaStorage::new(
            storage,
            Arc::new(PgQuotaOracle::new(db.clone())),
            config.storage.cdn_base_url.clone(),
        );

        let vision: Arc<dyn AnalysisSource> = match &config.vision.api_key {
            Some(key) => Arc::new(OpenAiVision::new(key.clone(), &config.vision)?),
            None => Arc::new(MockVision),
        };

        let nutrition = match &config.nutrition.api_key {
            Some(key) => {
                let client = UsdaClient::new(key.clone(), &config.nutrition)?;
                NutritionEnricher::new(Some(Arc::new(client) as Arc<dyn NutrientSource>))
            }
            None => NutritionEnricher::disabled(),
        };

        tracing::info!(
            vision_model = vision.model(),
            enrichment = nutrition.is_enabled(),
            "analysis collaborators ready"
        );

        Ok(Self {
            profiles: Arc::new(PgProfileStore::new(db.clone())),
            meals: Arc::new(PgMealStore::new(db)),
            media: Arc::new(media),
            limiter: Arc::new(RateLimiter::default()),
            analysis_cache: Arc::new(TtlCache::in_memory(ANALYSIS_TTL)),
            nutrition: Arc::new(nutrition),
            vision,
            config,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        testing::Harness::new().state
    }
}
