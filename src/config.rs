use std::time::Duration;

use serde::Deserialize;

use crate::profiles::Tier;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Vision inference endpoint. `api_key = None` runs the service in mock mode.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Nutrition database. `api_key = None` disables enrichment.
#[derive(Debug, Clone, Deserialize)]
pub struct NutritionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub cdn_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TierLimit {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub free: u32,
    pub premium_monthly: u32,
    pub premium_yearly: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            free: 10,
            premium_monthly: 100,
            premium_yearly: 200,
            window_secs: 3600,
        }
    }
}

impl RateLimitConfig {
    pub fn for_tier(&self, tier: Tier) -> TierLimit {
        let max_requests = match tier {
            Tier::Free => self.free,
            Tier::PremiumMonthly => self.premium_monthly,
            Tier::PremiumYearly => self.premium_yearly,
        };
        TierLimit {
            max_requests,
            window: Duration::from_secs(self.window_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub vision: VisionConfig,
    pub nutrition: NutritionConfig,
    pub storage: StorageConfig,
    pub rate_limits: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mealmind".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "mealmind-users".into()),
        };
        let vision = VisionConfig {
            api_key: non_empty("OPENAI_API_KEY"),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            timeout_secs: parse_or("VISION_TIMEOUT_SECS", 30),
        };
        let nutrition = NutritionConfig {
            api_key: non_empty("USDA_API_KEY"),
            base_url: std::env::var("USDA_BASE_URL")
                .unwrap_or_else(|_| "https://api.nal.usda.gov/fdc/v1".into()),
            timeout_secs: parse_or("NUTRITION_TIMEOUT_SECS", 10),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT")?,
            bucket: std::env::var("MINIO_BUCKET")?,
            access_key: std::env::var("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            cdn_base_url: non_empty("CDN_BASE_URL"),
        };
        let defaults = RateLimitConfig::default();
        let rate_limits = RateLimitConfig {
            free: parse_or("RATE_LIMIT_FREE", defaults.free),
            premium_monthly: parse_or("RATE_LIMIT_PREMIUM_MONTHLY", defaults.premium_monthly),
            premium_yearly: parse_or("RATE_LIMIT_PREMIUM_YEARLY", defaults.premium_yearly),
            window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", defaults.window_secs),
        };

        if vision.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; vision analysis runs in mock mode");
        }
        if nutrition.api_key.is_none() {
            tracing::info!("USDA_API_KEY not set; nutrition enrichment disabled");
        }

        Ok(Self {
            database_url,
            jwt,
            vision,
            nutrition,
            storage,
            rate_limits,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_limits_are_distinct_and_share_window() {
        let cfg = RateLimitConfig::default();
        let free = cfg.for_tier(Tier::Free);
        let monthly = cfg.for_tier(Tier::PremiumMonthly);
        let yearly = cfg.for_tier(Tier::PremiumYearly);
        assert_eq!(free.max_requests, 10);
        assert_eq!(monthly.max_requests, 100);
        assert_eq!(yearly.max_requests, 200);
        assert_eq!(free.window, Duration::from_secs(3600));
        assert_eq!(free.window, yearly.window);
    }
}
