use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::NutrientBundle;
use crate::config::NutritionConfig;

const SOURCE_TAG: &str = "usda";

// FoodData Central nutrient numbers
const CALORIES: u32 = 1008;
const PROTEIN: u32 = 1003;
const CARBS: u32 = 1005;
const FAT: u32 = 1004;
const FIBER: u32 = 1079;
const SUGAR: u32 = 2000;
const SODIUM: u32 = 1093;
const CHOLESTEROL: u32 = 1253;
const SATURATED_FAT: u32 = 1258;
const TRANS_FAT: u32 = 1257;

#[derive(Error, Debug)]
pub enum NutritionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Invalid response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait NutrientSource: Send + Sync {
    /// `Ok(None)` when the database knows no food matching `query`.
    async fn search(&self, query: &str) -> Result<Option<NutrientBundle>, NutritionError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    #[serde(default)]
    food_nutrients: Vec<FoodNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodNutrient {
    nutrient_id: Option<u32>,
    value: Option<f64>,
}

/// USDA FoodData Central search client.
#[derive(Debug, Clone)]
pub struct UsdaClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl UsdaClient {
    pub fn new(api_key: String, cfg: &NutritionConfig) -> Result<Self, NutritionError> {
        Self::with_base_url(
            api_key,
            cfg.base_url.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, NutritionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl NutrientSource for UsdaClient {
    async fn search(&self, query: &str) -> Result<Option<NutrientBundle>, NutritionError> {
        let url = format!("{}/foods/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("pageSize", "1"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NutritionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| NutritionError::Parse(e.to_string()))?;

        Ok(parsed.foods.into_iter().next().map(|f| extract(&f.food_nutrients)))
    }
}

fn extract(nutrients: &[FoodNutrient]) -> NutrientBundle {
    let find = |id: u32| {
        nutrients
            .iter()
            .find(|n| n.nutrient_id == Some(id))
            .and_then(|n| n.value)
            .map(round2)
    };
    NutrientBundle {
        calories: find(CALORIES),
        protein: find(PROTEIN),
        carbs: find(CARBS),
        fat: find(FAT),
        fiber: find(FIBER),
        sugar: find(SUGAR),
        sodium: find(SODIUM),
        cholesterol: find(CHOLESTEROL),
        saturated_fat: find(SATURATED_FAT),
        trans_fat: find(TRANS_FAT),
        source: SOURCE_TAG.to_string(),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
