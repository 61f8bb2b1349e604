use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{MealNutrition, MealRow};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealListItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub health_score: Option<f64>,
    pub ai_confidence: Option<f64>,
    pub status: String,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl MealListItem {
    pub fn from_row(row: MealRow, image_url: Option<String>, thumbnail_url: Option<String>) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            image_url,
            thumbnail_url,
            health_score: row.health_score,
            ai_confidence: row.ai_confidence,
            status: row.status,
            tags: row.tags,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDetails {
    #[serde(flatten)]
    pub meal: MealListItem,
    pub nutrition: Option<MealNutrition>,
    pub analysis: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct MealListResponse {
    pub success: bool,
    pub meals: Vec<MealListItem>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

impl Pagination {
    /// Limit clamped to 1..=100, offset to >= 0.
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}
