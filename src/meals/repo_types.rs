use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// `completed` when the model answered, `degraded` when the fallback
/// analysis was stored instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealStatus {
    Completed,
    Degraded,
}

impl MealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealStatus::Completed => "completed",
            MealStatus::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewMealNutrition {
    pub total_calories_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    pub sodium_mg: Option<f64>,
    pub sugar_g: Option<f64>,
    pub fiber_g: Option<f64>,
    /// Paid tiers only.
    pub micros: Option<serde_json::Value>,
    pub ai_raw: serde_json::Value,
    pub global_score: f64,
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub s3_key: String,
    pub thumbnail_key: Option<String>,
    pub bytes: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Everything written by one analysis, committed atomically.
#[derive(Debug, Clone)]
pub struct NewMeal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    /// Object key, or the inline data URL when upload failed.
    pub image_ref: String,
    pub thumbnail_ref: Option<String>,
    pub health_score: f64,
    pub ai_confidence: f64,
    pub status: MealStatus,
    pub tags: Vec<String>,
    pub analysis: serde_json::Value,
    pub nutrition: NewMealNutrition,
    pub photo: Option<NewPhoto>,
}

#[derive(Debug, Clone, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_ref: String,
    pub thumbnail_ref: Option<String>,
    pub health_score: Option<f64>,
    pub ai_confidence: Option<f64>,
    pub status: String,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MealNutrition {
    pub total_calories_kcal: Option<f64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub sugar_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub micros: Option<serde_json::Value>,
    pub global_score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MealRecord {
    pub meal: MealRow,
    pub analysis: serde_json::Value,
    pub nutrition: Option<MealNutrition>,
}
