//! Canonical nutrient lookups from an external nutrition database.

mod client;
mod services;

use serde::{Deserialize, Serialize};

#[cfg(test)]
pub use client::NutritionError;
pub use client::{NutrientSource, UsdaClient};
pub use services::NutritionEnricher;

/// Per-food nutrient values. A nutrient the database did not report is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutrientBundle {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub cholesterol: Option<f64>,
    pub saturated_fat: Option<f64>,
    pub trans_fat: Option<f64>,
    pub source: String,
}
