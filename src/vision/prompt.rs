//! Prompt construction. Pure, so every tier/mode combination can be tested
//! without a network call.

use serde_json::{json, Value};

use crate::analysis::AnalysisMode;
use crate::profiles::Tier;

const SYSTEM: &str = "You are a registered dietitian and food scientist. \
Identify the food in the photo and estimate its nutrition for the visible portion. \
Respond with a single JSON object that matches the requested schema exactly. \
Use numbers for numeric fields, grams for macronutrients and milligrams for sodium and cholesterol. \
Do not include any prose outside the JSON object.";

#[derive(Debug, Clone, PartialEq)]
pub struct PromptPlan {
    pub system: String,
    pub user: String,
    /// Image detail hint: `low` or `high`.
    pub detail: &'static str,
    pub max_tokens: u32,
}

pub fn build(mode: AnalysisMode, tier: Tier) -> PromptPlan {
    let schema = serde_json::to_string_pretty(&schema(mode, tier)).unwrap_or_default();
    let mut user = format!(
        "Analysis focus: {}. {}\n\nReturn JSON with this structure:\n{}",
        mode,
        instruction(mode),
        schema
    );
    if tier.is_premium() {
        user.push_str(&format!(
            "\n\nFill premiumAnalysis.{} with a thorough assessment for this focus: \
             a 0-100 score, specific insights, quantitative metrics, actionable \
             recommendations and a paragraph of deep analysis.",
            mode.premium_key()
        ));
    }

    let (detail, max_tokens) = if tier.is_premium() {
        ("high", 2000)
    } else {
        ("low", 1000)
    };

    PromptPlan {
        system: SYSTEM.to_string(),
        user,
        detail,
        max_tokens,
    }
}

pub fn instruction(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Health => {
            "Assess overall nutritional quality, micronutrient density and processing level."
        }
        AnalysisMode::Fitness => {
            "Assess suitability as pre- or post-workout fuel, focusing on protein quality and carbohydrate timing."
        }
        AnalysisMode::WeightLoss => {
            "Assess caloric density, satiety and portion size relative to a calorie deficit."
        }
        AnalysisMode::MuscleGain => {
            "Assess protein content, leucine-rich sources and total energy for muscle synthesis."
        }
        AnalysisMode::Diabetes => {
            "Assess glycemic load, added sugars, fiber and carbohydrate count for blood sugar control."
        }
    }
}

pub fn schema(mode: AnalysisMode, tier: Tier) -> Value {
    let mut schema = json!({
        "foodName": "string",
        "confidence": "number 0-1",
        "ingredients": ["string"],
        "nutrition": {
            "calories": "number",
            "protein": "number",
            "carbs": "number",
            "fat": "number",
            "fiber": "number",
            "sugar": "number",
            "sodium": "number",
            "cholesterol": "number",
            "saturatedFat": "number",
            "transFat": "number"
        },
        "portion": {
            "estimatedWeight": "number",
            "unit": "string",
            "servingSize": "string",
            "servingsDetected": "number"
        },
        "allergens": {
            "detected": ["string"],
            "possible": ["string"],
            "confidence": "number 0-1"
        },
        "healthInsights": {
            "score": "number 0-100",
            "positives": ["string"],
            "concerns": ["string"],
            "recommendations": ["string"],
            "dietaryInfo": ["string"]
        },
        "description": "string",
        "tags": ["string"]
    });

    if tier.is_premium() {
        let block = json!({
            "score": "number 0-100",
            "insights": ["string"],
            "metrics": { "name": "number" },
            "recommendations": ["string"],
            "deepAnalysis": "string"
        });
        let mut premium = serde_json::Map::new();
        premium.insert(mode.premium_key().to_string(), block);
        schema["premiumAnalysis"] = Value::Object(premium);
    }
    schema
}
