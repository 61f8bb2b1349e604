use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::nutrition::NutrientBundle;

/// Focus of an analysis request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    #[default]
    Health,
    Fitness,
    WeightLoss,
    MuscleGain,
    Diabetes,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 5] = [
        AnalysisMode::Health,
        AnalysisMode::Fitness,
        AnalysisMode::WeightLoss,
        AnalysisMode::MuscleGain,
        AnalysisMode::Diabetes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Health => "health",
            AnalysisMode::Fitness => "fitness",
            AnalysisMode::WeightLoss => "weight_loss",
            AnalysisMode::MuscleGain => "muscle_gain",
            AnalysisMode::Diabetes => "diabetes",
        }
    }

    /// Key of this mode's block inside `premiumAnalysis`.
    pub fn premium_key(&self) -> &'static str {
        match self {
            AnalysisMode::Health => "healthMode",
            AnalysisMode::Fitness => "fitnessMode",
            AnalysisMode::WeightLoss => "weightLossMode",
            AnalysisMode::MuscleGain => "muscleGainMode",
            AnalysisMode::Diabetes => "diabetesMode",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        AnalysisMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unsupported analysis mode: {}", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    #[serde(default, deserialize_with = "lenient::number")]
    pub calories: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub protein: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fat: f64,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub fiber: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sugar: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sodium: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cholesterol: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub saturated_fat: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub trans_fat: Option<f64>,
    /// Where the figures came from: `ai` or `usda`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Nutrition {
    /// Overlays looked-up values; keys missing from `bundle` keep their estimate.
    pub fn merge(&mut self, bundle: &NutrientBundle) {
        if let Some(v) = bundle.calories {
            self.calories = v;
        }
        if let Some(v) = bundle.protein {
            self.protein = v;
        }
        if let Some(v) = bundle.carbs {
            self.carbs = v;
        }
        if let Some(v) = bundle.fat {
            self.fat = v;
        }
        self.fiber = bundle.fiber.or(self.fiber);
        self.sugar = bundle.sugar.or(self.sugar);
        self.sodium = bundle.sodium.or(self.sodium);
        self.cholesterol = bundle.cholesterol.or(self.cholesterol);
        self.saturated_fat = bundle.saturated_fat.or(self.saturated_fat);
        self.trans_fat = bundle.trans_fat.or(self.trans_fat);
        self.source = Some(bundle.source.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portion {
    #[serde(default, deserialize_with = "lenient::number")]
    pub estimated_weight: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub serving_size: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub servings_detected: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allergens {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub detected: Vec<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub possible: Vec<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInsights {
    #[serde(default, deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub positives: Vec<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub concerns: Vec<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub dietary_info: Vec<String>,
}

/// One mode's block of the paid-tier deep analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeAnalysis {
    #[serde(default, deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub insights: Vec<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub metrics: serde_json::Map<String, serde_json::Value>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub deep_analysis: String,
}

/// Keyed by [`AnalysisMode::premium_key`].
pub type PremiumAnalysis = BTreeMap<String, ModeAnalysis>;

/// Analysis as returned by the vision model; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    pub food_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub confidence: Option<f64>,
    pub ingredients: Option<Vec<String>>,
    pub nutrition: Option<Nutrition>,
    pub portion: Option<Portion>,
    pub allergens: Option<Allergens>,
    pub health_insights: Option<HealthInsights>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub premium_analysis: Option<PremiumAnalysis>,
}

/// Structurally complete analysis, produced by [`super::enhance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub food_name: String,
    pub confidence: f64,
    pub ingredients: Vec<String>,
    pub nutrition: Nutrition,
    pub portion: Portion,
    pub allergens: Allergens,
    pub health_insights: HealthInsights,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_analysis: Option<PremiumAnalysis>,
}

/// Vision models emit `null` for unknown values and sometimes quote numbers;
/// neither may sink an otherwise usable analysis.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_number(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(as_number(&Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(as_number(&Value::deserialize(d)?))
    }

    pub fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_is_case_insensitive_and_strict() {
        assert_eq!("Health".parse::<AnalysisMode>().unwrap(), AnalysisMode::Health);
        assert_eq!("weight_loss".parse::<AnalysisMode>().unwrap(), AnalysisMode::WeightLoss);
        assert!("vibes".parse::<AnalysisMode>().is_err());
        assert_eq!(AnalysisMode::default(), AnalysisMode::Health);
        assert_eq!(AnalysisMode::MuscleGain.premium_key(), "muscleGainMode");
    }

    #[test]
    fn raw_analysis_accepts_partial_payloads() {
        let raw: RawAnalysis = serde_json::from_str(
            r#"{"foodName":"Toast","nutrition":{"calories":120,"saturatedFat":1.5}}"#,
        )
        .unwrap();
        assert_eq!(raw.food_name.as_deref(), Some("Toast"));
        let n = raw.nutrition.unwrap();
        assert_eq!(n.calories, 120.0);
        assert_eq!(n.protein, 0.0);
        assert_eq!(n.saturated_fat, Some(1.5));
        assert!(raw.allergens.is_none());
    }

    #[test]
    fn nulls_and_quoted_numbers_do_not_reject_the_payload() {
        let raw: RawAnalysis = serde_json::from_str(
            r#"{
                "foodName": "Ramen",
                "confidence": "0.8",
                "nutrition": {"calories": "450", "protein": null, "fiber": null, "sodium": "1200.5"},
                "portion": {"estimatedWeight": null, "unit": null, "servingsDetected": "1"},
                "healthInsights": {"score": "n/a", "concerns": null}
            }"#,
        )
        .unwrap();
        assert_eq!(raw.confidence, Some(0.8));
        let n = raw.nutrition.unwrap();
        assert_eq!(n.calories, 450.0);
        assert_eq!(n.protein, 0.0);
        assert_eq!(n.fiber, None);
        assert_eq!(n.sodium, Some(1200.5));
        let p = raw.portion.unwrap();
        assert_eq!(p.estimated_weight, 0.0);
        assert_eq!(p.unit, "");
        assert_eq!(p.servings_detected, 1.0);
        let h = raw.health_insights.unwrap();
        assert_eq!(h.score, 0.0);
        assert!(h.concerns.is_empty());
    }

    #[test]
    fn merge_prefers_lookup_values_and_keeps_the_rest() {
        let mut n = Nutrition {
            calories: 500.0,
            protein: 10.0,
            carbs: 60.0,
            fat: 20.0,
            fiber: Some(3.0),
            sodium: Some(800.0),
            source: Some("ai".into()),
            ..Default::default()
        };
        let bundle = NutrientBundle {
            calories: Some(450.0),
            protein: Some(12.5),
            sugar: Some(9.0),
            source: "usda".into(),
            ..Default::default()
        };
        n.merge(&bundle);
        assert_eq!(n.calories, 450.0);
        assert_eq!(n.protein, 12.5);
        assert_eq!(n.carbs, 60.0);
        assert_eq!(n.fiber, Some(3.0));
        assert_eq!(n.sugar, Some(9.0));
        assert_eq!(n.sodium, Some(800.0));
        assert_eq!(n.source.as_deref(), Some("usda"));
    }
}
