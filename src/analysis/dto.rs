use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{AnalysisResult, Allergens, HealthInsights, Nutrition, Portion, PremiumAnalysis};
use crate::profiles::Tier;

/// Ingredients shown to free-tier callers.
pub const FREE_INGREDIENT_LIMIT: usize = 3;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub image: Option<String>,
    pub mode: Option<String>,
}

/// Public projection of an [`AnalysisResult`] for one tier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub food_name: String,
    pub description: String,
    pub confidence: f64,
    pub nutrition: Nutrition,
    pub ingredients: Vec<String>,
    pub portion: Portion,
    pub allergens: Allergens,
    pub health_insights: HealthInsights,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_analysis: Option<PremiumAnalysis>,
    pub tier: Tier,
}

impl AnalysisView {
    /// Free callers get at most three ingredients, no "possible" allergens
    /// and no premium block.
    pub fn shaped(result: &AnalysisResult, tier: Tier) -> Self {
        let mut view = Self {
            food_name: result.food_name.clone(),
            description: result.description.clone(),
            confidence: result.confidence,
            nutrition: result.nutrition.clone(),
            ingredients: result.ingredients.clone(),
            portion: result.portion.clone(),
            allergens: result.allergens.clone(),
            health_insights: result.health_insights.clone(),
            tags: result.tags.clone(),
            premium_analysis: result.premium_analysis.clone(),
            tier,
        };
        if !tier.is_premium() {
            view.ingredients.truncate(FREE_INGREDIENT_LIMIT);
            view.allergens.possible.clear();
            view.premium_analysis = None;
        }
        view
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub model: String,
    pub tier: Tier,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub meal_id: Uuid,
    pub analysis: AnalysisView,
    pub metadata: ResponseMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::enhance::enhance;
    use crate::analysis::{AnalysisMode, ModeAnalysis, RawAnalysis};

    fn rich() -> AnalysisResult {
        let mut premium = PremiumAnalysis::new();
        premium.insert(AnalysisMode::Fitness.premium_key().into(), ModeAnalysis::default());
        enhance(RawAnalysis {
            food_name: Some("Sesame bagel with cream cheese".into()),
            ingredients: Some(vec![
                "bagel".into(),
                "cream cheese".into(),
                "sesa seeds".into(),
                "salt".into(),
                "chives".into(),
            ]),
            allergens: Some(Allergens {
                detected: vec!["milk".into()],
                possible: vec!["sesame".into()],
                confidence: 0.9,
            }),
            premium_analysis: Some(premium),
            ..Default::default()
        })
    }

    #[test]
    fn free_view_is_trimmed() {
        let json = serde_json::to_value(AnalysisView::shaped(&rich(), Tier::Free)).unwrap();
        assert_eq!(json["ingredients"].as_array().unwrap().len(), 3);
        assert!(json["allergens"]["possible"].as_array().unwrap().is_empty());
        assert_eq!(json["allergens"]["detected"][0], "milk");
        assert!(json.get("premiumAnalysis").is_none());
        assert_eq!(json["tier"], "free");
    }

    #[test]
    fn paid_view_keeps_everything() {
        for tier in [Tier::PremiumMonthly, Tier::PremiumYearly] {
            let json = serde_json::to_value(AnalysisView::shaped(&rich(), tier)).unwrap();
            assert_eq!(json["ingredients"].as_array().unwrap().len(), 5);
            assert_eq!(json["allergens"]["possible"][0], "sesame");
            assert!(json["premiumAnalysis"]["fitnessMode"].is_object());
        }
    }

    #[test]
    fn short_ingredient_lists_are_untouched() {
        let r = enhance(RawAnalysis {
            ingredients: Some(vec!["rice".into()]),
            ..Default::default()
        });
        assert_eq!(AnalysisView::shaped(&r, Tier::Free).ingredients, vec!["rice".to_string()]);
    }
}
