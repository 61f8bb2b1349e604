use async_trait::async_trait;

use super::{AnalysisSource, VisionError};
use crate::analysis::{
    AnalysisMode, Allergens, HealthInsights, ModeAnalysis, Nutrition, Portion, PremiumAnalysis,
    RawAnalysis,
};
use crate::media::ImagePayload;
use crate::profiles::Tier;

/// Fixed illustrative analysis, used when no vision credential is configured.
#[derive(Debug, Clone, Default)]
pub struct MockVision;

pub const MOCK_MODEL: &str = "mock";

#[async_trait]
impl AnalysisSource for MockVision {
    async fn analyze(
        &self,
        _image: &ImagePayload,
        mode: AnalysisMode,
        tier: Tier,
    ) -> Result<RawAnalysis, VisionError> {
        Ok(sample(mode, tier))
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }
}

fn sample(mode: AnalysisMode, tier: Tier) -> RawAnalysis {
    let premium_analysis = tier.is_premium().then(|| {
        let mut metrics = serde_json::Map::new();
        metrics.insert("proteinPerCalorie".into(), serde_json::json!(0.09));
        metrics.insert("vegetableServings".into(), serde_json::json!(2));

        let mut block = PremiumAnalysis::new();
        block.insert(
            mode.premium_key().to_string(),
            ModeAnalysis {
                score: 82.0,
                insights: vec![
                    "Lean protein supports satiety".into(),
                    "Leafy greens add micronutrient density".into(),
                ],
                metrics,
                recommendations: vec!["Add a whole-grain side for sustained energy".into()],
                deep_analysis: "A balanced, protein-forward plate with moderate fat from the dressing and plenty of fiber from mixed vegetables.".into(),
            },
        );
        block
    });

    RawAnalysis {
        food_name: Some("Grilled Chicken Salad".into()),
        confidence: Some(0.92),
        ingredients: Some(vec![
            "grilled chicken breast".into(),
            "romaine lettuce".into(),
            "cherry tomatoes".into(),
            "cucumber".into(),
            "olive oil vinaigrette".into(),
        ]),
        nutrition: Some(Nutrition {
            calories: 350.0,
            protein: 32.0,
            carbs: 12.0,
            fat: 18.0,
            fiber: Some(4.0),
            sugar: Some(6.0),
            sodium: Some(480.0),
            cholesterol: Some(85.0),
            saturated_fat: Some(3.0),
            trans_fat: Some(0.0),
            source: None,
        }),
        portion: Some(Portion {
            estimated_weight: 300.0,
            unit: "g".into(),
            serving_size: "1 bowl".into(),
            servings_detected: 1.0,
        }),
        allergens: Some(Allergens {
            detected: vec![],
            possible: vec!["mustard".into()],
            confidence: 0.8,
        }),
        health_insights: Some(HealthInsights {
            score: 85.0,
            positives: vec!["High in protein".into(), "Rich in vegetables".into()],
            concerns: vec![],
            recommendations: vec!["Great choice for a balanced lunch".into()],
            dietary_info: vec!["gluten-free".into(), "high-protein".into()],
        }),
        description: Some("A fresh salad topped with sliced grilled chicken breast and a light vinaigrette.".into()),
        tags: Some(vec!["salad".into(), "high-protein".into(), "lunch".into()]),
        premium_analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn premium_block_only_for_paid_tiers() {
        let img = ImagePayload::new("image/png", Bytes::from_static(b"png"));
        let free = MockVision.analyze(&img, AnalysisMode::Health, Tier::Free).await.unwrap();
        assert!(free.premium_analysis.is_none());

        let paid = MockVision
            .analyze(&img, AnalysisMode::Diabetes, Tier::PremiumMonthly)
            .await
            .unwrap();
        assert!(paid.premium_analysis.unwrap().contains_key("diabetesMode"));
        assert_eq!(MockVision.model(), "mock");
    }
}
