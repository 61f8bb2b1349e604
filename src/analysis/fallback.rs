use super::model::{Nutrition, RawAnalysis};

/// Model name reported when [`fallback_analysis`] stood in for the vision model.
pub const FALLBACK_MODEL: &str = "fallback";

/// Generic low-confidence estimate stored when the vision model could not
/// produce a usable answer. Everything else is derived by `enhance`.
pub fn fallback_analysis() -> RawAnalysis {
    RawAnalysis {
        food_name: Some("Mixed meal".into()),
        confidence: Some(0.5),
        nutrition: Some(Nutrition {
            calories: 400.0,
            protein: 20.0,
            carbs: 45.0,
            fat: 15.0,
            ..Default::default()
        }),
        description: Some(
            "Automatic recognition is temporarily unavailable; nutrition values are a generic estimate."
                .into(),
        ),
        tags: Some(vec!["estimate".into()]),
        ..Default::default()
    }
}
