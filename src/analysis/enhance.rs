//! Completion of partial model output.
//!
//! [`enhance`] never fails and never performs I/O. Fields the model supplied
//! are kept verbatim, except `confidence`, which is brought into [0, 1];
//! missing ones are filled with defaults or derived from the fields that
//! are present.

use lazy_static::lazy_static;
use regex::Regex;

use super::model::{
    Allergens, AnalysisResult, HealthInsights, Nutrition, Portion, RawAnalysis,
};

pub const DEFAULT_CONFIDENCE: f64 = 0.85;
const DEFAULT_FOOD_NAME: &str = "Unknown food";
const DEFAULT_DESCRIPTION: &str = "No description available.";

/// Allergen name and the ingredient words that count as a definite hit.
/// Each word must stand alone in the ingredient, optionally pluralised.
const ALLERGENS: &[(&str, &[&str])] = &[
    (
        "milk",
        &["milk", "buttermilk", "cheese", "butter", "cream", "yogurt", "yoghurt", "whey", "casein"],
    ),
    ("eggs", &["egg", "mayonnaise", "meringue"]),
    ("fish", &["fish", "salmon", "tuna", "cod", "anchov(?:y|ies)", "trout"]),
    ("shellfish", &["shrimp", "prawn", "crab", "lobster", "clam", "mussel", "oyster", "scallop"]),
    ("tree nuts", &["almond", "walnut", "cashew", "pecan", "pistachio", "hazelnut"]),
    ("peanuts", &["peanut"]),
    ("wheat", &["wheat", "bread", "flour", "pasta", "couscous", "bun"]),
    ("soy", &["soy", "soybean", "tofu", "edamame", "tempeh"]),
    ("sesame", &["sesame", "tahini"]),
];

lazy_static! {
    static ref ALLERGEN_WORDS: Vec<(&'static str, Regex)> = ALLERGENS
        .iter()
        .map(|(name, words)| {
            let pattern = format!(r"\b(?:{})(?:s|es)?\b", words.join("|"));
            (*name, Regex::new(&pattern).unwrap())
        })
        .collect();
}

/// Dish keyword, weight (g), serving description.
const PORTIONS: &[(&str, f64, &str)] = &[
    ("salad", 250.0, "1 bowl"),
    ("sandwich", 200.0, "1 sandwich"),
    ("pasta", 300.0, "1 plate"),
    ("pizza", 150.0, "1 slice"),
    ("burger", 250.0, "1 burger"),
];

pub fn enhance(raw: RawAnalysis) -> AnalysisResult {
    let food_name = raw
        .food_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FOOD_NAME.to_string());
    let ingredients = raw.ingredients.unwrap_or_default();
    let mut nutrition = raw.nutrition.unwrap_or_default();
    if nutrition.source.is_none() {
        nutrition.source = Some("ai".into());
    }

    let allergens = raw
        .allergens
        .unwrap_or_else(|| derive_allergens(&ingredients));
    let health_insights = raw
        .health_insights
        .unwrap_or_else(|| derive_health_insights(&nutrition));
    let portion = raw.portion.unwrap_or_else(|| estimate_portion(&food_name));

    AnalysisResult {
        confidence: raw
            .confidence
            .map_or(DEFAULT_CONFIDENCE, normalize_confidence),
        description: raw
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        tags: raw.tags.unwrap_or_default(),
        premium_analysis: raw.premium_analysis,
        food_name,
        ingredients,
        nutrition,
        portion,
        allergens,
        health_insights,
    }
}

/// Values above 1 are read as percentages.
fn normalize_confidence(c: f64) -> f64 {
    if c.is_nan() {
        return DEFAULT_CONFIDENCE;
    }
    let c = if c > 1.0 { c / 100.0 } else { c };
    c.clamp(0.0, 1.0)
}

pub fn derive_allergens(ingredients: &[String]) -> Allergens {
    let lowered: Vec<String> = ingredients.iter().map(|i| i.to_lowercase()).collect();
    let mut detected = Vec::new();
    let mut possible = Vec::new();

    for (allergen, words) in ALLERGEN_WORDS.iter() {
        if lowered.iter().any(|ing| words.is_match(ing)) {
            detected.push(allergen.to_string());
            continue;
        }
        let prefix: String = allergen.chars().take(3).collect();
        if lowered.iter().any(|ing| ing.contains(&prefix)) {
            possible.push(allergen.to_string());
        }
    }

    let confidence = if detected.is_empty() { 0.7 } else { 0.9 };
    Allergens {
        detected,
        possible,
        confidence,
    }
}

pub fn derive_health_insights(n: &Nutrition) -> HealthInsights {
    let mut positives = Vec::new();
    let mut concerns = Vec::new();
    let mut recommendations = Vec::new();

    if n.protein > 20.0 {
        positives.push("High in protein".to_string());
    }
    if n.fiber.is_some_and(|f| f > 5.0) {
        positives.push("Good source of fiber".to_string());
    }
    if n.calories < 300.0 {
        positives.push("Low in calories".to_string());
    }

    if n.sodium.is_some_and(|s| s > 1000.0) {
        concerns.push("High in sodium".to_string());
        recommendations.push("Pair with low-sodium foods for the rest of the day".to_string());
    }
    if n.saturated_fat.is_some_and(|s| s > 10.0) {
        concerns.push("High in saturated fat".to_string());
        recommendations.push("Balance with lean proteins and vegetables".to_string());
    }
    if n.sugar.is_some_and(|s| s > 20.0) {
        concerns.push("High in sugar".to_string());
        recommendations.push("Choose water or unsweetened drinks alongside".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Enjoy as part of a balanced diet".to_string());
    }

    let score = 70.0 + 5.0 * positives.len() as f64 - 10.0 * concerns.len() as f64;

    HealthInsights {
        score: score.clamp(0.0, 100.0),
        positives,
        concerns,
        recommendations,
        dietary_info: Vec::new(),
    }
}

pub fn estimate_portion(food_name: &str) -> Portion {
    let name = food_name.to_lowercase();
    let (weight, serving) = PORTIONS
        .iter()
        .find(|(k, _, _)| name.contains(k))
        .map(|(_, w, s)| (*w, *s))
        .unwrap_or((200.0, "1 serving"));

    Portion {
        estimated_weight: weight,
        unit: "g".into(),
        serving_size: serving.into(),
        servings_detected: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::model::{ModeAnalysis, PremiumAnalysis};

    fn full_raw() -> RawAnalysis {
        let mut premium = PremiumAnalysis::new();
        premium.insert("healthMode".into(), ModeAnalysis { score: 77.0, ..Default::default() });
        RawAnalysis {
            food_name: Some("Ramen".into()),
            confidence: Some(0.42),
            ingredients: Some(vec!["noodles".into(), "broth".into()]),
            nutrition: Some(Nutrition { calories: 650.0, ..Default::default() }),
            portion: Some(Portion {
                estimated_weight: 480.0,
                unit: "ml".into(),
                serving_size: "1 bowl".into(),
                servings_detected: 1.0,
            }),
            allergens: Some(Allergens {
                detected: vec!["soy".into()],
                possible: vec![],
                confidence: 0.5,
            }),
            health_insights: Some(HealthInsights { score: 12.0, ..Default::default() }),
            description: Some("Steaming bowl".into()),
            tags: Some(vec!["soup".into()]),
            premium_analysis: Some(premium),
        }
    }

    #[test]
    fn empty_input_yields_complete_result() {
        let r = enhance(RawAnalysis::default());
        assert_eq!(r.food_name, "Unknown food");
        assert_eq!(r.confidence, DEFAULT_CONFIDENCE);
        assert!(r.ingredients.is_empty());
        assert!(r.tags.is_empty());
        assert_eq!(r.allergens.confidence, 0.7);
        assert!(r.allergens.detected.is_empty());
        assert!((0.0..=100.0).contains(&r.health_insights.score));
        assert!(!r.health_insights.recommendations.is_empty());
        assert_eq!(r.portion.estimated_weight, 200.0);
        assert_eq!(r.portion.serving_size, "1 serving");
        assert_eq!(r.nutrition.source.as_deref(), Some("ai"));
        assert!(r.premium_analysis.is_none());
    }

    #[test]
    fn present_fields_are_kept_verbatim() {
        let raw = full_raw();
        let r = enhance(raw.clone());
        assert_eq!(Some(r.food_name), raw.food_name);
        assert_eq!(Some(r.confidence), raw.confidence);
        assert_eq!(Some(r.ingredients), raw.ingredients);
        assert_eq!(Some(r.portion), raw.portion);
        assert_eq!(Some(r.allergens), raw.allergens);
        assert_eq!(Some(r.health_insights), raw.health_insights);
        assert_eq!(Some(r.description), raw.description);
        assert_eq!(Some(r.tags), raw.tags);
        assert_eq!(r.premium_analysis, raw.premium_analysis);
        assert_eq!(r.nutrition.calories, 650.0);
    }

    #[test]
    fn every_subset_of_missing_fields_is_filled() {
        for mask in 0u32..64 {
            let mut raw = full_raw();
            if mask & 1 != 0 {
                raw.confidence = None;
            }
            if mask & 2 != 0 {
                raw.ingredients = None;
            }
            if mask & 4 != 0 {
                raw.tags = None;
            }
            if mask & 8 != 0 {
                raw.allergens = None;
            }
            if mask & 16 != 0 {
                raw.health_insights = None;
            }
            if mask & 32 != 0 {
                raw.portion = None;
            }
            let original = full_raw();
            let r = enhance(raw);

            assert_eq!(r.food_name, "Ramen", "mask {mask}");
            if mask & 1 == 0 {
                assert_eq!(r.confidence, 0.42);
            } else {
                assert_eq!(r.confidence, DEFAULT_CONFIDENCE);
            }
            if mask & 8 == 0 {
                assert_eq!(Some(r.allergens.clone()), original.allergens);
            }
            if mask & 16 == 0 {
                assert_eq!(Some(r.health_insights.clone()), original.health_insights);
            } else {
                assert!((0.0..=100.0).contains(&r.health_insights.score));
            }
            if mask & 32 == 0 {
                assert_eq!(Some(r.portion.clone()), original.portion);
            } else {
                assert_eq!(r.portion.unit, "g");
            }
        }
    }

    #[test]
    fn wheat_and_milk_detected_from_ingredients() {
        let a = derive_allergens(&["whole wheat bread".into(), "cheddar cheese".into()]);
        assert!(a.detected.contains(&"wheat".to_string()));
        assert!(a.detected.contains(&"milk".to_string()));
        assert_eq!(a.confidence, 0.9);
    }

    #[test]
    fn prefix_match_is_only_possible() {
        let a = derive_allergens(&["sesa seasoning".into()]);
        assert!(a.detected.is_empty());
        assert_eq!(a.possible, vec!["sesame".to_string()]);
        assert_eq!(a.confidence, 0.7);
    }

    #[test]
    fn keywords_inside_other_words_are_not_detected() {
        let a = derive_allergens(&["butternut squash".into(), "grilled eggplant".into()]);
        assert!(a.detected.is_empty());
        assert!(!a.possible.contains(&"milk".to_string()));
        // "egg" still shares the allergen's first letters
        assert_eq!(a.possible, vec!["eggs".to_string()]);

        let a = derive_allergens(&[
            "2 eggs".into(),
            "salted butter".into(),
            "anchovies".into(),
            "Sesame Buns".into(),
        ]);
        assert_eq!(a.detected, vec!["milk", "eggs", "fish", "wheat", "sesame"]);
    }

    #[test]
    fn supplied_confidence_is_brought_into_range() {
        let with = |c: f64| {
            enhance(RawAnalysis {
                confidence: Some(c),
                ..Default::default()
            })
            .confidence
        };
        assert_eq!(with(0.42), 0.42);
        assert_eq!(with(92.0), 0.92);
        assert_eq!(with(1.0), 1.0);
        assert_eq!(with(-0.3), 0.0);
        assert_eq!(with(250.0), 1.0);
        assert_eq!(with(f64::NAN), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn health_score_counts_signals() {
        let lean = Nutrition {
            calories: 250.0,
            protein: 30.0,
            fiber: Some(8.0),
            ..Default::default()
        };
        assert_eq!(derive_health_insights(&lean).score, 85.0);

        let heavy = Nutrition {
            calories: 1200.0,
            protein: 5.0,
            sodium: Some(2500.0),
            saturated_fat: Some(25.0),
            sugar: Some(60.0),
            ..Default::default()
        };
        let h = derive_health_insights(&heavy);
        assert_eq!(h.score, 40.0);
        assert_eq!(h.concerns.len(), 3);
    }

    #[test]
    fn health_score_stays_in_bounds_for_extreme_input() {
        let values = [f64::MIN, -1e9, 0.0, 1e9, f64::MAX, f64::INFINITY, f64::NAN];
        for &v in &values {
            let n = Nutrition {
                calories: v,
                protein: v,
                carbs: v,
                fat: v,
                fiber: Some(v),
                sugar: Some(v),
                sodium: Some(v),
                saturated_fat: Some(v),
                ..Default::default()
            };
            let score = derive_health_insights(&n).score;
            assert!((0.0..=100.0).contains(&score), "score {score} for {v}");
        }
    }

    #[test]
    fn portion_table_matches_dish_names() {
        assert_eq!(estimate_portion("Caesar Salad").estimated_weight, 250.0);
        assert_eq!(estimate_portion("Pepperoni pizza").serving_size, "1 slice");
        assert_eq!(estimate_portion("Cheeseburger").serving_size, "1 burger");
        assert_eq!(estimate_portion("Miso soup").serving_size, "1 serving");
    }
}
