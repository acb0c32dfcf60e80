//! Deterministic offline answers used when the model is unavailable
//!
//! Nutrition numbers here are a rough approximation, not nutrition-grade
//! data. Macros are fixed fractions of the looked-up base calories
//! (protein 10%, carbs 20%, fat 5%) and are kept as-is for parity.

use crate::messages::{ConsumptionRecord, NutritionEstimate, PantrySnapshot, RecipeIngredient, RecipeSuggestion};
use regex::Regex;
use std::sync::LazyLock;

/// Pantry items copied into a fallback recipe
pub const FALLBACK_RECIPE_ITEMS: usize = 5;

pub const DEFAULT_INGREDIENT: &str = "food item";
pub const DEFAULT_UNIT: &str = "piece";

/// Base calories by substring, checked in order
const BASE_CALORIES: &[(&str, f64)] = &[("apple", 52.0), ("banana", 89.0), ("bread", 265.0)];
const DEFAULT_BASE_CALORIES: f64 = 100.0;

const CALORIE_SCALE: f64 = 0.01;
const PROTEIN_RATIO: f64 = 0.1;
const CARBS_RATIO: f64 = 0.2;
const FAT_RATIO: f64 = 0.05;

static QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("quantity pattern is valid"));

static UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(cup|cups|piece|pieces|slice|slices|tbsp|tsp|oz|gram|grams|lb|lbs)\b")
        .expect("unit pattern is valid")
});

// Verb, then an optional article, amount, unit and "of", then one word.
static INGREDIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:ate|had|drank|consumed)\s+(?:(?:a|an|the|some)\s+)?(?:\d+(?:\.\d+)?\s*)?(?:(?:cups?|pieces?|slices?|tbsp|tsp|oz|grams?|lbs?)\s+)?(?:of\s+)?([A-Za-z][\w'-]*)",
    )
    .expect("ingredient pattern is valid")
});

const FALLBACK_INSTRUCTIONS: &[&str] = &[
    "Gather all available ingredients",
    "Prepare ingredients as needed",
    "Cook according to standard preparation methods",
    "Season to taste and serve",
];

/// Canned replies, first keyword match wins
const CANNED_REPLIES: &[(&[&str], &str)] = &[
    (
        &["recipe"],
        "I'd be happy to help you with a recipe! Let me generate one based on your pantry ingredients.",
    ),
    (
        &["eat", "ate"],
        "Great! I've logged that food item for you. Your nutrition totals have been updated.",
    ),
    (&["pantry", "inventory"], "Let me check your pantry inventory for you."),
];

const DEFAULT_REPLY: &str = "I'm here to help with your nutrition tracking! Try asking me about recipes, logging meals, or checking your pantry.";

/// Build a generic recipe from the first few pantry items
pub fn fallback_recipe(dish: &str, pantry: &PantrySnapshot) -> RecipeSuggestion {
    let ingredients = pantry
        .items
        .iter()
        .take(FALLBACK_RECIPE_ITEMS)
        .map(|item| RecipeIngredient {
            name: item.name.clone(),
            quantity: 1.0,
            unit: item.unit.clone(),
            available: true,
        })
        .collect();

    RecipeSuggestion {
        name: format!("Simple {}", dish),
        ingredients,
        instructions: FALLBACK_INSTRUCTIONS.iter().map(|s| s.to_string()).collect(),
        prep_time: Some("15 minutes".to_string()),
        cook_time: Some("20 minutes".to_string()),
        servings: Some(2),
        nutrition: Some(NutritionEstimate {
            calories: 350.0,
            protein: 20.0,
            carbs: 30.0,
            fat: 15.0,
        }),
    }
}

pub fn base_calories(ingredient: &str) -> f64 {
    let lower = ingredient.to_lowercase();
    BASE_CALORIES
        .iter()
        .find(|(food, _)| lower.contains(food))
        .map(|(_, calories)| *calories)
        .unwrap_or(DEFAULT_BASE_CALORIES)
}

/// Regex reading of a consumption statement. Never fails.
pub fn parse_consumption(text: &str) -> ConsumptionRecord {
    let quantity = QUANTITY
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(1.0);

    let unit = UNIT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| DEFAULT_UNIT.to_string());

    let ingredient = INGREDIENT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_INGREDIENT.to_string());

    let base = base_calories(&ingredient);

    ConsumptionRecord {
        ingredient,
        quantity,
        unit,
        calories: (base * quantity * CALORIE_SCALE).round(),
        protein: (base * PROTEIN_RATIO).round(),
        carbs: (base * CARBS_RATIO).round(),
        fat: (base * FAT_RATIO).round(),
    }
}

/// Keyword-selected reply for free-form input
pub fn canned_reply(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    CANNED_REPLIES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, reply)| *reply)
        .unwrap_or(DEFAULT_REPLY)
}
