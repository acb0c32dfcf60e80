//! Prompt templates for the nutrition assistant

use crate::messages::PantrySnapshot;

/// Name the assistant introduces itself with
pub const ASSISTANT_NAME: &str = "Alfredo";

/// Units the consumption parser is told to prefer
pub const COMMON_UNITS: &[&str] = &["piece", "cup", "slice", "tbsp", "tsp", "oz", "gram", "lb"];

const RECIPE_SHAPE: &str = r#"{
  "name": "Recipe name",
  "ingredients": [
    { "name": "ingredient name", "quantity": 1, "unit": "unit", "available": true }
  ],
  "instructions": ["step 1", "step 2"],
  "prep_time": "10 minutes",
  "cook_time": "20 minutes",
  "servings": 4,
  "nutrition": { "calories": 350, "protein": 25, "carbs": 40, "fat": 12 }
}"#;

const CONSUMPTION_SHAPE: &str = r#"{
  "action": "consume",
  "ingredient": "food name",
  "quantity": 1,
  "unit": "unit",
  "calories": 0,
  "protein": 0,
  "carbs": 0,
  "fat": 0
}"#;

/// Ask for a recipe as a single JSON object, favouring pantry ingredients
pub fn recipe_prompt(dish: &str, pantry: &PantrySnapshot) -> String {
    let available = if pantry.is_empty() {
        "none".to_string()
    } else {
        pantry.describe()
    };

    format!(
        r#"Create a detailed recipe for "{dish}" using the ingredients available in the pantry.

Available ingredients: {available}

Requirements:
- Use as many available ingredients as possible
- Mark each ingredient as available true or false based on the pantry
- Provide step-by-step cooking instructions
- Include estimated prep time, cook time and servings

Return ONLY a JSON object in this format:
{RECIPE_SHAPE}"#
    )
}

/// Ask for a structured reading of a consumption statement
pub fn consumption_prompt(command: &str) -> String {
    format!(
        r#"Parse this food consumption and return ONLY a JSON object.
Command: "{command}"

Return exactly this format:
{CONSUMPTION_SHAPE}

Common units: {units}
Estimate nutrition values based on common food data."#,
        units = COMMON_UNITS.join(", ")
    )
}

/// Open-ended reply for utterances no handler claims
pub fn freeform_prompt(command: &str, context: &str) -> String {
    format!(
        r#"You are {ASSISTANT_NAME}, an AI nutrition assistant. Respond to this user command naturally and helpfully.

Command: "{command}"
Context: {context}

Keep responses concise, friendly and actionable. If it is about food or nutrition, give practical guidance."#
    )
}
