//! Data model shared by the segmenter, gateway, orchestrator and stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// A complete unit of spoken input, flushed after a silence timeout.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    text: String,
    timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Classified purpose of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Recipe,
    Consumption,
    Pantry,
    Shopping,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Recipe => "recipe",
            Intent::Consumption => "consumption",
            Intent::Pantry => "pantry",
            Intent::Shopping => "shopping",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a command in the conversation history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    #[default]
    Pending,
    Resolved,
    Failed,
}

/// An utterance with its intent, kept in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedCommand {
    pub id: Uuid,
    pub utterance: String,
    pub intent: Intent,
    pub processed: bool,
    pub response: Option<String>,
    pub status: CommandStatus,
    pub timestamp: DateTime<Utc>,
}

impl ClassifiedCommand {
    pub fn new(utterance: &Utterance, intent: Intent) -> Self {
        Self {
            id: Uuid::new_v4(),
            utterance: utterance.text().to_string(),
            intent,
            processed: false,
            response: None,
            status: CommandStatus::Pending,
            timestamp: utterance.timestamp(),
        }
    }
}

/// Structured reading of "I ate ..." style input.
///
/// Never stored directly; it becomes a logged meal and a pantry decrement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub ingredient: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    /// Numbers, numeric strings and fractions like "1 1/2" are accepted.
    /// Anything else ("to taste") reads as 1.
    #[serde(default = "default_quantity", deserialize_with = "lenient_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    /// Point-in-time pantry match, computed when the recipe was generated
    #[serde(default)]
    pub available: bool,
}

fn default_quantity() -> f64 {
    1.0
}

/// "2", "0.5", "1/2" or "1 1/2"
fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<f64>() {
        return Some(value);
    }

    let fraction = |part: &str| -> Option<f64> {
        let (num, den) = part.split_once('/')?;
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        (den != 0.0).then(|| num / den)
    };

    match text.split_once(char::is_whitespace) {
        Some((whole, rest)) => Some(whole.parse::<f64>().ok()? + fraction(rest)?),
        None => fraction(text),
    }
}

fn lenient_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let quantity = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(&s),
        _ => None,
    };
    Ok(quantity
        .filter(|q| q.is_finite() && *q > 0.0)
        .unwrap_or_else(default_quantity))
}

fn lenient_servings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let servings = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        // "4" or "4 servings"
        Value::String(s) => s.split_whitespace().next().and_then(parse_amount),
        _ => None,
    };
    Ok(servings
        .filter(|s| s.is_finite() && *s >= 1.0 && *s <= u32::MAX as f64)
        .map(|s| s.round() as u32))
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionEstimate {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSuggestion {
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub prep_time: Option<String>,
    #[serde(default)]
    pub cook_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_servings")]
    pub servings: Option<u32>,
    #[serde(default)]
    pub nutrition: Option<NutritionEstimate>,
}

impl RecipeSuggestion {
    /// Overwrite every ingredient's `available` flag from the pantry snapshot
    pub fn annotate_availability(&mut self, pantry: &PantrySnapshot) {
        for ingredient in &mut self.ingredients {
            ingredient.available = pantry.has_match_for(&ingredient.name);
        }
    }

    pub fn available_ingredients(&self) -> impl Iterator<Item = &RecipeIngredient> {
        self.ingredients.iter().filter(|i| i.available)
    }

    pub fn missing_ingredients(&self) -> impl Iterator<Item = &RecipeIngredient> {
        self.ingredients.iter().filter(|i| !i.available)
    }
}

/// One owned ingredient in the pantry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: f64,
}

pub(crate) fn default_low_stock_threshold() -> f64 {
    1.0
}

impl PantryItem {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// Read-only, point-in-time copy of the pantry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PantrySnapshot {
    pub items: Vec<PantryItem>,
}

impl PantrySnapshot {
    pub fn new(items: Vec<PantryItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when some pantry name contains `ingredient`, ignoring case.
    /// A blank ingredient matches nothing.
    pub fn has_match_for(&self, ingredient: &str) -> bool {
        let needle = ingredient.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.items
            .iter()
            .any(|item| item.name.to_lowercase().contains(&needle))
    }

    pub fn low_stock(&self) -> Vec<&PantryItem> {
        self.items.iter().filter(|i| i.is_low_stock()).collect()
    }

    /// "rice (2 cup), eggs (6 piece)" style listing for prompts
    pub fn describe(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("{} ({} {})", i.name, format_quantity(i.quantity), i.unit))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of asking the pantry to decrement an ingredient
#[derive(Debug, Clone, PartialEq)]
pub enum PantryUpdate {
    Decremented { remaining: f64, low_stock: bool },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// One ingredient line of a logged meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealIngredient {
    pub quantity: f64,
    pub unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl From<&ConsumptionRecord> for MealIngredient {
    fn from(record: &ConsumptionRecord) -> Self {
        Self {
            quantity: record.quantity,
            unit: record.unit.clone(),
            calories: record.calories,
            protein: record.protein,
            carbs: record.carbs,
            fat: record.fat,
        }
    }
}

/// A meal to append to the nutrition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub name: String,
    pub meal_type: MealType,
    pub ingredients: Vec<MealIngredient>,
}

/// A meal as stored by the nutrition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedMeal {
    pub id: Uuid,
    pub entry: MealEntry,
    pub totals: NutritionEstimate,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryList {
    pub id: Uuid,
    pub name: String,
    pub items: Vec<GroceryItem>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Print whole numbers without a fractional part ("2", "1.5")
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
