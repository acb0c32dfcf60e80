pub mod storage;
pub mod types;

pub use storage::ConversationHistory;
pub use types::{
    format_quantity, ClassifiedCommand, CommandStatus, ConsumptionRecord, GroceryItem, GroceryList,
    Intent, LoggedMeal, MealEntry, MealIngredient, MealType, NutritionEstimate, PantryItem,
    PantrySnapshot, PantryUpdate, RecipeIngredient, RecipeSuggestion, Utterance,
};
