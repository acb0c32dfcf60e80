//! Collaborator seams for pantry, nutrition log and shopping list
//!
//! The orchestrator only talks to these traits. The in-memory versions back
//! the binary and the tests.

pub mod nutrition;
pub mod pantry;
pub mod shopping;

pub use nutrition::InMemoryNutritionLog;
pub use pantry::InMemoryPantry;
pub use shopping::InMemoryShoppingList;

use crate::messages::{GroceryList, LoggedMeal, MealEntry, NutritionEstimate, PantryItem, PantrySnapshot, PantryUpdate};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PantryStore: Send + Sync {
    async fn snapshot(&self) -> Result<PantrySnapshot>;

    /// Decrement by exact, case-insensitive name. Quantities clamp at zero.
    async fn consume(&self, ingredient: &str, quantity: f64) -> Result<PantryUpdate>;

    /// Add an item, merging quantities into an existing entry of the same name
    async fn add_item(&self, item: PantryItem) -> Result<()>;
}

#[async_trait]
pub trait NutritionLog: Send + Sync {
    async fn append_meal(&self, entry: MealEntry) -> Result<LoggedMeal>;

    async fn today_totals(&self) -> Result<NutritionEstimate>;
}

#[async_trait]
pub trait ShoppingList: Send + Sync {
    /// Add names to the active list, creating one if none is open
    async fn add_items(&self, names: &[String]) -> Result<GroceryList>;

    async fn active_list(&self) -> Result<Option<GroceryList>>;
}
