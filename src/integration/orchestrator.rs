//! Command orchestrator
//!
//! Classifies an utterance, records it in the conversation history, runs the
//! matching handler and resolves the history entry with the response. A
//! handler error or panic becomes a fixed apology; nothing is re-raised.

use crate::integration::classifier::{asks_for_low_stock, classify, extract_dish};
use crate::llm::NutritionGateway;
use crate::messages::{
    format_quantity, ClassifiedCommand, CommandStatus, ConversationHistory, Intent, MealEntry,
    MealIngredient, MealType, PantryUpdate, RecipeSuggestion, Utterance,
};
use crate::store::{NutritionLog, PantryStore, ShoppingList};
use crate::{AlfredoError, Result};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const APOLOGY: &str = "I'm sorry, I couldn't process that request. Please try again.";

pub const SHOPPING_REPLY: &str = "I can help you manage your shopping list. What would you like to add?";

/// Suffix on meal names logged by voice
pub const VOICE_LOGGED_SUFFIX: &str = "(voice logged)";

/// Result of one processed utterance
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command_id: Uuid,
    pub intent: Intent,
    pub response: String,
    /// Set by recipe commands
    pub recipe: Option<RecipeSuggestion>,
    pub status: CommandStatus,
}

impl CommandOutcome {
    pub fn is_resolved(&self) -> bool {
        self.status == CommandStatus::Resolved
    }
}

struct HandlerReply {
    response: String,
    recipe: Option<RecipeSuggestion>,
}

impl HandlerReply {
    fn text(response: String) -> Self {
        Self {
            response,
            recipe: None,
        }
    }
}

pub struct Orchestrator {
    gateway: Arc<dyn NutritionGateway>,
    pantry: Arc<dyn PantryStore>,
    nutrition: Arc<dyn NutritionLog>,
    shopping: Arc<dyn ShoppingList>,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn NutritionGateway>,
        pantry: Arc<dyn PantryStore>,
        nutrition: Arc<dyn NutritionLog>,
        shopping: Arc<dyn ShoppingList>,
    ) -> Self {
        Self {
            gateway,
            pantry,
            nutrition,
            shopping,
        }
    }

    /// Classify, dispatch and resolve one utterance
    pub async fn process(&self, utterance: &Utterance, history: &ConversationHistory) -> CommandOutcome {
        debug!("Received utterance: {:?}", utterance.text());
        let intent = classify(utterance.text());
        let command = ClassifiedCommand::new(utterance, intent);
        let command_id = command.id;
        history.add(command);
        debug!("Command {} classified as {}", command_id, intent);

        debug!("Command {} dispatched to the {} handler", command_id, intent);
        let dispatched = AssertUnwindSafe(self.dispatch(intent, utterance.text()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(AlfredoError::DispatchError(format!(
                    "handler panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        let (reply, status) = match dispatched {
            Ok(reply) => {
                debug!("Command {} resolved", command_id);
                (reply, CommandStatus::Resolved)
            }
            Err(e) => {
                error!("Command {} failed: {}", command_id, e);
                let failure = match e {
                    AlfredoError::DispatchError(_) => e,
                    other => AlfredoError::DispatchError(other.to_string()),
                };
                (HandlerReply::text(failure.user_message()), CommandStatus::Failed)
            }
        };

        history.resolve(command_id, reply.response.clone(), status);
        info!("Command {} ({}) finished as {:?}", command_id, intent, status);

        CommandOutcome {
            command_id,
            intent,
            response: reply.response,
            recipe: reply.recipe,
            status,
        }
    }

    async fn dispatch(&self, intent: Intent, text: &str) -> Result<HandlerReply> {
        match intent {
            Intent::Recipe => self.handle_recipe(text).await,
            Intent::Consumption => self.handle_consumption(text).await.map(HandlerReply::text),
            Intent::Pantry => self.handle_pantry(text).await.map(HandlerReply::text),
            // Placeholder: voice does not edit the shopping list
            Intent::Shopping => Ok(HandlerReply::text(SHOPPING_REPLY.to_string())),
            Intent::General => self.handle_general(text).await.map(HandlerReply::text),
        }
    }

    async fn handle_recipe(&self, text: &str) -> Result<HandlerReply> {
        let dish = extract_dish(text);
        let pantry = self.pantry.snapshot().await?;
        let recipe = self.gateway.generate_recipe(&dish, &pantry).await?;

        let missing: Vec<String> = recipe.missing_ingredients().map(|i| i.name.clone()).collect();
        let available = recipe.available_ingredients().count();

        let response = if missing.is_empty() {
            format!(
                "Perfect! Here's a recipe for {} using ingredients from your pantry.",
                recipe.name
            )
        } else {
            if let Err(e) = self.shopping.add_items(&missing).await {
                warn!("Could not add missing ingredients to shopping list: {}", e);
            }
            format!(
                "Here's a recipe for {}! I've found {} ingredients in your pantry and added {} missing items to your shopping list.",
                recipe.name,
                available,
                missing.len()
            )
        };

        Ok(HandlerReply {
            response,
            recipe: Some(recipe),
        })
    }

    async fn handle_consumption(&self, text: &str) -> Result<String> {
        let record = self.gateway.parse_consumption(text).await?;

        let meal = self
            .nutrition
            .append_meal(MealEntry {
                name: format!("{} {}", record.ingredient, VOICE_LOGGED_SUFFIX),
                meal_type: MealType::Snack,
                ingredients: vec![MealIngredient::from(&record)],
            })
            .await?;
        debug!("Logged meal {} ({} kcal)", meal.id, meal.totals.calories);

        match self.pantry.consume(&record.ingredient, record.quantity).await? {
            PantryUpdate::Decremented { remaining, low_stock } => {
                info!("Pantry {} down to {}", record.ingredient, format_quantity(remaining));
                if low_stock {
                    info!("{} is running low", record.ingredient);
                }
            }
            PantryUpdate::NotFound => {
                debug!("No pantry entry for {}, skipping decrement", record.ingredient);
            }
        }

        Ok(format!(
            "I've logged {} {} of {} ({} calories) to your daily intake.",
            format_quantity(record.quantity),
            record.unit,
            record.ingredient,
            format_quantity(record.calories)
        ))
    }

    async fn handle_pantry(&self, text: &str) -> Result<String> {
        let pantry = self.pantry.snapshot().await?;
        let low_stock = pantry.low_stock();

        if asks_for_low_stock(text) {
            if low_stock.is_empty() {
                return Ok("All your pantry items are well stocked!".to_string());
            }
            let names = low_stock
                .iter()
                .map(|i| i.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(format!(
                "You're running low on: {}. Consider adding these to your shopping list.",
                names
            ));
        }

        let tail = if low_stock.is_empty() {
            "Everything looks well stocked!".to_string()
        } else {
            format!("{} items are running low.", low_stock.len())
        };
        Ok(format!("You have {} items in your pantry. {}", pantry.len(), tail))
    }

    async fn handle_general(&self, text: &str) -> Result<String> {
        let pantry = self.pantry.snapshot().await?;
        let context = if pantry.is_empty() {
            "The pantry is empty.".to_string()
        } else {
            format!("Pantry has {} items: {}", pantry.len(), pantry.describe())
        };
        self.gateway.freeform_reply(text, &context).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
