//! Nutrition-facing gateway over a text generator, with fallback substitution

use super::client::TextGenerator;
use super::extract::parse_reply;
use super::{fallback, prompts};
use crate::messages::{ConsumptionRecord, PantrySnapshot, RecipeSuggestion};
use crate::{AlfredoError, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Structured operations the orchestrator needs from a language model
#[async_trait]
pub trait NutritionGateway: Send + Sync {
    /// Availability flags on the result reflect `pantry`, not the model's claim
    async fn generate_recipe(&self, dish: &str, pantry: &PantrySnapshot) -> Result<RecipeSuggestion>;

    async fn parse_consumption(&self, utterance: &str) -> Result<ConsumptionRecord>;

    async fn freeform_reply(&self, utterance: &str, context: &str) -> Result<String>;
}

/// Gateway backed by a hosted model. Every failure is an `Err`.
pub struct ModelGateway<G> {
    generator: G,
}

impl<G: TextGenerator> ModelGateway<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

fn validate_consumption(record: &ConsumptionRecord) -> Result<()> {
    if record.ingredient.trim().is_empty() {
        return Err(AlfredoError::ExtractionError(
            "consumption record has no ingredient".to_string(),
        ));
    }
    if !record.quantity.is_finite() || record.quantity <= 0.0 {
        return Err(AlfredoError::ExtractionError(format!(
            "invalid quantity {}",
            record.quantity
        )));
    }
    let macros = [record.calories, record.protein, record.carbs, record.fat];
    if macros.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(AlfredoError::ExtractionError(
            "negative or non-finite nutrition values".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl<G: TextGenerator> NutritionGateway for ModelGateway<G> {
    async fn generate_recipe(&self, dish: &str, pantry: &PantrySnapshot) -> Result<RecipeSuggestion> {
        let reply = self
            .generator
            .generate(&prompts::recipe_prompt(dish, pantry))
            .await?;
        let mut recipe: RecipeSuggestion = parse_reply(&reply)?;
        if recipe.name.trim().is_empty() {
            return Err(AlfredoError::ExtractionError("recipe has no name".to_string()));
        }
        recipe.annotate_availability(pantry);
        debug!(
            "Recipe '{}' with {} ingredients",
            recipe.name,
            recipe.ingredients.len()
        );
        Ok(recipe)
    }

    async fn parse_consumption(&self, utterance: &str) -> Result<ConsumptionRecord> {
        let reply = self
            .generator
            .generate(&prompts::consumption_prompt(utterance))
            .await?;
        let mut record: ConsumptionRecord = parse_reply(&reply)?;
        validate_consumption(&record)?;
        record.unit = record.unit.trim().to_lowercase();
        if record.unit.is_empty() {
            record.unit = fallback::DEFAULT_UNIT.to_string();
        }
        Ok(record)
    }

    async fn freeform_reply(&self, utterance: &str, context: &str) -> Result<String> {
        let reply = self
            .generator
            .generate(&prompts::freeform_prompt(utterance, context))
            .await?;
        Ok(reply.trim().to_string())
    }
}

/// Deterministic offline gateway. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalGateway;

#[async_trait]
impl NutritionGateway for LexicalGateway {
    async fn generate_recipe(&self, dish: &str, pantry: &PantrySnapshot) -> Result<RecipeSuggestion> {
        Ok(fallback::fallback_recipe(dish, pantry))
    }

    async fn parse_consumption(&self, utterance: &str) -> Result<ConsumptionRecord> {
        Ok(fallback::parse_consumption(utterance))
    }

    async fn freeform_reply(&self, utterance: &str, _context: &str) -> Result<String> {
        Ok(fallback::canned_reply(utterance).to_string())
    }
}

/// Try `primary`; on any error log it and answer from `secondary`
pub struct WithFallback<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> WithFallback<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P: NutritionGateway, S: NutritionGateway> NutritionGateway for WithFallback<P, S> {
    async fn generate_recipe(&self, dish: &str, pantry: &PantrySnapshot) -> Result<RecipeSuggestion> {
        match self.primary.generate_recipe(dish, pantry).await {
            Ok(recipe) => Ok(recipe),
            Err(e) => {
                warn!("Recipe generation failed, using fallback: {}", e);
                self.secondary.generate_recipe(dish, pantry).await
            }
        }
    }

    async fn parse_consumption(&self, utterance: &str) -> Result<ConsumptionRecord> {
        match self.primary.parse_consumption(utterance).await {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!("Consumption parsing failed, using fallback: {}", e);
                self.secondary.parse_consumption(utterance).await
            }
        }
    }

    async fn freeform_reply(&self, utterance: &str, context: &str) -> Result<String> {
        match self.primary.freeform_reply(utterance, context).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!("Freeform reply failed, using fallback: {}", e);
                self.secondary.freeform_reply(utterance, context).await
            }
        }
    }
}

/// Model gateway with the lexical fallback behind it
pub type ResilientGateway<G> = WithFallback<ModelGateway<G>, LexicalGateway>;

pub fn resilient<G: TextGenerator>(generator: G) -> ResilientGateway<G> {
    WithFallback::new(ModelGateway::new(generator), LexicalGateway)
}
