//! Configuration for the assistant
//!
//! Loaded from a TOML file; every section and field is optional.

use crate::llm::config::GatewayConfig;
use crate::messages::types::default_low_stock_threshold;
use crate::messages::PantryItem;
use crate::speech::{RecognitionConfig, VoiceSettings};
use crate::{AlfredoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pantry entry given in the config file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PantrySeed {
    pub name: String,
    pub quantity: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub low_stock_threshold: Option<f64>,
}

fn default_unit() -> String {
    "piece".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PantryConfig {
    /// Threshold for seeded items that do not set their own
    pub low_stock_threshold: f64,
    pub items: Vec<PantrySeed>,
}

impl Default for PantryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: default_low_stock_threshold(),
            items: Vec::new(),
        }
    }
}

/// Configuration for the complete assistant
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub gateway: GatewayConfig,
    pub recognition: RecognitionConfig,
    pub narrator: VoiceSettings,
    pub pantry: PantryConfig,
}

impl AssistantConfig {
    /// Read and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate().map_err(AlfredoError::ConfigError)?;
        Ok(config)
    }

    /// Set the gateway configuration
    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_recognition(mut self, recognition: RecognitionConfig) -> Self {
        self.recognition = recognition;
        self
    }

    pub fn with_narrator(mut self, narrator: VoiceSettings) -> Self {
        self.narrator = narrator;
        self
    }

    /// Pantry items to start with
    pub fn seed_items(&self) -> Vec<PantryItem> {
        self.pantry
            .items
            .iter()
            .map(|seed| {
                let threshold = seed
                    .low_stock_threshold
                    .unwrap_or(self.pantry.low_stock_threshold);
                PantryItem::new(seed.name.clone(), seed.quantity, seed.unit.clone()).with_threshold(threshold)
            })
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.gateway.validate()?;
        self.recognition.validate()?;
        self.narrator.validate()?;

        if self.pantry.low_stock_threshold < 0.0 {
            return Err("low_stock_threshold cannot be negative".to_string());
        }
        for seed in &self.pantry.items {
            if seed.name.trim().is_empty() {
                return Err("pantry item needs a name".to_string());
            }
            if seed.quantity < 0.0 {
                return Err(format!("pantry item {} has negative quantity", seed.name));
            }
        }
        Ok(())
    }
}
