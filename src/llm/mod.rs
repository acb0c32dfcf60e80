//! Language-model gateway
//!
//! - **config**: endpoint, model and sampling parameters
//! - **prompts**: prompt templates for recipes, consumption and free-form replies
//! - **client**: the `generateContent` HTTP client
//! - **extract**: tolerant JSON extraction from model replies
//! - **fallback**: deterministic offline answers
//! - **gateway**: the `NutritionGateway` seam and fallback substitution

pub mod client;
pub mod config;
pub mod extract;
pub mod fallback;
pub mod gateway;
pub mod prompts;

pub use client::{GeminiClient, TextGenerator};
pub use config::GatewayConfig;
pub use extract::{extract_json, parse_reply};
pub use gateway::{resilient, LexicalGateway, ModelGateway, NutritionGateway, ResilientGateway, WithFallback};
