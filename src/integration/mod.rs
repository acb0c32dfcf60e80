//! Integration layer
//!
//! Connects the pipeline: speech source -> segmenter -> classifier ->
//! orchestrator -> narrator.

pub mod classifier;
pub mod config;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use classifier::{classify, extract_dish, IntentRule, INTENT_RULES};
pub use config::{AssistantConfig, PantryConfig, PantrySeed};
pub use orchestrator::{CommandOutcome, Orchestrator, APOLOGY};
pub use session::{SessionCommand, SessionEvent, SessionHandle, VoiceSession};
pub use state::{ProcessingGuard, ProcessingToken, SessionState, SharedSessionState, StatusLine};
