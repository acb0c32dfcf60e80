//! Speech input and output
//!
//! - **source**: push-based recognizers feeding speech events
//! - **segmenter**: turns fragments into utterances after a silence timeout
//! - **narrator**: speaks responses through a pluggable sink

pub mod narrator;
pub mod segmenter;
pub mod source;

pub use narrator::{join_worker, CommandSink, LogSink, MemorySink, Narrator, SpeechSink, VoiceSettings};
pub use segmenter::{FlushOutcome, UtteranceSegmenter};
pub use source::{
    LineSource, PushHandle, PushSource, RecognitionConfig, RecognitionSource, SpeechEvent, SpeechFragment,
};
