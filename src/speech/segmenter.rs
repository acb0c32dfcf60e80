//! Utterance segmentation over recognizer fragments
//!
//! Final fragments accumulate until a silence deadline passes, then the
//! accumulated text is flushed as one [`Utterance`]. Interim text is only for
//! live display and is replaced by every result batch.

use super::source::SpeechFragment;
use crate::messages::Utterance;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// What happened when the silence deadline was checked
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// No deadline armed, or it has not passed yet
    NotDue,
    /// Deadline passed with nothing but whitespace accumulated
    Empty,
    /// Deadline passed while a command was being processed
    Deferred,
    Flushed(Utterance),
}

#[derive(Debug)]
pub struct UtteranceSegmenter {
    silence_timeout: Duration,
    listening: bool,
    final_text: String,
    interim_text: String,
    deadline: Option<Instant>,
}

impl UtteranceSegmenter {
    pub fn new(silence_timeout: Duration) -> Self {
        Self {
            silence_timeout,
            listening: false,
            final_text: String::new(),
            interim_text: String::new(),
            deadline: None,
        }
    }

    /// Begin a new listening period with empty accumulators
    pub fn start(&mut self) {
        self.listening = true;
        self.final_text.clear();
        self.interim_text.clear();
        self.deadline = None;
    }

    /// Apply one result batch. Returns true if a final fragment arrived.
    pub fn on_results(&mut self, fragments: &[SpeechFragment], now: Instant) -> bool {
        let mut interim = String::new();
        let mut got_final = false;

        for fragment in fragments {
            if fragment.is_final {
                self.final_text.push_str(&fragment.text);
                got_final = true;
            } else {
                interim.push_str(&fragment.text);
            }
        }

        self.interim_text = interim;
        if got_final {
            // Restart the silence window
            self.deadline = Some(now + self.silence_timeout);
            debug!("Final text so far: {:?}", self.final_text);
        }
        got_final
    }

    /// Recognizer failed. Only the interim text is lost.
    pub fn on_error(&mut self) {
        self.listening = false;
        self.interim_text.clear();
    }

    /// Recognizer ended on its own or was stopped
    pub fn on_ended(&mut self) {
        self.listening = false;
        self.interim_text.clear();
    }

    /// Check the silence deadline against `now`
    pub fn poll_flush(&mut self, now: Instant, processing: bool) -> FlushOutcome {
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return FlushOutcome::NotDue,
        }
        self.deadline = None;

        let text = self.final_text.trim();
        if text.is_empty() {
            self.final_text.clear();
            return FlushOutcome::Empty;
        }

        if processing {
            debug!("Silence reached while busy, holding {:?}", text);
            return FlushOutcome::Deferred;
        }

        let utterance = Utterance::new(text);
        self.final_text.clear();
        self.interim_text.clear();
        FlushOutcome::Flushed(utterance)
    }

    /// Drop all transcript state and cancel the deadline
    pub fn clear(&mut self) {
        self.final_text.clear();
        self.interim_text.clear();
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn final_text(&self) -> &str {
        &self.final_text
    }

    pub fn interim_text(&self) -> &str {
        &self.interim_text
    }

    pub fn has_pending_flush(&self) -> bool {
        self.deadline.is_some()
    }
}
