//! Session-scoped shared state
//!
//! Written by the voice session loop, read by front ends and tests.
//! Each session owns its own instance; nothing here is process-wide.

use crate::messages::RecipeSuggestion;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Status line shown to the user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusLine {
    #[default]
    Ready,
    Listening,
    Processing,
    RecognitionError,
}

impl std::fmt::Display for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusLine::Ready => write!(f, "Tap to start speaking..."),
            StatusLine::Listening => write!(f, "Listening... speak now"),
            StatusLine::Processing => write!(f, "Processing your request..."),
            StatusLine::RecognitionError => write!(f, "Speech recognition error. Try again."),
        }
    }
}

/// At-most-one dispatch flag shared by the segmenter and in-flight commands
#[derive(Clone, Debug, Default)]
pub struct ProcessingGuard {
    busy: Arc<AtomicBool>,
}

/// Held while a command is processed; releases the guard when dropped
#[derive(Debug)]
pub struct ProcessingToken {
    busy: Arc<AtomicBool>,
}

impl ProcessingGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or `None` if a command is already in flight
    pub fn try_acquire(&self) -> Option<ProcessingToken> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingToken {
                busy: self.busy.clone(),
            })
    }

    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for ProcessingToken {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Clone, Debug, Default)]
pub struct SessionState {
    /// Recognizer is delivering events
    pub listening: bool,
    /// A command is being processed
    pub processing: bool,
    pub status: StatusLine,
    /// Live, non-final recognizer text
    pub interim_text: String,
    /// Final text accumulated since the last flush
    pub final_text: String,
    /// A silence deadline is armed
    pub pending_flush: bool,
    /// Recipe from the last recipe command
    pub current_recipe: Option<RecipeSuggestion>,
    pub last_response: Option<String>,
    pub last_error: Option<String>,
    /// Session has been torn down
    pub closed: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing listening, pending or in flight
    pub fn is_idle(&self) -> bool {
        !self.listening && !self.processing && !self.pending_flush
    }

    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }

    pub fn clear_transcript(&mut self) {
        self.interim_text.clear();
        self.final_text.clear();
        self.pending_flush = false;
    }

    // === State transitions ===

    pub fn start_listening(&mut self) {
        self.listening = true;
        self.status = StatusLine::Listening;
        self.last_error = None;
        self.clear_transcript();
    }

    pub fn stop_listening(&mut self) {
        self.listening = false;
        self.interim_text.clear();
        if !self.processing {
            self.status = StatusLine::Ready;
        }
    }

    pub fn recognition_failed(&mut self, error: String) {
        self.listening = false;
        self.interim_text.clear();
        self.status = StatusLine::RecognitionError;
        self.last_error = Some(error);
    }

    pub fn start_processing(&mut self) {
        self.processing = true;
        self.status = StatusLine::Processing;
    }

    pub fn finish_processing(&mut self, response: String, recipe: Option<RecipeSuggestion>) {
        self.processing = false;
        self.last_response = Some(response);
        if recipe.is_some() {
            self.current_recipe = recipe;
        }
        self.clear_transcript();
        self.status = if self.listening {
            StatusLine::Listening
        } else {
            StatusLine::Ready
        };
    }
}

/// Thread-safe shared session state
#[derive(Clone, Default)]
pub struct SharedSessionState {
    inner: Arc<RwLock<SessionState>>,
}

impl SharedSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, SessionState> {
        self.inner.read()
    }

    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, SessionState> {
        self.inner.write()
    }

    /// Copy of the current state (no lock held after return)
    pub fn snapshot(&self) -> SessionState {
        self.inner.read().clone()
    }

    // === Convenience read methods ===

    pub fn is_listening(&self) -> bool {
        self.inner.read().listening
    }

    pub fn is_processing(&self) -> bool {
        self.inner.read().processing
    }

    pub fn is_idle(&self) -> bool {
        self.inner.read().is_idle()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    pub fn status(&self) -> StatusLine {
        self.inner.read().status
    }

    pub fn interim_text(&self) -> String {
        self.inner.read().interim_text.clone()
    }

    pub fn final_text(&self) -> String {
        self.inner.read().final_text.clone()
    }

    pub fn current_recipe(&self) -> Option<RecipeSuggestion> {
        self.inner.read().current_recipe.clone()
    }

    pub fn last_response(&self) -> Option<String> {
        self.inner.read().last_response.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_single_holder() {
        let guard = ProcessingGuard::new();
        let token = guard.try_acquire().expect("free guard");
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());
        drop(token);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let guard = ProcessingGuard::new();
        let cloned = guard.clone();
        let result = std::panic::catch_unwind(move || {
            let _token = cloned.try_acquire().unwrap();
            panic!("handler blew up");
        });
        assert!(result.is_err());
        assert!(!guard.is_held());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(StatusLine::Ready.to_string(), "Tap to start speaking...");
        assert_eq!(StatusLine::Listening.to_string(), "Listening... speak now");
        assert_eq!(StatusLine::Processing.to_string(), "Processing your request...");
        assert_eq!(
            StatusLine::RecognitionError.to_string(),
            "Speech recognition error. Try again."
        );
    }

    #[test]
    fn test_state_transitions() {
        let shared = SharedSessionState::new();
        assert!(shared.is_idle());

        shared.write().start_listening();
        assert!(shared.is_listening());
        assert_eq!(shared.status(), StatusLine::Listening);

        {
            let mut state = shared.write();
            state.final_text = "I ate rice".into();
            state.start_processing();
        }
        assert_eq!(shared.status(), StatusLine::Processing);

        shared.write().finish_processing("done".into(), None);
        assert_eq!(shared.final_text(), "");
        assert_eq!(shared.last_response().as_deref(), Some("done"));
        assert_eq!(shared.status(), StatusLine::Listening);

        shared.write().recognition_failed("network".into());
        assert_eq!(shared.status(), StatusLine::RecognitionError);
        assert!(shared.is_idle());
    }
}
