//! Push-based speech recognition sources

use crate::{AlfredoError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Recognizer settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Silence after the last final fragment before an utterance is flushed
    pub silence_timeout_ms: u64,

    /// Recognition language
    pub locale: String,

    /// Keep recognizing across pauses
    pub continuous: bool,

    /// Deliver non-final hypotheses
    pub interim_results: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            silence_timeout_ms: 1500,
            locale: "en-US".to_string(),
            continuous: true,
            interim_results: true,
        }
    }
}

impl RecognitionConfig {
    pub fn with_silence_timeout_ms(mut self, ms: u64) -> Self {
        self.silence_timeout_ms = ms;
        self
    }

    pub fn silence_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.silence_timeout_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.silence_timeout_ms == 0 {
            return Err("silence_timeout_ms must be positive".to_string());
        }
        if self.locale.trim().is_empty() {
            return Err("locale is required".to_string());
        }
        Ok(())
    }
}

/// One recognizer hypothesis
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechFragment {
    pub text: String,
    pub is_final: bool,
}

impl SpeechFragment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Lifecycle and result events pushed by a recognizer
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    Started,
    /// Fragments of one result batch, in recognizer order
    Results(Vec<SpeechFragment>),
    Error(String),
    Ended,
}

/// A recognizer that pushes events into the session
pub trait RecognitionSource: Send {
    fn start(&mut self, events: UnboundedSender<SpeechEvent>) -> Result<()>;

    /// Stop delivering events. Must be safe to call when not started.
    fn stop(&mut self);
}

/// Reads one final fragment per non-empty line, then ends
pub struct LineSource<R> {
    reader: Option<R>,
    stopped: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl<R: BufRead + Send + 'static> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            stopped: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl LineSource<std::io::BufReader<std::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()))
    }
}

impl<R: BufRead + Send + 'static> RecognitionSource for LineSource<R> {
    fn start(&mut self, events: UnboundedSender<SpeechEvent>) -> Result<()> {
        let reader = self.reader.take().ok_or_else(|| {
            AlfredoError::RecognitionError("line source already consumed".to_string())
        })?;
        self.stopped.store(false, Ordering::SeqCst);
        let stopped = self.stopped.clone();

        let handle = thread::Builder::new()
            .name("line-source".to_string())
            .spawn(move || {
                let _ = events.send(SpeechEvent::Started);
                for line in reader.lines() {
                    if stopped.load(Ordering::SeqCst) {
                        return;
                    }
                    match line {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => {
                            debug!("Heard line: {}", line.trim());
                            // Trailing space keeps words apart when finals are joined
                            let fragment = SpeechFragment::final_text(format!("{} ", line.trim()));
                            if events.send(SpeechEvent::Results(vec![fragment])).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!("Line source read failed: {}", e);
                            let _ = events.send(SpeechEvent::Error(e.to_string()));
                            return;
                        }
                    }
                }
                info!("Line source reached end of input");
                let _ = events.send(SpeechEvent::Ended);
            })?;

        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        // A blocked read cannot be interrupted; the thread exits on its next line
        self.worker.take();
    }
}

/// Source driven by hand through a [`PushHandle`]
pub struct PushSource {
    sender: Arc<Mutex<Option<UnboundedSender<SpeechEvent>>>>,
}

/// Injects events into a started [`PushSource`]
#[derive(Clone)]
pub struct PushHandle {
    sender: Arc<Mutex<Option<UnboundedSender<SpeechEvent>>>>,
}

impl PushSource {
    pub fn new() -> (Self, PushHandle) {
        let sender = Arc::new(Mutex::new(None));
        (
            Self {
                sender: sender.clone(),
            },
            PushHandle { sender },
        )
    }
}

impl RecognitionSource for PushSource {
    fn start(&mut self, events: UnboundedSender<SpeechEvent>) -> Result<()> {
        let _ = events.send(SpeechEvent::Started);
        *self.sender.lock() = Some(events);
        Ok(())
    }

    fn stop(&mut self) {
        self.sender.lock().take();
    }
}

impl PushHandle {
    /// Returns false when the source is not started
    pub fn push(&self, event: SpeechEvent) -> bool {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn push_final(&self, text: &str) -> bool {
        self.push(SpeechEvent::Results(vec![SpeechFragment::final_text(text)]))
    }

    pub fn push_interim(&self, text: &str) -> bool {
        self.push(SpeechEvent::Results(vec![SpeechFragment::interim(text)]))
    }

    pub fn is_active(&self) -> bool {
        self.sender.lock().is_some()
    }
}
