//! Response narration through a speech sink
//!
//! Narration is fire-and-forget: text is queued to a worker thread and the
//! caller never waits for synthesis. Without a sink it is a silent no-op.

use crate::{AlfredoError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Voice parameters passed to every sink call
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Speaking rate multiplier
    pub rate: f32,

    /// Pitch multiplier
    pub pitch: f32,

    /// Pending responses kept before new ones are dropped
    pub queue_size: usize,

    /// External synthesizer binary (espeak-compatible flags)
    pub command: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            queue_size: 8,
            command: None,
        }
    }
}

impl VoiceSettings {
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.1..=10.0).contains(&self.rate) {
            return Err(format!("Speech rate out of range: {}", self.rate));
        }
        if !(0.0..=2.0).contains(&self.pitch) {
            return Err(format!("Speech pitch out of range: {}", self.pitch));
        }
        if self.queue_size == 0 {
            return Err("Narrator queue size must be positive".to_string());
        }
        Ok(())
    }
}

/// Something that can speak text
pub trait SpeechSink: Send {
    fn speak(&mut self, text: &str, settings: &VoiceSettings) -> Result<()>;
}

/// Writes responses to the log instead of speaking
#[derive(Debug, Default)]
pub struct LogSink;

impl SpeechSink for LogSink {
    fn speak(&mut self, text: &str, settings: &VoiceSettings) -> Result<()> {
        info!(rate = settings.rate, pitch = settings.pitch, "Alfredo: {}", text);
        Ok(())
    }
}

/// Runs an espeak-style synthesizer once per response
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
}

/// espeak words-per-minute at rate 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
/// espeak pitch at multiplier 1.0
const BASE_PITCH: f32 = 50.0;

impl CommandSink {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(text: &str, settings: &VoiceSettings) -> Vec<String> {
        let speed = (BASE_WORDS_PER_MINUTE * settings.rate).round() as u32;
        let pitch = (BASE_PITCH * settings.pitch).round().clamp(0.0, 99.0) as u32;
        vec![
            "-s".to_string(),
            speed.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            text.to_string(),
        ]
    }
}

impl SpeechSink for CommandSink {
    fn speak(&mut self, text: &str, settings: &VoiceSettings) -> Result<()> {
        let status = Command::new(&self.program)
            .args(Self::args(text, settings))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|e| AlfredoError::SynthesisError(format!("{}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(AlfredoError::SynthesisError(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Collects spoken text in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

impl SpeechSink for MemorySink {
    fn speak(&mut self, text: &str, _settings: &VoiceSettings) -> Result<()> {
        self.spoken.lock().push(text.to_string());
        Ok(())
    }
}

/// Replace symbols a synthesizer would read badly
pub fn normalize_for_speech(text: &str) -> String {
    text.replace('&', " and ")
        .replace('%', " percent")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

enum NarratorCommand {
    Speak(String),
    Shutdown,
}

/// Queue in front of a speech sink
pub struct Narrator {
    settings: VoiceSettings,
    command_tx: Option<Sender<NarratorCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl Narrator {
    /// Narrator with no synthesis capability
    pub fn silent() -> Self {
        Self {
            settings: VoiceSettings::default(),
            command_tx: None,
            worker: None,
        }
    }

    /// Start the worker thread that owns `sink`
    pub fn spawn(settings: VoiceSettings, sink: Box<dyn SpeechSink>) -> Result<Self> {
        settings.validate().map_err(AlfredoError::ConfigError)?;
        let (command_tx, command_rx) = bounded(settings.queue_size);
        let worker_settings = settings.clone();

        let worker = thread::Builder::new()
            .name("narrator".to_string())
            .spawn(move || run_worker(sink, worker_settings, command_rx))?;

        Ok(Self {
            settings,
            command_tx: Some(command_tx),
            worker: Some(worker),
        })
    }

    /// Sink chosen from settings: external command if configured, else the log
    pub fn from_settings(settings: VoiceSettings) -> Result<Self> {
        let sink: Box<dyn SpeechSink> = match settings.command.as_deref() {
            Some(program) if !program.trim().is_empty() => Box::new(CommandSink::new(program)),
            _ => Box::new(LogSink),
        };
        Self::spawn(settings, sink)
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    pub fn is_silent(&self) -> bool {
        self.command_tx.is_none()
    }

    /// Queue `text` for speech. Never blocks.
    pub fn narrate(&self, text: &str) {
        let Some(tx) = self.command_tx.as_ref() else {
            return;
        };
        let text = normalize_for_speech(text);
        if text.is_empty() {
            return;
        }
        match tx.try_send(NarratorCommand::Speak(text)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Narrator queue full, dropping response"),
            Err(TrySendError::Disconnected(_)) => debug!("Narrator already stopped"),
        }
    }

    /// Tell the worker to stop once queued responses are spoken and hand
    /// back its thread. Never blocks; dropping the handle detaches the worker.
    pub fn detach(&mut self) -> Option<JoinHandle<()>> {
        if let Some(tx) = self.command_tx.take() {
            // A full queue still ends the worker: it sees the disconnect after draining
            let _ = tx.try_send(NarratorCommand::Shutdown);
        }
        self.worker.take()
    }

    /// Stop the worker and wait for it to drain. Blocks the calling thread.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.detach() {
            join_worker(worker);
        }
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Wait for a detached worker thread
pub fn join_worker(worker: JoinHandle<()>) {
    if worker.join().is_err() {
        error!("Narrator worker panicked");
    }
}

fn run_worker(mut sink: Box<dyn SpeechSink>, settings: VoiceSettings, commands: Receiver<NarratorCommand>) {
    info!("Narrator worker starting");
    loop {
        match commands.recv() {
            Ok(NarratorCommand::Speak(text)) => {
                if let Err(e) = sink.speak(&text, &settings) {
                    warn!("Speech synthesis failed: {}", e);
                }
            }
            Ok(NarratorCommand::Shutdown) | Err(_) => break,
        }
    }
    info!("Narrator worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voice() {
        let settings = VoiceSettings::default();
        assert_eq!(settings.rate, 0.9);
        assert_eq!(settings.pitch, 1.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_command_sink_args() {
        let settings = VoiceSettings {
            rate: 1.0,
            pitch: 1.0,
            ..Default::default()
        };
        let args = CommandSink::args("hello", &settings);
        assert_eq!(args, vec!["-s", "175", "-p", "50", "hello"]);
    }

    #[test]
    fn test_normalize_for_speech() {
        assert_eq!(
            normalize_for_speech("rice & beans, 5%  fat"),
            "rice and beans, 5 percent fat"
        );
    }

    #[test]
    fn test_narrate_reaches_sink_in_order() {
        let sink = MemorySink::new();
        let mut narrator = Narrator::spawn(VoiceSettings::default(), Box::new(sink.clone())).unwrap();
        narrator.narrate("first");
        narrator.narrate("second");
        narrator.shutdown();

        assert_eq!(sink.spoken(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_silent_narrator_is_noop() {
        let mut narrator = Narrator::silent();
        assert!(narrator.is_silent());
        narrator.narrate("nobody hears this");
        narrator.shutdown();
    }

    struct FailingSink;

    impl SpeechSink for FailingSink {
        fn speak(&mut self, _text: &str, _settings: &VoiceSettings) -> Result<()> {
            Err(AlfredoError::SynthesisError("no audio device".into()))
        }
    }

    /// Sink that takes a while per response
    struct SlowSink {
        inner: MemorySink,
        delay: std::time::Duration,
    }

    impl SpeechSink for SlowSink {
        fn speak(&mut self, text: &str, settings: &VoiceSettings) -> Result<()> {
            thread::sleep(self.delay);
            self.inner.speak(text, settings)
        }
    }

    #[test]
    fn test_detach_returns_without_waiting_and_worker_drains() {
        let sink = MemorySink::new();
        let slow = SlowSink {
            inner: sink.clone(),
            delay: std::time::Duration::from_millis(200),
        };
        let mut narrator = Narrator::spawn(VoiceSettings::default(), Box::new(slow)).unwrap();
        narrator.narrate("one");
        narrator.narrate("two");
        narrator.narrate("three");

        let started = std::time::Instant::now();
        let worker = narrator.detach().expect("worker running");
        assert!(started.elapsed() < std::time::Duration::from_millis(150));
        assert!(narrator.is_silent());

        join_worker(worker);
        assert_eq!(sink.spoken(), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_drop_does_not_block() {
        let slow = SlowSink {
            inner: MemorySink::new(),
            delay: std::time::Duration::from_millis(500),
        };
        let narrator = Narrator::spawn(VoiceSettings::default(), Box::new(slow)).unwrap();
        narrator.narrate("long answer");

        let started = std::time::Instant::now();
        drop(narrator);
        assert!(started.elapsed() < std::time::Duration::from_millis(250));
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let mut narrator = Narrator::spawn(VoiceSettings::default(), Box::new(FailingSink)).unwrap();
        narrator.narrate("still fine");
        narrator.shutdown();
    }
}
