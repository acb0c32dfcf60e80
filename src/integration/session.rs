//! Voice session: recognizer events in, narrated responses out
//!
//! A session owns its segmenter, processing guard and conversation history.
//! All state changes happen on the session loop; only command processing
//! runs on a spawned task.

use crate::integration::orchestrator::{CommandOutcome, Orchestrator};
use crate::integration::state::{ProcessingGuard, ProcessingToken, SharedSessionState};
use crate::messages::{ConversationHistory, Utterance};
use crate::speech::{
    join_worker, FlushOutcome, Narrator, RecognitionConfig, RecognitionSource, SpeechEvent,
    UtteranceSegmenter,
};
use crate::{AlfredoError, Result};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Commands accepted by a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    StartListening,
    StopListening,
    /// Tear down and end the session loop
    Close,
}

/// Events emitted by the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ListeningStarted,
    ListeningStopped,
    /// Live recognizer text for display
    Interim(String),
    /// An utterance was flushed and handed to the orchestrator
    UtteranceReady(Utterance),
    CommandResolved(CommandOutcome),
    RecognitionError(String),
    Shutdown,
}

/// Handle for driving a session from a front end
pub struct SessionHandle {
    command_tx: UnboundedSender<SessionCommand>,
    event_rx: UnboundedReceiver<SessionEvent>,
    state: SharedSessionState,
    history: ConversationHistory,
}

impl SessionHandle {
    /// Send a command to the session
    pub fn send_command(&self, command: SessionCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| AlfredoError::ChannelError(format!("Failed to send command: {}", e)))
    }

    pub fn start_listening(&self) -> Result<()> {
        self.send_command(SessionCommand::StartListening)
    }

    pub fn stop_listening(&self) -> Result<()> {
        self.send_command(SessionCommand::StopListening)
    }

    pub fn close(&self) -> Result<()> {
        self.send_command(SessionCommand::Close)
    }

    /// Try to receive an event without waiting
    pub fn try_recv_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait for the next event; `None` once the session is gone
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

pub struct VoiceSession {
    orchestrator: Arc<Orchestrator>,
    source: Box<dyn RecognitionSource>,
    narrator: Narrator,
    segmenter: UtteranceSegmenter,
    guard: ProcessingGuard,
    history: ConversationHistory,
    state: SharedSessionState,

    command_rx: UnboundedReceiver<SessionCommand>,
    event_tx: UnboundedSender<SessionEvent>,
    speech_tx: UnboundedSender<SpeechEvent>,
    speech_rx: UnboundedReceiver<SpeechEvent>,
    /// Outcomes travel with the token so the guard is released by `on_completion`
    completion_tx: UnboundedSender<(CommandOutcome, ProcessingToken)>,
    completion_rx: UnboundedReceiver<(CommandOutcome, ProcessingToken)>,

    /// Narrator thread still speaking after teardown
    narration: Option<JoinHandle<()>>,
    source_active: bool,
    torn_down: bool,
}

impl VoiceSession {
    pub fn new(
        config: &RecognitionConfig,
        orchestrator: Arc<Orchestrator>,
        source: Box<dyn RecognitionSource>,
        narrator: Narrator,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = unbounded_channel();
        let (event_tx, event_rx) = unbounded_channel();
        let (speech_tx, speech_rx) = unbounded_channel();
        let (completion_tx, completion_rx) = unbounded_channel();
        let state = SharedSessionState::new();
        let history = ConversationHistory::new();

        let session = Self {
            orchestrator,
            source,
            narrator,
            segmenter: UtteranceSegmenter::new(config.silence_timeout()),
            guard: ProcessingGuard::new(),
            history: history.clone(),
            state: state.clone(),
            command_rx,
            event_tx,
            speech_tx,
            speech_rx,
            completion_tx,
            completion_rx,
            narration: None,
            source_active: false,
            torn_down: false,
        };

        let handle = SessionHandle {
            command_tx,
            event_rx,
            state,
            history,
        };

        (session, handle)
    }

    /// Run until closed or until every handle is dropped
    pub async fn run(mut self) {
        info!("Voice session started");

        loop {
            let deadline = self.segmenter.deadline();
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::StartListening) => self.start_listening(),
                    Some(SessionCommand::StopListening) => self.stop_listening(),
                    Some(SessionCommand::Close) | None => break,
                },
                Some(event) = self.speech_rx.recv() => self.on_speech(event),
                Some((outcome, token)) = self.completion_rx.recv() => self.on_completion(outcome, token),
                _ = wait_until(deadline) => self.on_silence(),
            }
        }

        self.teardown();
        if let Some(worker) = self.narration.take() {
            // Let queued responses finish without holding up the runtime
            if let Err(e) = tokio::task::spawn_blocking(move || join_worker(worker)).await {
                warn!("Waiting for narration failed: {}", e);
            }
        }
        info!("Voice session ended");
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }

    fn sync_transcript(&self) {
        let mut state = self.state.write();
        state.interim_text = self.segmenter.interim_text().to_string();
        state.final_text = self.segmenter.final_text().to_string();
        state.pending_flush = self.segmenter.has_pending_flush();
    }

    fn start_listening(&mut self) {
        if self.source_active {
            debug!("Already listening");
            return;
        }

        self.segmenter.start();
        if let Err(e) = self.source.start(self.speech_tx.clone()) {
            warn!("Could not start recognition: {}", e);
            self.segmenter.on_error();
            self.state.write().recognition_failed(e.to_string());
            self.emit(SessionEvent::RecognitionError(e.to_string()));
            return;
        }

        self.source_active = true;
        self.state.write().start_listening();
        self.emit(SessionEvent::ListeningStarted);
    }

    fn stop_listening(&mut self) {
        if !self.source_active {
            return;
        }
        self.source.stop();
        self.source_active = false;
        self.segmenter.on_ended();
        self.state.write().stop_listening();
        self.sync_transcript();
        self.emit(SessionEvent::ListeningStopped);
    }

    fn on_speech(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Started => debug!("Recognizer started"),
            SpeechEvent::Results(fragments) => {
                if !self.source_active {
                    debug!("Dropping results received after stop");
                    return;
                }
                self.segmenter.on_results(&fragments, Instant::now());
                self.sync_transcript();
                let interim = self.segmenter.interim_text();
                if !interim.is_empty() {
                    self.emit(SessionEvent::Interim(interim.to_string()));
                }
            }
            SpeechEvent::Error(message) => {
                warn!("Recognition error: {}", message);
                self.source.stop();
                self.source_active = false;
                self.segmenter.on_error();
                self.state.write().recognition_failed(message.clone());
                self.sync_transcript();
                self.emit(SessionEvent::RecognitionError(message));
            }
            SpeechEvent::Ended => {
                if !self.source_active {
                    return;
                }
                info!("Recognizer ended");
                self.source.stop();
                self.source_active = false;
                self.segmenter.on_ended();
                self.state.write().stop_listening();
                self.sync_transcript();
                self.emit(SessionEvent::ListeningStopped);
            }
        }
    }

    fn on_silence(&mut self) {
        match self.segmenter.poll_flush(Instant::now(), self.guard.is_held()) {
            FlushOutcome::Flushed(utterance) => self.dispatch(utterance),
            FlushOutcome::Deferred => info!("Still processing, utterance held back"),
            FlushOutcome::Empty | FlushOutcome::NotDue => {}
        }
        self.sync_transcript();
    }

    fn dispatch(&mut self, utterance: Utterance) {
        let Some(token) = self.guard.try_acquire() else {
            warn!("Dispatch skipped, a command is already in flight");
            return;
        };

        info!("Utterance ready: {:?}", utterance.text());
        self.state.write().start_processing();
        self.emit(SessionEvent::UtteranceReady(utterance.clone()));

        let orchestrator = self.orchestrator.clone();
        let history = self.history.clone();
        let completion_tx = self.completion_tx.clone();

        tokio::spawn(async move {
            // If the session is gone the token drops here and the guard is released anyway
            let outcome = orchestrator.process(&utterance, &history).await;
            let _ = completion_tx.send((outcome, token));
        });
    }

    fn on_completion(&mut self, outcome: CommandOutcome, token: ProcessingToken) {
        debug!("Command {} finished as {:?}", outcome.command_id, outcome.status);
        self.narrator.narrate(&outcome.response);

        self.segmenter.clear();
        self.state
            .write()
            .finish_processing(outcome.response.clone(), outcome.recipe.clone());
        self.sync_transcript();
        drop(token);
        self.emit(SessionEvent::CommandResolved(outcome));
    }

    /// Stop the source, cancel the silence deadline and clear the transcript
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.source.stop();
        self.source_active = false;
        self.segmenter.clear();
        {
            let mut state = self.state.write();
            state.listening = false;
            state.clear_transcript();
            state.closed = true;
        }
        self.narration = self.narrator.detach();
        self.emit(SessionEvent::Shutdown);
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LexicalGateway;
    use crate::speech::{MemorySink, PushSource, SpeechSink, VoiceSettings};
    use crate::store::{InMemoryNutritionLog, InMemoryPantry, InMemoryShoppingList};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn orchestrator() -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            Arc::new(LexicalGateway),
            Arc::new(InMemoryPantry::new()),
            Arc::new(InMemoryNutritionLog::new()),
            Arc::new(InMemoryShoppingList::new()),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_after_silence_and_narrate() {
        let (source, push) = PushSource::new();
        let sink = MemorySink::new();
        let narrator = Narrator::spawn(VoiceSettings::default(), Box::new(sink.clone())).unwrap();
        let (session, mut handle) =
            VoiceSession::new(&RecognitionConfig::default(), orchestrator(), Box::new(source), narrator);
        let task = tokio::spawn(session.run());

        handle.start_listening().unwrap();
        assert!(matches!(handle.next_event().await, Some(SessionEvent::ListeningStarted)));

        push.push_final("I ate ");
        push.push_final("an apple");

        let utterance = loop {
            match handle.next_event().await {
                Some(SessionEvent::UtteranceReady(u)) => break u,
                Some(_) => continue,
                None => panic!("session ended early"),
            }
        };
        assert_eq!(utterance.text(), "I ate an apple");

        let outcome = loop {
            if let Some(SessionEvent::CommandResolved(o)) = handle.next_event().await {
                break o;
            }
        };
        assert!(outcome.response.contains("apple"));
        assert_eq!(handle.history().len(), 1);

        handle.close().unwrap();
        task.await.unwrap();
        assert!(handle.state().is_closed());
        assert_eq!(sink.spoken().len(), 1);
    }

    struct SlowSink {
        inner: MemorySink,
        delay: Duration,
    }

    impl SpeechSink for SlowSink {
        fn speak(&mut self, text: &str, settings: &VoiceSettings) -> Result<()> {
            std::thread::sleep(self.delay);
            self.inner.speak(text, settings)
        }
    }

    #[tokio::test]
    async fn test_close_waits_for_narration_without_blocking_runtime() {
        let (source, push) = PushSource::new();
        let sink = MemorySink::new();
        let slow = SlowSink {
            inner: sink.clone(),
            delay: Duration::from_millis(600),
        };
        let narrator = Narrator::spawn(VoiceSettings::default(), Box::new(slow)).unwrap();
        let config = RecognitionConfig::default().with_silence_timeout_ms(10);
        let (session, mut handle) = VoiceSession::new(&config, orchestrator(), Box::new(source), narrator);
        let task = tokio::spawn(session.run());

        handle.start_listening().unwrap();
        assert!(matches!(handle.next_event().await, Some(SessionEvent::ListeningStarted)));
        push.push_final("hello");
        loop {
            if let Some(SessionEvent::CommandResolved(_)) = handle.next_event().await {
                break;
            }
        }

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(50));
            loop {
                interval.tick().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        handle.close().unwrap();
        task.await.unwrap();
        ticker.abort();

        assert!(ticks.load(Ordering::SeqCst) >= 3, "runtime stalled during close");
        assert_eq!(sink.spoken().len(), 1, "queued response still spoken");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_flush() {
        let (source, push) = PushSource::new();
        let (session, mut handle) = VoiceSession::new(
            &RecognitionConfig::default(),
            orchestrator(),
            Box::new(source),
            Narrator::silent(),
        );
        let task = tokio::spawn(session.run());

        handle.start_listening().unwrap();
        assert!(matches!(handle.next_event().await, Some(SessionEvent::ListeningStarted)));
        push.push_final("check my pantry");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.state().read().pending_flush);

        handle.close().unwrap();
        task.await.unwrap();

        assert!(!push.is_active());
        assert!(handle.history().is_empty());
        let state = handle.state().snapshot();
        assert!(state.final_text.is_empty() && !state.pending_flush && !state.listening);
    }
}
