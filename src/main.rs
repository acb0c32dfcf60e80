use alfredo::integration::{AssistantConfig, Orchestrator, SessionEvent, VoiceSession};
use alfredo::llm::{resilient, GeminiClient};
use alfredo::speech::{LineSource, Narrator};
use alfredo::store::{InMemoryNutritionLog, InMemoryPantry, InMemoryShoppingList, NutritionLog};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only responses
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alfredo=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Alfredo voice assistant");

    let config = match std::env::args().nth(1) {
        Some(path) => AssistantConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => AssistantConfig::default(),
    };

    let client = GeminiClient::new(config.gateway.clone()).context("building gateway client")?;
    if !client.has_api_key() {
        warn!("No API key configured, answering with the local fallback only");
    }

    let pantry = InMemoryPantry::with_items(config.seed_items());
    let nutrition = InMemoryNutritionLog::new();
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(resilient(client)),
        Arc::new(pantry),
        Arc::new(nutrition.clone()),
        Arc::new(InMemoryShoppingList::new()),
    ));

    let narrator = Narrator::from_settings(config.narrator.clone()).context("starting narrator")?;
    let (session, mut handle) = VoiceSession::new(
        &config.recognition,
        orchestrator,
        Box::new(LineSource::stdin()),
        narrator,
    );
    let session_task = tokio::spawn(session.run());

    handle.start_listening()?;
    let mut input_ended = false;
    let mut closing = false;

    loop {
        tokio::select! {
            event = handle.next_event() => {
                let Some(event) = event else { break };
                match event {
                    SessionEvent::CommandResolved(outcome) => {
                        println!("[{}] {}", outcome.intent, outcome.response);
                    }
                    SessionEvent::ListeningStopped => input_ended = true,
                    SessionEvent::RecognitionError(e) => {
                        eprintln!("{}", handle.state().status());
                        warn!("Recognition failed: {}", e);
                        input_ended = true;
                    }
                    SessionEvent::Shutdown => break,
                    _ => {}
                }
                if input_ended && !closing && handle.state().is_idle() {
                    closing = true;
                    handle.close()?;
                }
            }
            _ = tokio::signal::ctrl_c(), if !closing => {
                info!("Interrupted");
                closing = true;
                handle.close()?;
            }
        }
    }

    session_task.await.context("session task failed")?;

    let totals = nutrition.today_totals().await?;
    info!(
        "Logged today: {} kcal, {}g protein, {}g carbs, {}g fat",
        totals.calories, totals.protein, totals.carbs, totals.fat
    );

    Ok(())
}
