//! Assistant client - voice-enabled chat with a remote assistant
//!
//! A terminal front end over a conversation session runtime: typed or
//! dictated text goes to the assistant backend one exchange at a time.

mod backend;
mod cli;
mod composer;
mod config;
mod dispatcher;
mod runtime;
mod speech;
mod state_machine;
mod transcript;

use backend::{ConversationSummary, HttpBackend, LoggingBackend};
use cli::Action;
use config::ClientConfig;
use runtime::{spawn_session, ClientEvent, Command, SessionHandle, SessionView};
use speech::{NoDictation, ReplayPlatform, SpeechPlatform};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcript::{Message, MessageRole};

/// How long `/history` and `/suggest` wait for fresh data before printing
const REFRESH_WAIT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assistant_client=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(
        api_url = %config.api_url,
        authenticated = config.api_token.is_some(),
        timeout_secs = config.timeout.as_secs(),
        language = %config.recognizer.language,
        "Configuration loaded"
    );

    let backend = HttpBackend::new(&config.api_url, config.api_token.clone(), config.timeout)?;
    let backend = Arc::new(LoggingBackend::new(backend));

    let platform: Box<dyn SpeechPlatform> = match &config.speech_replay {
        Some(path) => {
            tracing::info!(path = %path.display(), "Dictation replays recorded speech");
            Box::new(ReplayPlatform::new(path).with_pace(config.speech_replay_pace))
        }
        None => Box::new(NoDictation),
    };

    let handle = spawn_session(backend, platform.as_ref(), config.recognizer.clone());
    let renderer = tokio::spawn(render_events(handle.subscribe()));
    let status = tokio::spawn(render_status(handle.watch()));

    println!("{}", cli::HELP);
    run_repl(&handle).await?;

    handle.shutdown().await;
    renderer.abort();
    status.abort();
    Ok(())
}

async fn run_repl(handle: &SessionHandle) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match cli::parse_line(&line) {
            Action::Commands(commands) => {
                for command in commands {
                    if !handle.send(command).await {
                        return Ok(());
                    }
                }
            }
            Action::ShowHistory { query } => {
                let view = refreshed(handle, Command::RefreshHistory, |v| v.history_revision).await;
                print_history(&view, query.as_deref());
            }
            Action::ShowSuggestions => {
                let view = refreshed(handle, Command::RefreshPrompts, |v| v.prompts_revision).await;
                print_suggestions(&view);
            }
            Action::SendSuggestion(n) => match handle.view().suggestions.get(n - 1) {
                Some(text) => {
                    handle.send(Command::SubmitText(text.clone())).await;
                }
                None => println!("* No hay sugerencia número {n}"),
            },
            Action::Help => println!("{}", cli::HELP),
            Action::Usage(usage) => println!("* Uso: {usage}"),
            Action::Quit => break,
        }
    }

    Ok(())
}

/// Request a refresh and wait for it to land; falls back to the current view
async fn refreshed(
    handle: &SessionHandle,
    command: Command,
    revision: fn(&SessionView) -> u64,
) -> SessionView {
    let mut view_rx = handle.watch();
    let before = revision(&view_rx.borrow_and_update());
    if !handle.send(command).await {
        return handle.view();
    }
    let view = match tokio::time::timeout(REFRESH_WAIT, view_rx.wait_for(|v| revision(v) > before)).await {
        Ok(Ok(view)) => view.clone(),
        _ => {
            tracing::debug!("Refresh did not complete in time");
            handle.view()
        }
    };
    view
}

// ============================================================================
// Rendering
// ============================================================================

fn print_message(message: &Message) {
    match message.role {
        MessageRole::User => println!("tú> {}", message.content),
        MessageRole::Assistant => {
            println!("asistente [{}]> {}", message.id, message.content);
            for action in &message.suggested_actions {
                println!("    → {} ({})", action.label, action.url);
            }
        }
    }
}

fn matching_history<'a>(
    view: &'a SessionView,
    query: Option<&str>,
) -> Vec<&'a ConversationSummary> {
    view.history
        .iter()
        .filter(|c| query.is_none_or(|q| c.matches(q)))
        .collect()
}

fn print_history(view: &SessionView, query: Option<&str>) {
    let matching = matching_history(view, query);
    if matching.is_empty() {
        println!("* No hay conversaciones");
        return;
    }
    for conversation in matching {
        let current = view.conversation_id.as_deref() == Some(conversation.id.as_str());
        println!(
            "{} {}  {}",
            if current { "*" } else { " " },
            conversation.id,
            conversation.title
        );
    }
}

fn print_suggestions(view: &SessionView) {
    for (i, suggestion) in view.suggestions.iter().enumerate() {
        println!("  {}. {suggestion}", i + 1);
    }
    for action in &view.quick_actions {
        println!("  → {} ({})", action.label, action.url);
    }
    if view.suggestions.is_empty() && view.quick_actions.is_empty() {
        println!("* No hay sugerencias");
    }
}

async fn render_events(mut events: broadcast::Receiver<ClientEvent>) {
    loop {
        match events.recv().await {
            Ok(ClientEvent::Message { message }) => print_message(&message),
            Ok(ClientEvent::TranscriptReplaced {
                conversation_id,
                messages,
            }) => {
                match conversation_id {
                    Some(id) => println!("── Conversación {id} ──"),
                    None => println!("── Nueva conversación ──"),
                }
                messages.iter().for_each(print_message);
            }
            Ok(ClientEvent::Notice { message }) => println!("* {message}"),
            Ok(ClientEvent::ExchangeSettled) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Print dictation and busy transitions as they happen
async fn render_status(mut view_rx: watch::Receiver<SessionView>) {
    let mut last = SessionView::default();
    while view_rx.changed().await.is_ok() {
        let view = view_rx.borrow_and_update().clone();

        if view.pending && !last.pending {
            println!("… el asistente está escribiendo");
        }
        if view.listening && !last.listening {
            println!("🎤 Escuchando…");
        }
        if view.listening
            && !view.interim_transcript.is_empty()
            && view.interim_transcript != last.interim_transcript
        {
            println!("   {}", view.interim_transcript);
        }
        if view.voice_error.is_some() && view.voice_error != last.voice_error {
            println!("! {}", view.voice_error.as_deref().unwrap_or_default());
        }
        // Dictated text lands in the buffer without being echoed by the terminal
        if (view.listening || last.listening) && view.input != last.input {
            println!("✎ {}", view.input);
        }

        last = view;
    }
}
