//! Submit one generation task and stream its lifecycle to the terminal.
//!
//! Connection settings come from the environment (see
//! [`ClientConfig::from_env`]); the request itself is described by
//! `MUSE_PROMPT` and friends. Exits once the task reaches a terminal
//! outcome.

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use muse_client::{ClientConfig, GenerationClient, TaskEvent};
use muse_core::display::DisplayRecord;
use muse_core::request::{GenerationRequest, ReferenceAsset, TAG_FACE};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muse_cli=debug,muse_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ClientConfig::from_env();
    tracing::info!(api = %config.api_base_url, user = %config.user_id, "Loaded client configuration");

    let request = request_from_env()?;
    tracing::info!(
        engine = %request.engine,
        expected_outputs = request.expected_outputs,
        "Prepared generation request",
    );

    // --- Submit & stream ---
    let client = GenerationClient::new(config);
    let mut events = client.subscribe();

    let task_id = client
        .submit(request)
        .await
        .context("Task submission failed")?;
    tracing::info!(task_id = %task_id, "Task submitted, polling for results");

    loop {
        match events.recv().await {
            Ok(event) if *event.task_id() == task_id => {
                if render_event(&client, &event) {
                    break;
                }
            }
            Ok(_) => {
                // Event for another task on the shared channel.
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event stream lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }

    client.shutdown().await;
    Ok(())
}

/// Build the request from `MUSE_*` environment variables.
fn request_from_env() -> anyhow::Result<GenerationRequest> {
    let prompt = std::env::var("MUSE_PROMPT")
        .unwrap_or_else(|_| "golden hour rooftop portrait, soft film grain".into());
    let engine = std::env::var("MUSE_ENGINE").unwrap_or_else(|_| "flux-dev".into());
    let aspect_ratio = std::env::var("MUSE_ASPECT_RATIO").unwrap_or_else(|_| "3:4".into());
    let expected_outputs: u32 = std::env::var("MUSE_OUTPUTS")
        .unwrap_or_else(|_| "1".into())
        .parse()
        .context("MUSE_OUTPUTS must be a valid u32")?;
    let influencer_id = std::env::var("MUSE_INFLUENCER").ok();

    let reference_assets = match std::env::var("MUSE_FACE_REF") {
        Ok(url) => vec![ReferenceAsset {
            url,
            tag: TAG_FACE.to_string(),
        }],
        Err(_) => Vec::new(),
    };

    Ok(GenerationRequest {
        prompt,
        engine,
        aspect_ratio,
        guidance: None,
        strength: None,
        seed: None,
        reference_assets,
        influencer_id,
        expected_outputs,
    })
}

/// Print one event. Returns `true` when the event is terminal.
fn render_event(client: &GenerationClient, event: &TaskEvent) -> bool {
    match event {
        TaskEvent::PlaceholdersReady { records, .. } => {
            println!("queued: {} output(s) expected", records.len());
        }
        TaskEvent::Snapshot { records, .. } => {
            for record in records {
                match record {
                    DisplayRecord::Pending { placeholder } => {
                        println!("  [{}] waiting...", placeholder.index);
                    }
                    DisplayRecord::NotFound { placeholder } => {
                        println!("  [{}] failed -- not found", placeholder.index);
                    }
                    DisplayRecord::Result { row } => {
                        println!(
                            "  [{}] {:?}",
                            row.image_sequence_number, row.generation_status
                        );
                    }
                }
            }
        }
        TaskEvent::PhaseChanged { phase, .. } => {
            println!("phase: {phase:?}");
        }
        TaskEvent::Completed { records, .. } => {
            println!("completed:");
            for record in records {
                if let DisplayRecord::Result { row } = record {
                    if let Some(url) = client.output_url(row) {
                        println!("  [{}] {url}", row.image_sequence_number);
                    }
                }
            }
            return true;
        }
        TaskEvent::Failed { error, .. } => {
            println!(
                "failed: {}",
                error.as_deref().unwrap_or("<no reason recorded>")
            );
            return true;
        }
        TaskEvent::TimedOut { kind, .. } => {
            println!("timed out ({kind:?}) -- the task took too long or was never found");
            return true;
        }
    }
    false
}
