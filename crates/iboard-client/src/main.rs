use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use iboard_client::{ApiClient, Board, ChangeKind, LoadMode, PollerConfig, spawn_poller};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iboard_client=info,iboard_watch=info".into()),
        )
        .init();

    let base_url = std::env::var("IBOARD_API_URL")
        .unwrap_or_else(|_| "http://localhost:3001/api".into());
    let interval_ms: u64 = std::env::var("IBOARD_POLL_INTERVAL_MS")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .context("IBOARD_POLL_INTERVAL_MS is not a valid number")?;

    let api = Arc::new(ApiClient::new(base_url)?);
    let mut board = Board::new(Arc::clone(&api));

    info!("Watching {}", api.base_url());
    board
        .load(LoadMode::Explicit)
        .await
        .with_context(|| format!("initial load from {} failed", api.base_url()))?;
    info!("Loaded {} ideas", board.ideas().len());

    let (tx, mut rx) = mpsc::channel(8);
    let config = PollerConfig {
        interval: Duration::from_millis(interval_ms),
        ..PollerConfig::default()
    };
    let poller = spawn_poller(Arc::clone(&api), config, tx);
    poller.set_enabled(true);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            snapshot = rx.recv() => {
                let Some(snapshot) = snapshot else {
                    warn!("Poller stopped unexpectedly");
                    break;
                };
                for record in board.apply_snapshot(snapshot) {
                    let text = board
                        .snapshot()
                        .get(record.id)
                        .map(|i| i.text.as_str())
                        .unwrap_or_default();
                    match record.kind {
                        ChangeKind::New => info!("new idea {}: {}", record.id, text),
                        ChangeKind::VoteUp | ChangeKind::VoteDown => info!(
                            "{} {}: {} -> {} ({})",
                            record.kind.as_str(),
                            record.id,
                            record.previous_score.unwrap_or_default(),
                            record.new_score.unwrap_or_default(),
                            text,
                        ),
                    }
                }
            }
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    poller.shutdown().await;
    Ok(())
}
