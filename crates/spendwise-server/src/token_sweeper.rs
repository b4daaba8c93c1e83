use crate::state::AppState;
use anyhow::Result;
use spendwise_db::RefreshTokenRepo;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn the background task that purges expired refresh tokens.
pub fn start(state: AppState, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_loop(state, cancel).await;
    })
}

async fn run_loop(state: AppState, cancel: CancellationToken) {
    let interval = Duration::from_secs(state.config.auth.token_sweep_interval_secs.max(1));
    tracing::info!("Refresh token sweeper started (interval={:?})", interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {},
            _ = cancel.cancelled() => {
                tracing::info!("Refresh token sweeper shutting down");
                return;
            }
        }

        if let Err(e) = sweep_once(&state).await {
            tracing::error!("Refresh token sweep error: {:#}", e);
        }
    }
}

/// Run a single sweep. Exposed for integration tests.
pub async fn sweep_once(state: &AppState) -> Result<u64> {
    let purged = RefreshTokenRepo::delete_expired(&state.pool).await?;
    if purged > 0 {
        tracing::info!("Purged {} expired refresh token(s)", purged);
    }
    Ok(purged)
}
