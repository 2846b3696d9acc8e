//! Periodic purge of lapsed row assignments and dead refresh sessions.

use std::time::Duration;

use eyelabel_db::repositories::{AssignmentRepo, SessionRepo};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// Run the cleanup loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Cleanup job stopping");
                break;
            }
            _ = interval.tick() => sweep(&pool).await,
        }
    }
}

/// One pass of the job. Failures are logged and retried on the next tick.
pub async fn sweep(pool: &PgPool) {
    match AssignmentRepo::expire_stale(pool).await {
        Ok(0) => tracing::debug!("Cleanup: no expired assignments"),
        Ok(expired) => tracing::info!(expired, "Cleanup: released expired assignments"),
        Err(e) => tracing::error!(error = %e, "Cleanup: assignment purge failed"),
    }

    match SessionRepo::cleanup_expired(pool).await {
        Ok(0) => tracing::debug!("Cleanup: no dead sessions"),
        Ok(deleted) => tracing::info!(deleted, "Cleanup: deleted expired or revoked sessions"),
        Err(e) => tracing::error!(error = %e, "Cleanup: session purge failed"),
    }
}
