//! Expiration sweeper
//!
//! Background task expiring active aliases past their expiration, once per interval

use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::Lifecycle;
use crate::provider::RuleProvider;

/// Time between two sweeps
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the sweeper until `shutdown` is cancelled
///
/// The first sweep happens one interval after starting
pub async fn run<P: RuleProvider>(
    lifecycle: Lifecycle<P>,
    period: Duration,
    shutdown: CancellationToken,
) {
    tracing::info!("Sweeping expired aliases every {}s", period.as_secs());

    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = interval.tick() => {
                tick(&lifecycle).await;
            }
        }
    }

    tracing::info!("Sweeper stopped");
}

/// A single sweep, returns how many aliases were expired
///
/// A failing alias is logged and skipped, it does not stop the others
pub async fn tick<P: RuleProvider>(lifecycle: &Lifecycle<P>) -> usize {
    let aliases = match lifecycle
        .database()
        .find_expired_active_aliases(Utc::now())
        .await
    {
        Ok(aliases) => aliases,
        Err(err) => {
            tracing::error!("Could not look for expired aliases: {err}");
            return 0;
        }
    };

    let mut expired = 0;

    for alias in &aliases {
        tracing::debug!("Alias {} expired at {}", alias.address, alias.expires_at);

        match lifecycle.expire(alias).await {
            Ok(()) => expired += 1,
            Err(err) => tracing::error!("Could not expire alias {}: {err}", alias.address),
        }
    }

    expired
}
