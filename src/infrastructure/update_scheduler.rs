//! Daily pool refresh

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Utc};

use crate::application::services::PoolUpdateService;

/// First instant strictly after `now` whose wall-clock time in `offset` is
/// `at`
pub fn next_run(now: DateTime<Utc>, offset: FixedOffset, at: NaiveTime) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let mut date = local.date_naive();
    loop {
        if let Some(candidate) = date.and_time(at).and_local_timezone(offset).single() {
            let candidate = candidate.with_timezone(&Utc);
            if candidate > now {
                return candidate;
            }
        }
        date += ChronoDuration::days(1);
    }
}

/// Run the pool refresh every day at `at` local time, forever
pub async fn pool_update_worker(service: Arc<PoolUpdateService>, offset: FixedOffset, at: NaiveTime) {
    tracing::info!("Starting pool update worker, daily at {} ({})", at, offset);
    loop {
        let now = Utc::now();
        let next = next_run(now, offset, at);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::debug!("Next pool update at {}", next);
        tokio::time::sleep(wait).await;

        match service.update_pools(false).await {
            Ok(outcome) => tracing::info!(?outcome, "Scheduled pool update finished"),
            Err(e) => tracing::error!("Scheduled pool update failed: {}", e),
        }
    }
}
