//! Background worker that logs guess-round lifecycle events

use tokio::sync::broadcast::{self, error::RecvError};

use crate::application::services::RoundEvent;

/// Log every round event until the channel closes
pub async fn round_event_logger(mut events: broadcast::Receiver<RoundEvent>) {
    tracing::info!("Starting round event logger");
    loop {
        match events.recv().await {
            Ok(event) => log_event(&event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Round event logger fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::info!("Round event logger stopped");
}

fn log_event(event: &RoundEvent) {
    match event {
        RoundEvent::Started {
            gid,
            round_id,
            variant,
        } => tracing::info!(gid = %gid, round_id = %round_id, variant = %variant, "Guess round started"),
        RoundEvent::Hint {
            gid,
            round_id,
            index,
            total,
            hint,
        } => tracing::debug!(
            gid = %gid,
            round_id = %round_id,
            "Hint {}/{}: {}",
            index,
            total,
            hint.key
        ),
        RoundEvent::Solved {
            gid,
            round_id,
            winner,
            answer,
            wins,
            ..
        } => tracing::info!(
            gid = %gid,
            round_id = %round_id,
            winner = %winner,
            answer = %answer,
            wins = ?wins,
            "Guess round solved"
        ),
        RoundEvent::Revealed {
            gid,
            round_id,
            answer,
            ..
        } => tracing::info!(gid = %gid, round_id = %round_id, answer = %answer, "Guess round expired"),
    }
}
