//! Background workers that keep the director moving between requests

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::application::services::Director;

/// Tear down events whose time is up
pub async fn event_sweep_worker(director: Arc<Director>, period: Duration) {
    tracing::info!("Starting event sweep worker");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let ended = director.sweep_events(Utc::now()).await;
        if !ended.is_empty() {
            tracing::debug!("Swept {} expired events", ended.len());
        }
    }
}

/// Log guardrail changes as they are accepted, whether saved or edited on disk
pub async fn guardrail_change_worker(director: Arc<Director>) {
    let mut updates = director.guardrail_service().subscribe();
    while updates.changed().await.is_ok() {
        let config = updates.borrow_and_update().clone();
        tracing::info!(
            require_approval = config.features.require_approval,
            restricted_mode = config.features.restricted_mode,
            generations_per_minute = config.throttles.generations_per_minute,
            "Guardrails in effect"
        );
    }
}
