//! Activity tracker - decaying interaction weight per world region
//!
//! Movement and combat add weight to the bucket they happen in. Weight decays on
//! a fixed interval; buckets that stay light and untouched are quiet zones, which
//! the automation loop uses to place interventions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{BucketCoord, Position};

pub const ACTIVITY_BUCKET_SIZE: f64 = 64.0;
pub const ACTIVITY_DECAY_RATE: f64 = 0.1;
pub const MOVE_WEIGHT: f64 = 1.0;
pub const COMBAT_WEIGHT: f64 = 5.0;
pub const QUIET_WEIGHT_THRESHOLD: f64 = 2.0;
pub const QUIET_WINDOW_SECS: i64 = 300;
const FORGET_BELOW: f64 = 0.01;

pub fn bucket_for(position: Position) -> BucketCoord {
    BucketCoord::new(
        (position.x / ACTIVITY_BUCKET_SIZE).floor() as i64,
        (position.y / ACTIVITY_BUCKET_SIZE).floor() as i64,
    )
}

#[derive(Debug, Clone, Copy)]
struct BucketActivity {
    weight: f64,
    last_touch: DateTime<Utc>,
}

impl BucketActivity {
    fn touched_within_window(&self, now: DateTime<Utc>) -> bool {
        (now - self.last_touch).num_seconds() < QUIET_WINDOW_SECS
    }
}

#[derive(Default)]
pub struct ActivityTracker {
    buckets: RwLock<HashMap<BucketCoord, BucketActivity>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, event: &DomainEvent) {
        let weight = match event {
            DomainEvent::ActorMoved { .. } => MOVE_WEIGHT,
            DomainEvent::CombatStarted { .. } => COMBAT_WEIGHT,
        };
        let bucket = bucket_for(event.position());
        let at = event.occurred_at();

        let mut buckets = self.buckets.write().await;
        let entry = buckets.entry(bucket).or_insert(BucketActivity {
            weight: 0.0,
            last_touch: at,
        });
        entry.weight += weight;
        if at > entry.last_touch {
            entry.last_touch = at;
        }
    }

    /// Apply one decay step; returns how many buckets were forgotten
    pub async fn decay(&self, now: DateTime<Utc>) -> usize {
        let mut buckets = self.buckets.write().await;
        for activity in buckets.values_mut() {
            activity.weight *= 1.0 - ACTIVITY_DECAY_RATE;
        }
        let before = buckets.len();
        buckets.retain(|_, activity| {
            activity.weight >= FORGET_BELOW || activity.touched_within_window(now)
        });
        before - buckets.len()
    }

    pub async fn weight(&self, bucket: BucketCoord) -> f64 {
        self.buckets
            .read()
            .await
            .get(&bucket)
            .map(|a| a.weight)
            .unwrap_or(0.0)
    }

    /// Candidate and tracked buckets that are light and untouched within the window
    pub async fn quiet_zones(&self, candidates: &[BucketCoord], now: DateTime<Utc>) -> Vec<BucketCoord> {
        let buckets = self.buckets.read().await;
        let all: BTreeSet<BucketCoord> = candidates.iter().chain(buckets.keys()).copied().collect();
        all.into_iter()
            .filter(|bucket| match buckets.get(bucket) {
                Some(activity) => {
                    activity.weight < QUIET_WEIGHT_THRESHOLD && !activity.touched_within_window(now)
                }
                None => true,
            })
            .collect()
    }

    /// Feed the tracker from the director's domain-event channel until it closes
    pub async fn run_subscriber(self: Arc<Self>, mut events: broadcast::Receiver<DomainEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.record(&event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Activity tracker lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub async fn run_decay(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let forgotten = self.decay(Utc::now()).await;
            if forgotten > 0 {
                tracing::debug!("Activity decay forgot {} buckets", forgotten);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EntityId;

    fn moved_at(x: f64, y: f64, at: DateTime<Utc>) -> DomainEvent {
        DomainEvent::ActorMoved {
            entity_id: EntityId::new(),
            position: Position::new(x, y),
            at,
        }
    }

    #[tokio::test]
    async fn test_combat_weighs_more_than_movement() {
        let tracker = ActivityTracker::new();
        tracker.record(&DomainEvent::actor_moved(EntityId::new(), Position::new(10.0, 10.0))).await;
        tracker
            .record(&DomainEvent::combat_started(
                EntityId::new(),
                EntityId::new(),
                Position::new(100.0, 10.0),
            ))
            .await;

        assert_eq!(tracker.weight(BucketCoord::new(0, 0)).await, MOVE_WEIGHT);
        assert_eq!(tracker.weight(BucketCoord::new(1, 0)).await, COMBAT_WEIGHT);
    }

    #[tokio::test]
    async fn test_quiet_zones_exclude_recent_activity() {
        let tracker = ActivityTracker::new();
        let now = Utc::now();
        let long_ago = now - chrono::Duration::seconds(QUIET_WINDOW_SECS * 2);

        tracker.record(&moved_at(10.0, 10.0, now)).await;
        tracker.record(&moved_at(70.0, 10.0, long_ago)).await;

        let candidates = [BucketCoord::new(0, 0), BucketCoord::new(5, 5)];
        let quiet = tracker.quiet_zones(&candidates, now).await;

        assert!(!quiet.contains(&BucketCoord::new(0, 0)));
        assert!(quiet.contains(&BucketCoord::new(1, 0)));
        assert!(quiet.contains(&BucketCoord::new(5, 5)));
    }

    #[tokio::test]
    async fn test_decay_forgets_stale_buckets() {
        let tracker = ActivityTracker::new();
        let long_ago = Utc::now() - chrono::Duration::seconds(QUIET_WINDOW_SECS * 2);
        tracker.record(&moved_at(10.0, 10.0, long_ago)).await;

        let mut forgotten = 0;
        for _ in 0..60 {
            forgotten += tracker.decay(Utc::now()).await;
        }
        assert_eq!(forgotten, 1);
        assert_eq!(tracker.weight(BucketCoord::new(0, 0)).await, 0.0);
    }

    #[tokio::test]
    async fn test_subscriber_records_broadcast_events() {
        let tracker = Arc::new(ActivityTracker::new());
        let (tx, rx) = broadcast::channel(8);
        let task = tokio::spawn(tracker.clone().run_subscriber(rx));

        tx.send(DomainEvent::actor_moved(EntityId::new(), Position::new(1.0, 1.0)))
            .unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(tracker.weight(BucketCoord::new(0, 0)).await, MOVE_WEIGHT);
    }
}
