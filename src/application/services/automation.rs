//! Automation loop - the director's autonomous heartbeat
//!
//! Every tick rolls the personality dice: aggression spawns hostile events,
//! expansion charts a frontier location, chaos emits a signal and intervention
//! drops trouble into quiet regions. The loop only decides; the director acts,
//! so every action still passes through the approval gate and the throttles.
//!
//! Actions run as their own tasks. A tick returns as soon as the dice are rolled,
//! and a check whose previous action is still running sits the tick out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::domain::entities::WorldEventType;
use crate::domain::value_objects::{GuardrailConfig, PersonalityConfig, Position};

/// Fixed probability of an intervention when quiet zones exist
pub const INTERVENTION_CHANCE: f64 = 0.1;

/// What the loop needs from the director
#[async_trait]
pub trait AutomationActions: Send + Sync {
    async fn is_paused(&self) -> bool;

    async fn personality(&self) -> PersonalityConfig;

    async fn guardrails(&self) -> GuardrailConfig;

    /// Start (or queue for approval) a hostile event, optionally at a fixed anchor
    async fn spawn_hostile_event(
        &self,
        event_type: WorldEventType,
        anchor: Option<Position>,
    ) -> anyhow::Result<()>;

    /// Propose one frontier location; `false` when nothing was started
    async fn expand_frontier(&self) -> anyhow::Result<bool>;

    async fn emit_chaos(&self, roll: f64);

    /// Centers of regions that have been quiet for a while
    async fn quiet_zones(&self) -> Vec<Position>;
}

/// Which checks fired during one tick
///
/// A fired action has been dispatched; how it ended is logged by its task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub paused: bool,
    pub aggression: bool,
    pub expansion: bool,
    pub chaos: bool,
    pub intervention: bool,
    /// Checks that rolled true while their previous action was still running
    pub busy: Vec<&'static str>,
}

impl TickReport {
    fn paused() -> Self {
        Self {
            paused: true,
            ..Default::default()
        }
    }

    pub fn fired_any(&self) -> bool {
        self.aggression || self.expansion || self.chaos || self.intervention
    }
}

/// Every random draw a tick needs, taken together under one lock
struct TickRolls {
    aggression: f64,
    hostile_pick: usize,
    expansion: f64,
    chaos: f64,
    intervention: f64,
    intervention_pick: usize,
    zone_pick: usize,
}

/// Marks a check as running until its task finishes
struct CheckGuard(Arc<AtomicBool>);

impl CheckGuard {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then(|| Self(Arc::clone(flag)))
    }
}

impl Drop for CheckGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CheckFlags {
    aggression: Arc<AtomicBool>,
    expansion: Arc<AtomicBool>,
    intervention: Arc<AtomicBool>,
}

pub struct AutomationLoop {
    actions: Arc<dyn AutomationActions>,
    rng: Mutex<StdRng>,
    running: CheckFlags,
    tasks: StdMutex<JoinSet<()>>,
}

impl AutomationLoop {
    /// A fixed seed makes the sequence of decisions reproducible
    pub fn new(actions: Arc<dyn AutomationActions>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            actions,
            rng: Mutex::new(rng),
            running: CheckFlags::default(),
            tasks: StdMutex::new(JoinSet::new()),
        }
    }

    async fn draw(&self) -> TickRolls {
        let mut rng = self.rng.lock().await;
        TickRolls {
            aggression: rng.gen(),
            hostile_pick: rng.gen_range(0..WorldEventType::HOSTILE.len()),
            expansion: rng.gen(),
            chaos: rng.gen(),
            intervention: rng.gen(),
            intervention_pick: rng.gen_range(0..WorldEventType::HOSTILE.len()),
            zone_pick: rng.gen(),
        }
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `action` in its own task unless the previous one for this check is still going
    fn dispatch<F>(
        &self,
        check: &'static str,
        flag: &Arc<AtomicBool>,
        busy: &mut Vec<&'static str>,
        action: F,
    ) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Some(guard) = CheckGuard::claim(flag) else {
            tracing::debug!("{} check still running, skipping this tick", check);
            busy.push(check);
            return false;
        };
        self.tasks().spawn(async move {
            let _guard = guard;
            action.await;
        });
        true
    }

    pub async fn tick(&self) -> TickReport {
        if self.actions.is_paused().await {
            return TickReport::paused();
        }

        let personality = self.actions.personality().await;
        let budgets = self.actions.guardrails().await.effective_budgets();
        let rolls = self.draw().await;
        let mut report = TickReport::default();

        if rolls.aggression < personality.aggression.chance(budgets.aggression_scalar) {
            let event_type = WorldEventType::HOSTILE[rolls.hostile_pick];
            let actions = Arc::clone(&self.actions);
            let action = async move {
                if let Err(e) = actions.spawn_hostile_event(event_type, None).await {
                    tracing::warn!("Aggression check failed to start {}: {}", event_type, e);
                }
            };
            report.aggression = self.dispatch("aggression", &self.running.aggression, &mut report.busy, action);
        }

        if rolls.expansion < personality.expansion.chance(budgets.expansion_scalar) {
            let actions = Arc::clone(&self.actions);
            let action = async move {
                match actions.expand_frontier().await {
                    Ok(true) => tracing::debug!("Frontier expansion proposed"),
                    Ok(false) => tracing::debug!("Frontier expansion had nothing to do"),
                    Err(e) => tracing::warn!("Expansion check failed: {}", e),
                }
            };
            report.expansion = self.dispatch("expansion", &self.running.expansion, &mut report.busy, action);
        }

        if rolls.chaos < personality.chaos.chance(budgets.chaos_scalar) {
            self.actions.emit_chaos(rolls.chaos).await;
            report.chaos = true;
        }

        if personality.intervention_enabled && rolls.intervention < INTERVENTION_CHANCE {
            let zones = self.actions.quiet_zones().await;
            if !zones.is_empty() {
                let anchor = zones[rolls.zone_pick % zones.len()];
                let event_type = WorldEventType::HOSTILE[rolls.intervention_pick];
                let actions = Arc::clone(&self.actions);
                let action = async move {
                    if let Err(e) = actions.spawn_hostile_event(event_type, Some(anchor)).await {
                        tracing::warn!("Intervention at ({}, {}) failed: {}", anchor.x, anchor.y, e);
                    }
                };
                report.intervention =
                    self.dispatch("intervention", &self.running.intervention, &mut report.busy, action);
            }
        }

        report
    }

    /// Collect finished actions, logging any that panicked
    fn reap(&self) {
        let mut tasks = self.tasks();
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                if e.is_panic() {
                    tracing::error!("Automation action panicked: {}", e);
                }
            }
        }
    }

    /// Wait for every dispatched action to finish
    pub async fn settle(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks());
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    tracing::error!("Automation action panicked: {}", e);
                }
            }
        }
    }

    pub async fn run(self: Arc<Self>, period: Duration) {
        tracing::info!("Automation loop started, ticking every {:?}", period);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;
        loop {
            interval.tick().await;
            self.reap();
            let report = self.tick().await;
            if report.fired_any() {
                tracing::info!(
                    aggression = report.aggression,
                    expansion = report.expansion,
                    chaos = report.chaos,
                    intervention = report.intervention,
                    "Automation tick acted"
                );
            } else if !report.paused {
                tracing::debug!(busy = ?report.busy, "Automation tick idle");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::PersonalityTrait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingActions {
        paused: bool,
        personality: PersonalityConfig,
        guardrails: GuardrailConfig,
        zones: Vec<Position>,
        fail_events: bool,
        stall_events: bool,
        events: StdMutex<Vec<(WorldEventType, Option<Position>)>>,
        expansions: StdMutex<usize>,
        chaos: StdMutex<usize>,
    }

    #[async_trait]
    impl AutomationActions for RecordingActions {
        async fn is_paused(&self) -> bool {
            self.paused
        }

        async fn personality(&self) -> PersonalityConfig {
            self.personality.clone()
        }

        async fn guardrails(&self) -> GuardrailConfig {
            self.guardrails.clone()
        }

        async fn spawn_hostile_event(
            &self,
            event_type: WorldEventType,
            anchor: Option<Position>,
        ) -> anyhow::Result<()> {
            if self.stall_events {
                std::future::pending::<()>().await;
            }
            if self.fail_events {
                anyhow::bail!("world unavailable");
            }
            self.events.lock().unwrap().push((event_type, anchor));
            Ok(())
        }

        async fn expand_frontier(&self) -> anyhow::Result<bool> {
            *self.expansions.lock().unwrap() += 1;
            Ok(true)
        }

        async fn emit_chaos(&self, _roll: f64) {
            *self.chaos.lock().unwrap() += 1;
        }

        async fn quiet_zones(&self) -> Vec<Position> {
            self.zones.clone()
        }
    }

    fn only_aggression(weight: f64, enabled: bool) -> PersonalityConfig {
        PersonalityConfig {
            aggression: PersonalityTrait::new(weight, enabled),
            expansion: PersonalityTrait::new(0.0, true),
            chaos: PersonalityTrait::new(0.0, true),
            intervention_enabled: false,
        }
    }

    fn full_scalars() -> GuardrailConfig {
        let mut guardrails = GuardrailConfig::default();
        guardrails.budgets.aggression_scalar = 1.0;
        guardrails.budgets.expansion_scalar = 1.0;
        guardrails.budgets.chaos_scalar = 1.0;
        guardrails
    }

    #[tokio::test]
    async fn test_full_aggression_spawns_hostile_event_every_tick() {
        let actions = Arc::new(RecordingActions {
            personality: only_aggression(1.0, true),
            guardrails: full_scalars(),
            ..Default::default()
        });
        let automation = AutomationLoop::new(actions.clone(), Some(42));

        for _ in 0..20 {
            let report = automation.tick().await;
            assert!(report.aggression);
            automation.settle().await;
        }

        let events = actions.events.lock().unwrap();
        assert_eq!(events.len(), 20);
        assert!(events.iter().all(|(t, anchor)| t.is_hostile() && anchor.is_none()));
    }

    #[tokio::test]
    async fn test_disabled_aggression_never_fires() {
        let actions = Arc::new(RecordingActions {
            personality: only_aggression(1.0, false),
            guardrails: full_scalars(),
            ..Default::default()
        });
        let automation = AutomationLoop::new(actions.clone(), Some(42));

        for _ in 0..20 {
            assert!(!automation.tick().await.aggression);
        }
        assert!(actions.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paused_tick_does_nothing() {
        let actions = Arc::new(RecordingActions {
            paused: true,
            personality: only_aggression(1.0, true),
            guardrails: full_scalars(),
            ..Default::default()
        });
        let automation = AutomationLoop::new(actions.clone(), Some(1));

        let report = automation.tick().await;
        assert!(report.paused);
        assert!(!report.fired_any());
        assert!(actions.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_check_does_not_block_others() {
        let actions = Arc::new(RecordingActions {
            personality: PersonalityConfig {
                aggression: PersonalityTrait::new(1.0, true),
                expansion: PersonalityTrait::new(1.0, true),
                chaos: PersonalityTrait::new(1.0, true),
                intervention_enabled: false,
            },
            guardrails: full_scalars(),
            fail_events: true,
            ..Default::default()
        });
        let automation = AutomationLoop::new(actions.clone(), Some(9));

        let report = automation.tick().await;
        assert!(report.aggression);
        assert!(report.expansion);
        assert!(report.chaos);
        automation.settle().await;
        assert!(actions.events.lock().unwrap().is_empty());
        assert_eq!(*actions.expansions.lock().unwrap(), 1);
        assert_eq!(*actions.chaos.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_scalar_silences_personality() {
        let mut guardrails = full_scalars();
        guardrails.budgets.aggression_scalar = 0.0;
        let actions = Arc::new(RecordingActions {
            personality: only_aggression(1.0, true),
            guardrails,
            ..Default::default()
        });
        let automation = AutomationLoop::new(actions.clone(), Some(3));

        for _ in 0..10 {
            automation.tick().await;
        }
        automation.settle().await;
        assert!(actions.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interventions_land_in_quiet_zones() {
        let zone = Position::new(96.0, 32.0);
        let actions = Arc::new(RecordingActions {
            personality: PersonalityConfig {
                aggression: PersonalityTrait::new(0.0, true),
                expansion: PersonalityTrait::new(0.0, true),
                chaos: PersonalityTrait::new(0.0, true),
                intervention_enabled: true,
            },
            guardrails: full_scalars(),
            zones: vec![zone],
            ..Default::default()
        });
        let automation = AutomationLoop::new(actions.clone(), Some(5));

        let mut fired = 0;
        for _ in 0..200 {
            if automation.tick().await.intervention {
                fired += 1;
            }
            automation.settle().await;
        }

        let events = actions.events.lock().unwrap();
        assert!(fired > 0);
        assert_eq!(events.len(), fired);
        assert!(events.iter().all(|(_, anchor)| *anchor == Some(zone)));
    }

    #[tokio::test]
    async fn test_stalled_action_does_not_hold_up_the_tick() {
        let actions = Arc::new(RecordingActions {
            personality: PersonalityConfig {
                aggression: PersonalityTrait::new(1.0, true),
                expansion: PersonalityTrait::new(0.0, true),
                chaos: PersonalityTrait::new(1.0, true),
                intervention_enabled: false,
            },
            guardrails: full_scalars(),
            stall_events: true,
            ..Default::default()
        });
        let automation = AutomationLoop::new(actions.clone(), Some(13));

        let first = tokio::time::timeout(Duration::from_secs(1), automation.tick())
            .await
            .expect("tick waited on a stalled action");
        assert!(first.aggression);
        assert!(first.chaos);

        let second = tokio::time::timeout(Duration::from_secs(1), automation.tick())
            .await
            .expect("tick waited on a stalled action");
        assert!(!second.aggression);
        assert_eq!(second.busy, vec!["aggression"]);
        assert!(second.chaos);
        assert_eq!(*actions.chaos.lock().unwrap(), 2);
    }
}
