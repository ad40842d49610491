//! The tick orchestrator.
//!
//! A [`Personality`] walks the active users once per tick, rolls each one's
//! encounter odds, and for every hit asks the loremaster for an event,
//! resolves it, and dispatches the resulting queue. Between ticks it naps
//! for a random number of seconds.
//!
//! A failure for one user (a read, the loremaster, or the dispatch) is
//! logged and counted; the remaining users in the tick are still processed
//! and the loop keeps running. The loop ends only when its [`LoopControl`]
//! requests a stop or the optional tick bound is reached.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rowantree_types::UserId;
use tracing::{debug, info, warn};

use crate::config::PersonalityConfig;
use crate::control::{LoopControl, LoopEndReason};
use crate::dispatch::{self, DispatchError};
use crate::luck::Luck;
use crate::resolver::{self, ResolveError};
use crate::service::{EventGenerator, GeneratorError, ServiceError, UserStateService};

/// Errors from a single user's encounter.
#[derive(Debug, thiserror::Error)]
pub enum EncounterError {
    /// Reading the user's population for the loremaster failed.
    #[error("population read failed: {0}")]
    Population(#[source] ServiceError),

    /// The loremaster failed.
    #[error("event generation failed: {0}")]
    Generator(#[from] GeneratorError),

    /// Resolving the event failed.
    #[error("event resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Submitting the resolved queue failed.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// What happened to one user in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterOutcome {
    /// The odds roll failed; nothing was asked of anyone.
    Skipped,
    /// The roll succeeded but the loremaster declined to produce an event.
    NoEvent,
    /// An event was resolved and its queue dispatched.
    Applied {
        /// Number of actions dispatched (mutations plus the notification).
        actions: usize,
    },
}

/// Summary of one pass over the active users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Wall-clock start of the tick.
    pub started_at: DateTime<Utc>,
    /// Active users seen.
    pub users: usize,
    /// Users whose odds roll succeeded.
    pub encounters: usize,
    /// Actions dispatched across all users.
    pub actions_dispatched: usize,
    /// Users whose encounter failed, plus one if the user list could not be read.
    pub failures: usize,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// When the loop control was created.
    pub started_at: DateTime<Utc>,
    /// Why the loop ended.
    pub end_reason: LoopEndReason,
    /// Ticks completed.
    pub total_ticks: u64,
    /// Failures summed over all ticks.
    pub total_failures: u64,
}

/// The world personality: owns its collaborators and drives the tick loop.
pub struct Personality<S, G> {
    service: S,
    loremaster: G,
    luck: Luck,
    config: PersonalityConfig,
    control: Arc<LoopControl>,
    rng: StdRng,
    tick: u64,
}

impl<S, G> Personality<S, G>
where
    S: UserStateService,
    G: EventGenerator,
{
    /// Create a personality with an OS-seeded random source.
    pub fn new(
        service: S,
        loremaster: G,
        config: PersonalityConfig,
        control: Arc<LoopControl>,
    ) -> Self {
        Self::with_rng(service, loremaster, config, control, StdRng::from_os_rng())
    }

    /// Create a personality with a specific random source.
    pub fn with_rng(
        service: S,
        loremaster: G,
        config: PersonalityConfig,
        control: Arc<LoopControl>,
        rng: StdRng,
    ) -> Self {
        Self {
            service,
            loremaster,
            luck: Luck::new(config.encounter_odds),
            config,
            control,
            rng,
            tick: 0,
        }
    }

    /// The injected user-state service.
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// The injected event generator.
    pub const fn loremaster(&self) -> &G {
        &self.loremaster
    }

    /// The shared loop control.
    pub const fn control(&self) -> &Arc<LoopControl> {
        &self.control
    }

    /// Ticks completed so far.
    pub const fn ticks(&self) -> u64 {
        self.tick
    }

    /// Give one user a chance at an encounter.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError`] if any step after a successful odds roll
    /// fails. Nothing is dispatched unless resolution succeeds.
    pub async fn encounter(&mut self, user: UserId) -> Result<EncounterOutcome, EncounterError> {
        if !self.luck.roll(&mut self.rng) {
            return Ok(EncounterOutcome::Skipped);
        }

        let population = self
            .service
            .user_population(user)
            .await
            .map_err(EncounterError::Population)?;
        let event = self.loremaster.generate_event(population).await?;

        let Some(resolution) = resolver::resolve(&self.service, event, user, &mut self.rng).await?
        else {
            debug!(user = %user, population, "loremaster declined");
            return Ok(EncounterOutcome::NoEvent);
        };

        dispatch::dispatch(&self.service, &resolution.queue).await?;

        let actions = resolution.queue.len();
        info!(
            user = %user,
            title = %resolution.event.title,
            actions,
            "encounter applied"
        );
        Ok(EncounterOutcome::Applied { actions })
    }

    /// Run one tick over every active user.
    ///
    /// Never fails: a user-list read failure ends the tick early and each
    /// user's failure is isolated to that user. Both are counted in
    /// [`TickSummary::failures`].
    pub async fn contemplate(&mut self) -> TickSummary {
        self.tick = self.tick.saturating_add(1);
        let mut summary = TickSummary {
            tick: self.tick,
            started_at: Utc::now(),
            users: 0,
            encounters: 0,
            actions_dispatched: 0,
            failures: 0,
        };

        let users = match self.service.active_users().await {
            Ok(users) => users,
            Err(e) => {
                warn!(tick = self.tick, error = %e, "failed to list active users");
                summary.failures = 1;
                return summary;
            }
        };
        summary.users = users.len();

        for user in users {
            match self.encounter(user).await {
                Ok(EncounterOutcome::Skipped) => {}
                Ok(EncounterOutcome::NoEvent) => {
                    summary.encounters = summary.encounters.saturating_add(1);
                }
                Ok(EncounterOutcome::Applied { actions }) => {
                    summary.encounters = summary.encounters.saturating_add(1);
                    summary.actions_dispatched = summary.actions_dispatched.saturating_add(actions);
                }
                Err(e) => {
                    summary.encounters = summary.encounters.saturating_add(1);
                    summary.failures = summary.failures.saturating_add(1);
                    warn!(tick = self.tick, user = %user, error = %e, "encounter failed");
                }
            }
        }

        info!(
            tick = summary.tick,
            users = summary.users,
            encounters = summary.encounters,
            actions = summary.actions_dispatched,
            failures = summary.failures,
            "tick complete"
        );
        summary
    }

    /// Draw the next nap length, uniform over the configured bounds.
    pub fn nap_duration(&mut self) -> Duration {
        let max = self.config.max_nap_seconds.max(1);
        let min = self.config.min_nap_seconds.min(max);
        Duration::from_secs(self.rng.random_range(min..=max))
    }

    /// Sleep between ticks.
    ///
    /// Returns `false` if a stop request cut the nap short.
    pub async fn slumber(&mut self) -> bool {
        let nap = self.nap_duration();
        debug!(seconds = nap.as_secs(), "napping");
        self.control.nap(nap).await
    }

    /// Tick and nap until stopped or the tick bound is reached.
    pub async fn run(&mut self) -> RunSummary {
        let mut total_ticks: u64 = 0;
        let mut total_failures: u64 = 0;

        info!(
            encounter_odds = self.luck.odds_percent(),
            min_nap_seconds = self.config.min_nap_seconds,
            max_nap_seconds = self.config.max_nap_seconds,
            max_ticks = self.config.max_ticks,
            "personality awake"
        );

        let end_reason = loop {
            if self.control.is_stop_requested() {
                break LoopEndReason::StopRequested;
            }

            let summary = self.contemplate().await;
            total_ticks = total_ticks.saturating_add(1);
            total_failures =
                total_failures.saturating_add(u64::try_from(summary.failures).unwrap_or(u64::MAX));

            if self.config.max_ticks > 0 && total_ticks >= self.config.max_ticks {
                break LoopEndReason::MaxTicksReached;
            }

            if !self.slumber().await {
                break LoopEndReason::StopRequested;
            }
        };

        let started_at = self.control.started_at();
        info!(
            reason = ?end_reason,
            %started_at,
            total_ticks,
            total_failures,
            "personality resting"
        );

        RunSummary {
            started_at,
            end_reason,
            total_ticks,
            total_failures,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rowantree_types::{StoreSnapshot, StoreType, UserEvent};

    use super::*;
    use crate::memory::{InMemoryUserState, ScriptedLoremaster};

    fn config(odds: u32, max_ticks: u64) -> PersonalityConfig {
        PersonalityConfig {
            encounter_odds: odds,
            min_nap_seconds: 1,
            max_nap_seconds: 10,
            max_ticks,
        }
    }

    fn personality(
        odds: u32,
        max_ticks: u64,
        loremaster: ScriptedLoremaster,
    ) -> Personality<InMemoryUserState, ScriptedLoremaster> {
        Personality::with_rng(
            InMemoryUserState::new(),
            loremaster,
            config(odds, max_ticks),
            Arc::new(LoopControl::new()),
            StdRng::seed_from_u64(42),
        )
    }

    #[tokio::test]
    async fn zero_odds_never_ask_the_loremaster() {
        let mut p = personality(0, 0, ScriptedLoremaster::always(UserEvent::titled("x")));
        let user = UserId::new();
        p.service().insert_user(user, 5, StoreSnapshot::new());

        let outcome = p.encounter(user).await.unwrap();

        assert_eq!(outcome, EncounterOutcome::Skipped);
        assert!(p.loremaster().requests().is_empty());
        assert_eq!(p.service().read_count(), 0);
    }

    #[tokio::test]
    async fn loremaster_receives_population() {
        let mut p = personality(100, 0, ScriptedLoremaster::never());
        let user = UserId::new();
        p.service().insert_user(user, 37, StoreSnapshot::new());

        let outcome = p.encounter(user).await.unwrap();

        assert_eq!(outcome, EncounterOutcome::NoEvent);
        assert_eq!(p.loremaster().requests(), vec![37]);
        assert!(p.service().submitted().is_empty());
    }

    #[tokio::test]
    async fn applied_event_is_dispatched() {
        let event = UserEvent::titled("Bountiful harvest").with_reward(StoreType::Food, 4);
        let mut p = personality(100, 0, ScriptedLoremaster::always(event));
        let user = UserId::new();
        p.service()
            .insert_user(user, 5, [(StoreType::Food, 10)].into_iter().collect());

        let outcome = p.encounter(user).await.unwrap();

        assert_eq!(outcome, EncounterOutcome::Applied { actions: 2 });
        let record = p.service().user(user).unwrap();
        let food = *record.stores.get(&StoreType::Food).unwrap();
        assert!((11..=14).contains(&food));
        assert_eq!(record.notifications.len(), 1);
    }

    #[tokio::test]
    async fn loremaster_failure_is_an_encounter_error() {
        let mut p = personality(100, 0, ScriptedLoremaster::failing());
        let user = UserId::new();
        p.service().insert_user(user, 5, StoreSnapshot::new());

        let result = p.encounter(user).await;
        assert!(matches!(result, Err(EncounterError::Generator(_))));
    }

    #[tokio::test]
    async fn tick_counts_users_and_encounters() {
        let mut p = personality(100, 0, ScriptedLoremaster::always(UserEvent::titled("Rain")));
        for _ in 0..3 {
            p.service().insert_user(UserId::new(), 5, StoreSnapshot::new());
        }

        let summary = p.contemplate().await;

        assert_eq!(summary.tick, 1);
        assert_eq!(summary.users, 3);
        assert_eq!(summary.encounters, 3);
        assert_eq!(summary.actions_dispatched, 3);
        assert_eq!(summary.failures, 0);
        assert_eq!(p.ticks(), 1);
    }

    #[tokio::test]
    async fn failing_user_does_not_block_the_rest() {
        let mut p = personality(100, 0, ScriptedLoremaster::always(UserEvent::titled("Rain")));
        let users: Vec<UserId> = (0..3).map(|_| UserId::new()).collect();
        for user in &users {
            p.service().insert_user(*user, 5, StoreSnapshot::new());
        }
        let broken = *users.first().unwrap();
        p.service().fail_submissions_for(broken);

        let summary = p.contemplate().await;

        assert_eq!(summary.failures, 1);
        assert_eq!(summary.actions_dispatched, 2);
        assert!(p.service().user(broken).unwrap().notifications.is_empty());
        for user in users.iter().skip(1) {
            assert_eq!(p.service().user(*user).unwrap().notifications.len(), 1);
        }
    }

    #[test]
    fn nap_stays_within_bounds() {
        let mut p = personality(10, 0, ScriptedLoremaster::never());
        for _ in 0..500 {
            let nap = p.nap_duration().as_secs();
            assert!((1..=10).contains(&nap), "nap {nap}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_at_tick_bound() {
        let mut p = personality(100, 3, ScriptedLoremaster::never());
        p.service().insert_user(UserId::new(), 5, StoreSnapshot::new());

        let summary = p.run().await;

        assert_eq!(summary.end_reason, LoopEndReason::MaxTicksReached);
        assert_eq!(summary.total_ticks, 3);
        assert_eq!(p.loremaster().requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn run_does_not_tick_after_stop() {
        let mut p = personality(100, 0, ScriptedLoremaster::never());
        p.control().request_stop();

        let summary = p.run().await;

        assert_eq!(summary.end_reason, LoopEndReason::StopRequested);
        assert_eq!(summary.total_ticks, 0);
        assert_eq!(summary.started_at, p.control().started_at());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_nap_ends_the_loop() {
        let mut p = personality(100, 0, ScriptedLoremaster::never());
        p.service().insert_user(UserId::new(), 5, StoreSnapshot::new());
        let control = Arc::clone(p.control());
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            control.request_stop();
        });

        let summary = p.run().await;

        assert_eq!(summary.end_reason, LoopEndReason::StopRequested);
        // Naps are at most 10s, so at least three ticks fit before the stop.
        assert!(summary.total_ticks >= 3);
        assert!(stopper.await.is_ok());
    }
}
