//! Session Orchestrator
//!
//! The phase state machine driving a play session: check energy, play while
//! it lasts, wait for recharge when it runs out, back off on failure. Each
//! [`step`](Orchestrator::step) runs one phase to completion and returns the
//! next; [`run`](Orchestrator::run) loops steps until shutdown.
//!
//! The orchestrator owns the session counters outright. It talks to the
//! backend only through [`GameApi`] and reports only through [`StatusSink`],
//! so the whole machine runs under test with a mock of each.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::gateway::GameApi;
use crate::scoring::ScorePolicy;
use crate::session::SessionStats;
use crate::sink::StatusSink;
use crate::timing::{Countdown, CountdownEvent, ShutdownSignal};

/// Phase of the session state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Fetch remote state and gate on the energy balance
    CheckingEnergy,
    /// Energy exhausted; poll until it recharges or the wait times out
    WaitingForEnergy,
    /// Simulate a round of play, then submit its result
    Playing,
    /// Short pause between successful games
    Cooldown,
    /// Pause after a transient failure before re-checking
    Backoff,
}

/// Timing knobs for the state machine
#[derive(Clone, Copy, Debug)]
pub struct TimerSettings {
    /// Simulated playtime before a result is submitted
    pub play_duration: Duration,
    /// Display-only energy refresh interval during playtime
    pub energy_refresh_interval: Duration,
    /// Poll interval while waiting for recharge
    pub energy_poll_interval: Duration,
    /// Maximum recharge wait before re-checking anyway
    pub energy_wait_max: Duration,
    /// Minimum cooldown between games
    pub cooldown_min: Duration,
    /// Maximum cooldown between games
    pub cooldown_max: Duration,
    /// Pause after a transient failure
    pub failure_backoff: Duration,
}

impl TimerSettings {
    /// Derive timer settings from the game configuration
    ///
    /// An inverted cooldown range is clamped rather than rejected.
    #[must_use]
    pub fn from_game(game: &GameConfig) -> Self {
        let (cooldown_min, cooldown_max) = game.cooldown_range();
        Self {
            play_duration: game.play_duration(),
            energy_refresh_interval: game.energy_refresh_interval(),
            energy_poll_interval: game.energy_poll_interval(),
            energy_wait_max: game.energy_wait_max(),
            cooldown_min,
            cooldown_max: cooldown_max.max(cooldown_min),
            failure_backoff: game.failure_backoff(),
        }
    }
}

/// Drives the play-session state machine
pub struct Orchestrator<A, P, S> {
    api: A,
    policy: P,
    sink: S,
    timers: TimerSettings,
    shutdown: ShutdownSignal,
    stats: SessionStats,
}

impl<A, P, S> Orchestrator<A, P, S>
where
    A: GameApi,
    P: ScorePolicy,
    S: StatusSink,
{
    /// Create an orchestrator over the given collaborators
    pub fn new(api: A, policy: P, sink: S, timers: TimerSettings, shutdown: ShutdownSignal) -> Self {
        Self {
            api,
            policy,
            sink,
            timers,
            shutdown,
            stats: SessionStats::new(),
        }
    }

    /// The current session counters
    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run the session until shutdown, returning the final counters
    pub async fn run(mut self) -> SessionStats {
        info!("Session started");
        self.sink.push(&self.stats);

        let mut phase = Phase::CheckingEnergy;
        while !self.shutdown.is_triggered() {
            phase = self.step(phase).await;
        }

        info!(
            total_games = self.stats.total_games,
            total_points = self.stats.total_points,
            "Session ended"
        );
        self.stats
    }

    /// Execute one phase and return the next
    pub async fn step(&mut self, phase: Phase) -> Phase {
        match phase {
            Phase::CheckingEnergy => self.check_energy().await,
            Phase::WaitingForEnergy => self.wait_for_energy().await,
            Phase::Playing => self.play().await,
            Phase::Cooldown => self.cooldown().await,
            Phase::Backoff => self.backoff().await,
        }
    }

    /// Fetch remote state and decide whether a round can start
    async fn check_energy(&mut self) -> Phase {
        match self.api.fetch_state().await {
            Ok(snapshot) => {
                self.stats.set_energy(snapshot.energy);
                self.sink.push(&self.stats);
                if snapshot.energy > 0 {
                    Phase::Playing
                } else {
                    info!("Energy exhausted, waiting for recharge");
                    Phase::WaitingForEnergy
                }
            }
            Err(e) => {
                warn!(error = %e, "Energy check failed");
                Phase::Backoff
            }
        }
    }

    /// Poll for recharge until energy appears or the wait times out
    async fn wait_for_energy(&mut self) -> Phase {
        let mut shutdown = self.shutdown.clone();
        let mut run =
            Countdown::new(self.timers.energy_poll_interval, self.timers.energy_wait_max).start();

        loop {
            match run.tick(&mut shutdown).await {
                CountdownEvent::Cancelled => return Phase::WaitingForEnergy,
                CountdownEvent::Elapsed => {
                    info!("Recharge wait timed out, re-checking");
                    return Phase::CheckingEnergy;
                }
                CountdownEvent::Tick { elapsed } => match self.api.fetch_state().await {
                    Ok(snapshot) => {
                        self.stats.set_energy(snapshot.energy);
                        self.sink.push(&self.stats);
                        if snapshot.energy > 0 {
                            info!(
                                energy = snapshot.energy,
                                waited_secs = elapsed.as_secs(),
                                "Energy recharged"
                            );
                            return Phase::CheckingEnergy;
                        }
                    }
                    Err(e) => {
                        // Keep waiting; a failed poll is not a failed session
                        warn!(error = %e, "Recharge poll failed");
                    }
                },
            }
        }
    }

    /// Simulate a round, then submit its result exactly once
    async fn play(&mut self) -> Phase {
        let play = self.policy.next_play();
        info!(score = play.score, multiplier = %play.multiplier, "Playing round");

        let mut shutdown = self.shutdown.clone();
        let mut run = Countdown::new(
            self.timers.energy_refresh_interval,
            self.timers.play_duration,
        )
        .start();

        loop {
            match run.tick(&mut shutdown).await {
                // Interrupted rounds are abandoned, never submitted
                CountdownEvent::Cancelled => return Phase::Playing,
                CountdownEvent::Elapsed => break,
                CountdownEvent::Tick { .. } => {
                    // Display-only refresh; progression is unaffected
                    match self.api.fetch_state().await {
                        Ok(snapshot) => {
                            self.stats.set_energy(snapshot.energy);
                            self.sink.push(&self.stats);
                        }
                        Err(e) => debug!(error = %e, "Display refresh failed"),
                    }
                }
            }
        }

        match self.api.submit_play(&play).await {
            Ok(reward) => {
                self.stats
                    .record_play(play.score, &play.multiplier, reward.energy);
                self.sink.push(&self.stats);
                info!(
                    score = play.score,
                    total_games = self.stats.total_games,
                    total_points = self.stats.total_points,
                    "Round recorded"
                );
                Phase::Cooldown
            }
            Err(e) => {
                // Submission is not idempotent; the round is lost, not retried
                warn!(error = %e, "Play submission failed");
                Phase::Backoff
            }
        }
    }

    /// Pseudo-random pause between games
    async fn cooldown(&mut self) -> Phase {
        let min = self.timers.cooldown_min.as_secs();
        let max = self.timers.cooldown_max.as_secs().max(min);
        let secs = rand::thread_rng().gen_range(min..=max);
        debug!(secs, "Cooling down");

        let mut shutdown = self.shutdown.clone();
        Countdown::fixed(Duration::from_secs(secs))
            .sleep(&mut shutdown)
            .await;
        Phase::CheckingEnergy
    }

    /// Fixed pause after a transient failure
    async fn backoff(&mut self) -> Phase {
        warn!(
            secs = self.timers.failure_backoff.as_secs(),
            "Backing off after failure"
        );

        let mut shutdown = self.shutdown.clone();
        Countdown::fixed(self.timers.failure_backoff)
            .sleep(&mut shutdown)
            .await;
        Phase::CheckingEnergy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_settings_from_game_defaults() {
        let timers = TimerSettings::from_game(&GameConfig::default());

        assert_eq!(timers.play_duration, Duration::from_secs(60));
        assert_eq!(timers.energy_refresh_interval, Duration::from_secs(5));
        assert_eq!(timers.energy_poll_interval, Duration::from_secs(300));
        assert_eq!(timers.energy_wait_max, Duration::from_secs(10_800));
        assert_eq!(timers.cooldown_min, Duration::from_secs(5));
        assert_eq!(timers.cooldown_max, Duration::from_secs(10));
        assert_eq!(timers.failure_backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_inverted_cooldown_range_is_clamped() {
        let mut game = GameConfig::default();
        game.cooldown_min_secs = 20;
        game.cooldown_max_secs = 10;

        let timers = TimerSettings::from_game(&game);
        assert_eq!(timers.cooldown_max, timers.cooldown_min);
    }
}
