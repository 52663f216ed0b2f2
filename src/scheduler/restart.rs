//! Debounce and cooldown state machine.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::schema::RestartConfig;

/// Timing knobs of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Delay for a change arriving outside any cooldown.
    pub debounce: Duration,
    /// Length of the window opened by each host-triggered pass.
    pub cooldown: Duration,
    /// Delay for a change arriving inside the window.
    pub cooldown_delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::from(&RestartConfig::default())
    }
}

impl From<&RestartConfig> for RestartPolicy {
    fn from(config: &RestartConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            cooldown: Duration::from_secs(config.cooldown_secs),
            cooldown_delay: Duration::from_secs(config.cooldown_delay_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartState {
    Idle,
    PendingRestart { fires_at: Instant },
    CoolingDown { until: Instant },
}

/// Reaction to a host change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostChangeDecision {
    /// A pass is now scheduled; `throttled` when a cooldown stretched the delay.
    Scheduled {
        delay: Duration,
        fires_at: Instant,
        throttled: bool,
    },
    /// A pass was already scheduled; nothing changed.
    Coalesced,
}

/// Reaction to the deadline from [`RestartScheduler::next_deadline`] passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Run a pass now and report back with [`RestartScheduler::on_reconciled`].
    Fire,
    /// The cooldown window closed.
    CooldownElapsed,
    /// Nothing is due yet.
    Wait,
}

pub struct RestartScheduler {
    policy: RestartPolicy,
    state: RestartState,
}

impl RestartScheduler {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            state: RestartState::Idle,
        }
    }

    pub fn state(&self) -> RestartState {
        self.state
    }

    pub fn policy(&self) -> RestartPolicy {
        self.policy
    }

    pub fn on_host_changed(&mut self, now: Instant) -> HostChangeDecision {
        let throttled = match self.state {
            RestartState::PendingRestart { .. } => return HostChangeDecision::Coalesced,
            RestartState::CoolingDown { until } => now < until,
            RestartState::Idle => false,
        };
        let delay = if throttled {
            self.policy.cooldown_delay
        } else {
            self.policy.debounce
        };

        let fires_at = now + delay;
        self.state = RestartState::PendingRestart { fires_at };
        HostChangeDecision::Scheduled {
            delay,
            fires_at,
            throttled,
        }
    }

    /// When the caller should next call [`on_timer`](Self::on_timer).
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            RestartState::Idle => None,
            RestartState::PendingRestart { fires_at } => Some(fires_at),
            RestartState::CoolingDown { until } => Some(until),
        }
    }

    /// Advance on a timer.
    ///
    /// `Fire` leaves the state at `PendingRestart` until the pass reports back.
    /// The caller must not poll the deadline again while that pass is running.
    pub fn on_timer(&mut self, now: Instant) -> TimerAction {
        match self.state {
            RestartState::PendingRestart { fires_at } if now >= fires_at => TimerAction::Fire,
            RestartState::CoolingDown { until } if now >= until => {
                self.state = RestartState::Idle;
                TimerAction::CooldownElapsed
            }
            _ => TimerAction::Wait,
        }
    }

    /// A fired pass finished, successfully or not.
    pub fn on_reconciled(&mut self, now: Instant) {
        self.state = RestartState::CoolingDown {
            until: now + self.policy.cooldown,
        };
    }
}
