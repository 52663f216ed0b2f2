//! Restart scheduling for host address changes.
//!
//! # States
//! - Idle: nothing pending, no recent host-triggered pass
//! - PendingRestart: one pass scheduled at `fires_at`
//! - CoolingDown: a host-triggered pass ran recently; new changes wait longer
//!
//! # State Transitions
//! ```text
//! Idle           → PendingRestart: host changed (delay = debounce)
//! CoolingDown    → PendingRestart: host changed (delay = cooldown_delay)
//! PendingRestart → PendingRestart: host changed (coalesced, timer untouched)
//! PendingRestart → CoolingDown:    pass finished, any outcome
//! CoolingDown    → Idle:           cooldown elapsed
//! ```
//!
//! # Design Decisions
//! - One global state, because a proxy reload is global
//! - Pure state machine; the caller supplies `now`, so tests need no wall clock
//! - At most one pending timer; later events never extend or duplicate it

pub mod restart;

pub use restart::{HostChangeDecision, RestartPolicy, RestartScheduler, RestartState, TimerAction};
