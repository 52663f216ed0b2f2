//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Startup barrier:
//!     resolve_all() attempt fails
//!     → backoff.rs (exponential delay with jitter)
//!     → next attempt, until the attempt budget is spent
//! ```
//!
//! # Design Decisions
//! - Jittered backoff keeps restarted replicas from hammering the resolver together
//! - Delays are capped so a long outage still retries at a steady pace

pub mod backoff;
