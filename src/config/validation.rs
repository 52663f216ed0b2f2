//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check backend identity (ids present and unique)
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ReloaderConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ReloaderConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend #{index} has an empty id")]
    EmptyBackendId { index: usize },

    #[error("backend id '{0}' is defined more than once")]
    DuplicateBackendId(String),

    #[error("backend '{backend}' server #{index} has an empty host")]
    EmptyServerHost { backend: String, index: usize },

    #[error("backend '{backend}' server '{host}' has port 0")]
    InvalidPort { backend: String, host: String },

    #[error("paths.output must not be empty")]
    EmptyOutputPath,

    #[error("reload.timeout_secs must be greater than zero")]
    ZeroReloadTimeout,

    #[error("resolver.refresh_interval_secs must be greater than zero")]
    ZeroRefreshInterval,

    #[error("resolver.startup_attempts must be greater than zero")]
    ZeroStartupAttempts,
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ReloaderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.paths.output.trim().is_empty() {
        errors.push(ValidationError::EmptyOutputPath);
    }
    if config.reload.timeout_secs == 0 {
        errors.push(ValidationError::ZeroReloadTimeout);
    }
    if config.resolver.refresh_interval_secs == 0 {
        errors.push(ValidationError::ZeroRefreshInterval);
    }
    if config.resolver.startup_attempts == 0 {
        errors.push(ValidationError::ZeroStartupAttempts);
    }

    let mut seen = HashSet::new();
    for (index, api) in config.apis.iter().enumerate() {
        if api.id.trim().is_empty() {
            errors.push(ValidationError::EmptyBackendId { index });
        } else if !seen.insert(api.id.as_str()) {
            errors.push(ValidationError::DuplicateBackendId(api.id.clone()));
        }

        for (index, server) in api.servers.iter().enumerate() {
            if server.host.trim().is_empty() {
                errors.push(ValidationError::EmptyServerHost {
                    backend: api.id.clone(),
                    index,
                });
            } else if server.port == 0 {
                errors.push(ValidationError::InvalidPort {
                    backend: api.id.clone(),
                    host: server.host.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
