//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, chain ids non-zero)
//! - Check that RPC URLs parse
//!
//! Returns all validation errors, not just the first. Unresolved secret
//! placeholders are not an error here: they surface per request as an
//! invalid key for that identity only.

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("network '{network}': invalid url '{url}'")]
    InvalidUrl { network: String, url: String },

    #[error("network '{0}': chain_id must be non-zero")]
    ZeroChainId(String),

    #[error("lifecycle.{0} must be greater than zero")]
    ZeroLifecycleValue(&'static str),

    #[error("lifecycle.gas_bump_percent must be at least {MIN_GAS_BUMP_PERCENT}, got {0}")]
    GasBumpTooSmall(u32),

    #[error("rpc.timeout_secs must be greater than zero")]
    ZeroRpcTimeout,
}

/// Replacements must outbid the stuck transaction by at least 20%.
pub const MIN_GAS_BUMP_PERCENT: u32 = 120;

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, network) in &config.networks {
        if url::Url::parse(&network.url).is_err() {
            errors.push(ValidationError::InvalidUrl {
                network: name.clone(),
                url: network.url.clone(),
            });
        }
        if network.chain_id == 0 {
            errors.push(ValidationError::ZeroChainId(name.clone()));
        }
    }

    let lifecycle = &config.lifecycle;
    if lifecycle.max_attempts == 0 {
        errors.push(ValidationError::ZeroLifecycleValue("max_attempts"));
    }
    if lifecycle.stuck_check_every == 0 {
        errors.push(ValidationError::ZeroLifecycleValue("stuck_check_every"));
    }
    if lifecycle.deploy_gas_limit == 0 {
        errors.push(ValidationError::ZeroLifecycleValue("deploy_gas_limit"));
    }
    if lifecycle.gas_bump_percent < MIN_GAS_BUMP_PERCENT {
        errors.push(ValidationError::GasBumpTooSmall(lifecycle.gas_bump_percent));
    }

    if config.rpc.timeout_secs == 0 {
        errors.push(ValidationError::ZeroRpcTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
