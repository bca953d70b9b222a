//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address syntax
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("rate_limit.burst_size ({burst}) is below requests_per_second ({rate})")]
    BurstBelowRate { burst: u32, rate: u32 },
}

/// Check `config`, collecting every violation.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_connections",
        });
    }

    if config.rate_limit.enabled {
        let rate = config.rate_limit.requests_per_second;
        let burst = config.rate_limit.burst_size;
        if rate == 0 {
            errors.push(ValidationError::Zero {
                field: "rate_limit.requests_per_second",
            });
        }
        if burst != 0 && burst < rate {
            errors.push(ValidationError::BurstBelowRate { burst, rate });
        }
    }

    if config.limits.max_payload_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "limits.max_payload_bytes",
        });
    }

    if config.http2.max_concurrent_streams == 0 {
        errors.push(ValidationError::Zero {
            field: "http2.max_concurrent_streams",
        });
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "health_check.interval_secs",
        });
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn every_violation_is_reported() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.listener.max_connections = 0;
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 0;
        config.limits.max_payload_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero {
            field: "listener.max_connections"
        }));
        assert!(errors.contains(&ValidationError::Zero {
            field: "rate_limit.requests_per_second"
        }));
    }

    #[test]
    fn burst_below_rate_is_rejected() {
        let mut config = ServerConfig::default();
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 100;
        config.rate_limit.burst_size = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::BurstBelowRate { burst: 10, rate: 100 }]);
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "nope".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
