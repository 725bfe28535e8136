//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, permission modes)
//! - Check that an enabled TLS listener has its key material configured
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::{SchemeConfig, ServerConfig, DISABLED_PORT};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be -1 or within 0..=65535, got {value}")]
    PortOutOfRange { field: &'static str, value: i32 },
    #[error("scheme.address must not be empty while a TCP listener is enabled")]
    EmptyAddress,
    #[error("scheme.{field} is required when https_port is enabled")]
    MissingTlsFile { field: &'static str },
    #[error("scheme.unix_file_perm {value:?} is not an octal mode")]
    InvalidPermission { value: String },
    #[error("observability.log_level {value:?} is not a known level")]
    InvalidLogLevel { value: String },
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_scheme(&config.scheme, &mut errors);

    let level = config.observability.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::InvalidLogLevel {
            value: config.observability.log_level.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_scheme(scheme: &SchemeConfig, errors: &mut Vec<ValidationError>) {
    for (field, value) in [("http_port", scheme.http_port), ("https_port", scheme.https_port)] {
        if value != DISABLED_PORT && !(0..=65535).contains(&value) {
            errors.push(ValidationError::PortOutOfRange { field, value });
        }
    }

    let tcp_enabled = scheme.http_port != DISABLED_PORT || scheme.https_port != DISABLED_PORT;
    if tcp_enabled && scheme.address.trim().is_empty() {
        errors.push(ValidationError::EmptyAddress);
    }

    if scheme.https_port != DISABLED_PORT {
        if scheme.cert_file.is_empty() {
            errors.push(ValidationError::MissingTlsFile { field: "cert_file" });
        }
        if scheme.key_file.is_empty() {
            errors.push(ValidationError::MissingTlsFile { field: "key_file" });
        }
    }

    if !scheme.unix_file_perm.is_empty() && parse_mode(&scheme.unix_file_perm).is_none() {
        errors.push(ValidationError::InvalidPermission {
            value: scheme.unix_file_perm.clone(),
        });
    }
}

/// Parse an octal permission string such as `"0666"` or `"0o600"`.
pub fn parse_mode(value: &str) -> Option<u32> {
    let digits = value.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
}
