//! Configuration validation framework

use crate::{ConfigError, ConfigResult};

/// Trait for validating configuration values
pub trait Validate {
    /// Validate this configuration object
    ///
    /// # Errors
    /// Returns validation errors if the configuration is invalid
    fn validate(&self) -> ConfigResult<()>;
}

/// Validate a value is within a range
///
/// # Errors
/// Returns `ConfigError::OutOfRange` if value is outside the specified range
pub fn validate_range(value: u64, min: u64, max: u64, field_name: &str) -> ConfigResult<()> {
    if value < min || value > max {
        Err(ConfigError::OutOfRange {
            field: field_name.to_string(),
            value,
            min,
            max,
        })
    } else {
        Ok(())
    }
}

/// Validate a string is not empty
///
/// # Errors
/// Returns `ConfigError::MissingField` if the string is empty or whitespace-only
pub fn validate_non_empty(value: &str, field_name: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField {
            field: field_name.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate a tracing level name
///
/// # Errors
/// Returns `ConfigError::Generic` for anything but the five standard levels
pub fn validate_tracing_level(level: &str) -> ConfigResult<()> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Generic {
            message: format!("Invalid tracing level: {level}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range_bounds_are_inclusive() {
        assert!(validate_range(1, 1, 10, "field").is_ok());
        assert!(validate_range(10, 1, 10, "field").is_ok());

        let err = validate_range(11, 1, 10, "cache.capacity").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value 11 is out of range for cache.capacity (expected 1-10)"
        );
    }

    #[test]
    fn test_validate_non_empty_rejects_whitespace() {
        assert!(validate_non_empty("content.db", "path").is_ok());
        assert!(matches!(
            validate_non_empty("   ", "path"),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_tracing_level_is_case_insensitive() {
        assert!(validate_tracing_level("DEBUG").is_ok());
        assert!(validate_tracing_level("verbose").is_err());
    }
}
