use super::{types::BootstrapConfig, ConfigError};

/// Validate configuration
/// Currently validates:
/// - retry.attempts is not 0
/// - readiness.max_rounds is not 0
/// - compose.program is not blank
pub fn validate_config(config: &BootstrapConfig) -> Result<(), ConfigError> {
    if config.retry.attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.attempts cannot be 0".to_string(),
        ));
    }

    if config.readiness.max_rounds == 0 {
        return Err(ConfigError::ValidationError(
            "readiness.max_rounds cannot be 0".to_string(),
        ));
    }

    if config.compose.program.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "compose.program cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComposeConfig, RetryConfig};

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&BootstrapConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let config = BootstrapConfig {
            retry: RetryConfig {
                attempts: 0,
                delay_secs: 3,
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_rounds_fails() {
        let mut config = BootstrapConfig::default();
        config.readiness.max_rounds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_blank_program_fails() {
        let config = BootstrapConfig {
            compose: ComposeConfig {
                program: "  ".to_string(),
                health_service: "health-server".to_string(),
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
