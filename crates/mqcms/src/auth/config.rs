//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("environment variable {0} is not set")]
    EnvVarNotFound(String),

    #[error("environment variable {0} is empty")]
    EnvVarEmpty(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token for admin routes. `env:VAR_NAME` reads it from the environment.
    pub admin_token: Option<String>,
}

impl AuthConfig {
    /// Resolve the admin token, expanding `env:VAR_NAME` syntax.
    pub fn resolve_admin_token(&self) -> Result<Option<String>, ConfigValidationError> {
        let Some(value) = &self.admin_token else {
            return Ok(None);
        };
        if value.is_empty() {
            return Ok(None);
        }
        match value.strip_prefix("env:") {
            Some(var_name) => match std::env::var(var_name) {
                Ok(token) if !token.is_empty() => Ok(Some(token)),
                Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
            },
            None => Ok(Some(value.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_missing_tokens() {
        let config = AuthConfig {
            admin_token: Some("s3cret".to_string()),
        };
        assert_eq!(config.resolve_admin_token().unwrap().as_deref(), Some("s3cret"));

        assert_eq!(AuthConfig::default().resolve_admin_token().unwrap(), None);
        let empty = AuthConfig {
            admin_token: Some(String::new()),
        };
        assert_eq!(empty.resolve_admin_token().unwrap(), None);
    }

    #[test]
    fn test_env_token_missing() {
        let config = AuthConfig {
            admin_token: Some("env:MQCMS_TEST_TOKEN_THAT_IS_NEVER_SET".to_string()),
        };
        assert_eq!(
            config.resolve_admin_token(),
            Err(ConfigValidationError::EnvVarNotFound(
                "MQCMS_TEST_TOKEN_THAT_IS_NEVER_SET".to_string()
            ))
        );
    }
}
