use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// API hash issued for this application at my.telegram.org
    pub api_hash: String,
    /// API id issued for this application at my.telegram.org
    pub api_id: i32,
    /// Directory holding one persisted session file per phone number
    pub session_dir: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC secret for signing bearer tokens
    pub secret: String,
    /// Bearer token lifetime in seconds
    pub ttl_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `TOKEN_SECRET`, `TELEGRAM_API_ID` and `TELEGRAM_API_HASH` are
    /// required; everything else falls back to a default.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let session_dir = std::env::var("SESSION_DIR").unwrap_or_else(|_| "./sessions".to_string());

        let secret = std::env::var("TOKEN_SECRET")
            .map_err(|_| ConfigError::ValidationError("TOKEN_SECRET must be set".to_string()))?;

        let ttl_seconds = std::env::var("TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let api_id: i32 = std::env::var("TELEGRAM_API_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                ConfigError::ValidationError(
                    "TELEGRAM_API_ID must be set to a numeric id".to_string(),
                )
            })?;

        let api_hash = std::env::var("TELEGRAM_API_HASH").map_err(|_| {
            ConfigError::ValidationError("TELEGRAM_API_HASH must be set".to_string())
        })?;

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            telegram: TelegramConfig {
                api_hash,
                api_id,
                session_dir,
            },
            tokens: TokenConfig {
                secret,
                ttl_seconds,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "TOKEN_SECRET cannot be empty".to_string(),
            ));
        }

        if self.tokens.secret.len() < 32 {
            tracing::warn!(
                "TOKEN_SECRET is shorter than 32 bytes. Consider a longer random secret."
            );
        }

        if self.tokens.ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "TOKEN_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.telegram.api_hash.is_empty() {
            return Err(ConfigError::ValidationError(
                "TELEGRAM_API_HASH cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_rejected() {
        let config = Config {
            server: ServerConfig {
                bind_address: "127.0.0.1:0".to_string(),
                data_dir: "/tmp/x".to_string(),
            },
            telegram: TelegramConfig {
                api_hash: "hash".to_string(),
                api_id: 1,
                session_dir: "/tmp/s".to_string(),
            },
            tokens: TokenConfig {
                secret: String::new(),
                ttl_seconds: 60,
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = Config {
            server: ServerConfig {
                bind_address: "127.0.0.1:0".to_string(),
                data_dir: "/tmp/x".to_string(),
            },
            telegram: TelegramConfig {
                api_hash: "hash".to_string(),
                api_id: 1,
                session_dir: "/tmp/s".to_string(),
            },
            tokens: TokenConfig {
                secret: "0123456789abcdef0123456789abcdef".to_string(),
                ttl_seconds: 0,
            },
        };
        assert!(config.validate().is_err());
    }
}
