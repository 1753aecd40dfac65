use chatrelay::errors::RelayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid relay configuration: {0}")]
    Relay(#[from] RelayError),
}

/// Environment variable that sets a dotted configuration key
pub fn to_env_var(field: &str) -> String {
    format!("RELAY_{}", field.to_uppercase().replace('.', "__"))
}
