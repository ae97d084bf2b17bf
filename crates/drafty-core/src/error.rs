//! Configuration errors.
//!
//! Each pipeline module owns its error enum (`VersionError`, `NotesError`,
//! `HostError`, `ReconcileError`); this one covers config loading.

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read or deserialize a configuration source.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_message_names_configuration() {
        let err = ConfigError::from(Box::new(figment::Error::from("missing field".to_string())));
        assert!(err.to_string().starts_with("invalid configuration: "));
    }
}
