use thiserror::Error;

/// Errors surfaced by game assembly, configuration and shutdown.
///
/// Stale claims, penalties and an exhausted deck are ordinary outcomes and
/// never show up here.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Task {task} failed to join: {source}")]
    TaskJoin {
        task: String,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
}

impl GameError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        GameError::InvalidConfig {
            reason: reason.into(),
        }
    }
}
