use fragdpd::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to parse scenario file '{path}': {source}", path = path.display())]
    Scenario {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid scenario: {0}")]
    ScenarioContent(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
