use stampede_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid run configuration: {0}")]
    Config(#[from] ConfigError),
}
