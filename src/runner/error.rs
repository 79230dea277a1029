use thiserror::Error;

use crate::config::ConfigError;
use crate::provision::ProvisionError;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("failed to write outputs: {0}")]
    Output(#[from] std::io::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
