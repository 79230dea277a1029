use std::time::Duration;

use thiserror::Error;

use super::types::InstanceState;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Cloud operation failed: {0}")]
    Cloud(String),

    /// A provider CLI call did not finish in time and was killed.
    #[error("{command} timed out after {timeout:?}")]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid instance request: {0}")]
    InvalidRequest(String),

    /// A single creation attempt failed. Retried by the acquirer, only surfaced
    /// as the source of [`ProvisionError::AcquisitionExhausted`].
    #[error("instance creation in subnet {subnet} failed: {source}")]
    Creation {
        subnet: String,
        #[source]
        source: Box<ProvisionError>,
    },

    /// The provider accepted the request but reported no instance id.
    #[error("provider returned no instance id for subnet {subnet} (instance may be orphaned)")]
    NoInstanceReturned { subnet: String },

    #[error("instance acquisition failed after {attempts} attempt(s): {source}")]
    AcquisitionExhausted {
        attempts: u32,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error("termination of instance {instance_id} failed: {source}")]
    Termination {
        instance_id: String,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error("instance {instance_id} not running after {waited:?}")]
    Timeout {
        instance_id: String,
        waited: Duration,
    },

    #[error("instance {instance_id} entered state {state} while waiting for running")]
    UnexpectedState {
        instance_id: String,
        state: InstanceState,
    },
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;
