use std::time::Duration;

use super::error::{ProvisionError, ProvisionResult};

/// Default number of creation attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default pause between creation attempts.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;
/// Default budget for the instance to reach `running`.
pub const DEFAULT_MAX_WAIT_SECS: u64 = 30;
/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Compute provider selection.
pub enum ComputeProviderType {
    #[default]
    /// Amazon EC2 through the `aws` CLI.
    Aws,
    /// In-process simulation, nothing is billed.
    Local,
}

impl std::str::FromStr for ComputeProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" | "ec2" => Ok(Self::Aws),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown compute provider: {}", s)),
        }
    }
}

/// Bounded, constant-delay retry budget for instance creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of creation attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn validate(&self) -> ProvisionResult<()> {
        if self.max_attempts == 0 {
            return Err(ProvisionError::InvalidRequest(
                "max attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Budget for polling an instance until it reports `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl WaitPolicy {
    pub fn new(max_wait: Duration, poll_interval: Duration) -> Self {
        Self {
            max_wait,
            poll_interval,
        }
    }

    pub fn validate(&self) -> ProvisionResult<()> {
        if self.poll_interval.is_zero() {
            return Err(ProvisionError::InvalidRequest(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
