//! Ephemeral EC2 runners for GitHub Actions (library crate used by the binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Acquisition
//! - [`InstanceAcquirer`] - create one instance with subnet failover, await it, terminate it
//! - [`ComputeOps`] - provider seam ([`AwsComputeOps`], [`LocalComputeOps`])
//! - [`InstanceRequest`], [`SubnetList`], [`InstanceHandle`], [`RetryPolicy`], [`WaitPolicy`]
//!
//! ## Boot Scripts
//! - [`BootScript`] strategies per [`TargetOs`] and [`InstallMode`]
//!
//! ## Configuration & Flows
//! - [`Config`], [`ConfigError`] - `EC2_RUNNER_*` environment settings
//! - [`runner`] - the `start`/`stop` flows used by the binary
//!
//! ## Test/Mock Support
//! [`MockComputeOps`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod bootscript;
pub mod config;
pub mod provision;
pub mod runner;

pub use bootscript::{
    BootParams, BootScript, InstallMode, LinuxBootScript, RUNNER_VERSION, TargetOs,
    WindowsBootScript, build_boot_script,
};
pub use config::{Config, ConfigError, Mode};
#[cfg(any(test, feature = "mock"))]
pub use provision::{MockComputeOps, MockOutcome, MockPoll};
pub use provision::{
    AwsComputeOps, ComputeOps, ComputeProviderType, InstanceAcquirer, InstanceHandle,
    InstanceRequest, InstanceState, LocalComputeOps, MarketOption, ProvisionError,
    ProvisionResult, RetryPolicy, SubnetList, Tag, WaitPolicy,
};
pub use runner::{RunnerError, RunnerResult, StartOutputs};
