//! Single-instance acquisition with subnet failover, plus terminate/await helpers.

pub mod acquirer;
pub mod compute;
/// Retry, wait and provider settings.
pub mod config;
/// Provisioning error types.
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
/// Request, subnet and handle types.
pub mod types;


pub use acquirer::InstanceAcquirer;
pub use compute::{AwsComputeOps, ComputeOps, LocalComputeOps};
pub use config::{
    ComputeProviderType, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_RETRY_DELAY_SECS, RetryPolicy, WaitPolicy,
};
pub use error::{ProvisionError, ProvisionResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockComputeOps, MockOutcome, MockPoll};
pub use types::{
    InstanceHandle, InstanceRequest, InstanceRequestBuilder, InstanceState, MarketOption,
    SubnetList, Tag,
};
