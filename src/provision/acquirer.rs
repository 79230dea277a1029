use std::sync::Arc;

use tokio::time::{self, Instant};

use super::compute::{AwsComputeOps, ComputeOps, LocalComputeOps};
use super::config::{ComputeProviderType, RetryPolicy, WaitPolicy};
use super::error::{ProvisionError, ProvisionResult};
use super::types::{InstanceHandle, InstanceRequest, InstanceState, SubnetList};

/// Loop state for one `acquire` call. Never outlives it.
struct AcquisitionAttempt<'a> {
    subnets: &'a SubnetList,
    subnet_index: usize,
    attempts: u32,
    policy: RetryPolicy,
}

impl<'a> AcquisitionAttempt<'a> {
    fn new(subnets: &'a SubnetList, policy: RetryPolicy) -> Self {
        Self {
            subnets,
            subnet_index: 0,
            attempts: 0,
            policy,
        }
    }

    fn subnet(&self) -> &'a str {
        self.subnets.at(self.subnet_index)
    }

    /// Counts a failed attempt. Returns `true` once the budget is spent.
    fn record_failure(&mut self) -> bool {
        self.attempts += 1;
        self.attempts >= self.policy.max_attempts
    }

    fn rotate(&mut self) {
        self.subnet_index = (self.subnet_index + 1) % self.subnets.len();
    }
}

/// Creates, awaits and terminates single runner instances.
///
/// Creation retries across a ring of subnets with a constant pause between
/// attempts. Dropping the `acquire` future (for example through
/// [`tokio::time::timeout`]) abandons the in-flight call and issues no
/// further attempts.
pub struct InstanceAcquirer {
    ops: Arc<dyn ComputeOps>,
}

impl InstanceAcquirer {
    /// Creates an acquirer over an explicit [`ComputeOps`] implementation.
    pub fn new(ops: Arc<dyn ComputeOps>) -> Self {
        Self { ops }
    }

    /// Creates an acquirer for the selected provider.
    pub fn for_provider(provider: &ComputeProviderType, region: Option<String>) -> Self {
        let ops: Arc<dyn ComputeOps> = match provider {
            ComputeProviderType::Aws => Arc::new(AwsComputeOps::new(region)),
            ComputeProviderType::Local => Arc::new(LocalComputeOps::new()),
        };
        Self::new(ops)
    }

    /// Creates exactly one instance, rotating forward through `subnets` on failure.
    ///
    /// Attempt `k` (0-based) uses `subnets[k mod len]`. After `policy.max_attempts`
    /// failures the last attempt's error is returned inside
    /// [`ProvisionError::AcquisitionExhausted`]; earlier failures are only logged.
    pub async fn acquire(
        &self,
        request: &InstanceRequest,
        subnets: &SubnetList,
        policy: RetryPolicy,
    ) -> ProvisionResult<InstanceHandle> {
        request.validate()?;
        policy.validate()?;

        let mut attempt = AcquisitionAttempt::new(subnets, policy);
        loop {
            let subnet = attempt.subnet();
            let cause = match self.create_one(request, subnet).await {
                Ok(handle) => {
                    tracing::info!(
                        instance_id = %handle,
                        subnet,
                        attempt = attempt.attempts + 1,
                        "EC2 instance started"
                    );
                    return Ok(handle);
                }
                Err(e) => e,
            };

            let error = ProvisionError::Creation {
                subnet: subnet.to_string(),
                source: Box::new(cause),
            };
            tracing::error!(
                subnet,
                attempt = attempt.attempts + 1,
                error = %error,
                "EC2 instance start failed"
            );

            if attempt.record_failure() {
                return Err(ProvisionError::AcquisitionExhausted {
                    attempts: attempt.attempts,
                    source: Box::new(error),
                });
            }

            attempt.rotate();
            tracing::warn!(
                attempt = attempt.attempts,
                next_subnet = attempt.subnet(),
                delay = ?attempt.policy.delay,
                "Retrying instance creation"
            );
            time::sleep(attempt.policy.delay).await;
        }
    }

    async fn create_one(
        &self,
        request: &InstanceRequest,
        subnet: &str,
    ) -> ProvisionResult<InstanceHandle> {
        let mut ids = self.ops.create_instance(request, subnet).await?;
        match ids.len() {
            0 => {
                tracing::warn!(
                    subnet,
                    "Provider accepted the request but returned no instance id; an instance may be orphaned"
                );
                Err(ProvisionError::NoInstanceReturned {
                    subnet: subnet.to_string(),
                })
            }
            1 => Ok(InstanceHandle::new(ids.remove(0))),
            _ => {
                let extra = ids.split_off(1);
                tracing::warn!(
                    subnet,
                    ?extra,
                    "Provider created more than one instance; extra instances are not tracked"
                );
                Ok(InstanceHandle::new(ids.remove(0)))
            }
        }
    }

    /// Requests termination of `handle`. Single attempt; failures are surfaced, never retried.
    pub async fn terminate(&self, handle: &InstanceHandle) -> ProvisionResult<()> {
        let ids = [handle.id().to_string()];
        match self.ops.terminate_instances(&ids).await {
            Ok(()) => {
                tracing::info!(instance_id = %handle, "EC2 instance terminated");
                Ok(())
            }
            Err(e) => {
                tracing::error!(instance_id = %handle, error = %e, "EC2 instance termination failed");
                Err(ProvisionError::Termination {
                    instance_id: handle.id().to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Polls until `handle` reports `running`, bounded by `wait.max_wait`.
    pub async fn await_running(
        &self,
        handle: &InstanceHandle,
        wait: WaitPolicy,
    ) -> ProvisionResult<()> {
        wait.validate()?;

        let started = Instant::now();
        let deadline = started + wait.max_wait;

        loop {
            let polled = time::timeout_at(deadline, self.ops.instance_state(handle.id())).await;
            match polled {
                Ok(Ok(InstanceState::Running)) => {
                    tracing::info!(instance_id = %handle, "EC2 instance is up and running");
                    return Ok(());
                }
                Ok(Ok(state)) if state.is_gone() => {
                    tracing::error!(instance_id = %handle, %state, "EC2 instance initialization error");
                    return Err(ProvisionError::UnexpectedState {
                        instance_id: handle.id().to_string(),
                        state,
                    });
                }
                Ok(Ok(state)) => {
                    tracing::debug!(instance_id = %handle, %state, "Waiting for instance");
                }
                Ok(Err(e)) => {
                    tracing::warn!(instance_id = %handle, error = %e, "Instance status poll failed");
                }
                Err(_) => break,
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            time::sleep(wait.poll_interval.min(deadline - now)).await;
        }

        let waited = started.elapsed();
        tracing::error!(instance_id = %handle, ?waited, "EC2 instance initialization timed out");
        Err(ProvisionError::Timeout {
            instance_id: handle.id().to_string(),
            waited,
        })
    }
}
