use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::compute::ComputeOps;
use super::error::{ProvisionError, ProvisionResult};
use super::types::{InstanceRequest, InstanceState};

/// Scripted result of one `create_instance` call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Created(Vec<String>),
    Fail(String),
}

impl MockOutcome {
    pub fn created(id: impl Into<String>) -> Self {
        Self::Created(vec![id.into()])
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// Scripted result of one `instance_state` call.
#[derive(Debug, Clone)]
pub enum MockPoll {
    State(InstanceState),
    Fail(String),
}

/// Records every provider call and replays scripted outcomes.
///
/// Creation calls without a scripted outcome fail; status polls without a
/// scripted result report `pending`.
#[derive(Default)]
pub struct MockComputeOps {
    create_outcomes: Mutex<VecDeque<MockOutcome>>,
    create_calls: Mutex<Vec<(String, Instant)>>,
    create_latency: Option<Duration>,
    terminate_failure: Option<String>,
    terminate_calls: Mutex<Vec<Vec<String>>>,
    polls: Mutex<VecDeque<MockPoll>>,
    poll_count: Mutex<usize>,
}

impl MockComputeOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every creation attempt fails.
    pub fn always_failing() -> Self {
        Self::new()
    }

    /// `failures` failing attempts followed by a success returning `id`.
    pub fn succeed_after(failures: usize, id: impl Into<String>) -> Self {
        let mut outcomes: Vec<MockOutcome> = (0..failures)
            .map(|n| MockOutcome::fail(format!("InsufficientInstanceCapacity (attempt {})", n + 1)))
            .collect();
        outcomes.push(MockOutcome::created(id));
        Self::new().with_create_outcomes(outcomes)
    }

    pub fn with_create_outcomes(self, outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        self.create_outcomes.lock().extend(outcomes);
        self
    }

    /// Every creation call takes `latency` before answering.
    pub fn with_create_latency(mut self, latency: Duration) -> Self {
        self.create_latency = Some(latency);
        self
    }

    pub fn with_terminate_failure(mut self, message: impl Into<String>) -> Self {
        self.terminate_failure = Some(message.into());
        self
    }

    pub fn with_polls(self, polls: impl IntoIterator<Item = MockPoll>) -> Self {
        self.polls.lock().extend(polls);
        self
    }

    /// Subnets used by each creation call, in call order.
    pub fn create_subnets(&self) -> Vec<String> {
        self.create_calls
            .lock()
            .iter()
            .map(|(subnet, _)| subnet.clone())
            .collect()
    }

    /// Instants at which each creation call started.
    pub fn create_times(&self) -> Vec<Instant> {
        self.create_calls.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.lock().len()
    }

    pub fn terminate_calls(&self) -> Vec<Vec<String>> {
        self.terminate_calls.lock().clone()
    }

    pub fn poll_count(&self) -> usize {
        *self.poll_count.lock()
    }
}

#[async_trait]
impl ComputeOps for MockComputeOps {
    async fn create_instance(
        &self,
        _request: &InstanceRequest,
        subnet: &str,
    ) -> ProvisionResult<Vec<String>> {
        self.create_calls
            .lock()
            .push((subnet.to_string(), Instant::now()));

        if let Some(latency) = self.create_latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self.create_outcomes.lock().pop_front();
        match outcome {
            Some(MockOutcome::Created(ids)) => Ok(ids),
            Some(MockOutcome::Fail(message)) => Err(ProvisionError::Cloud(message)),
            None => Err(ProvisionError::Cloud(
                "InsufficientInstanceCapacity".to_string(),
            )),
        }
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> ProvisionResult<()> {
        self.terminate_calls.lock().push(instance_ids.to_vec());
        match &self.terminate_failure {
            Some(message) => Err(ProvisionError::Cloud(message.clone())),
            None => Ok(()),
        }
    }

    async fn instance_state(&self, _instance_id: &str) -> ProvisionResult<InstanceState> {
        *self.poll_count.lock() += 1;
        let poll = self.polls.lock().pop_front();
        match poll {
            Some(MockPoll::State(state)) => Ok(state),
            Some(MockPoll::Fail(message)) => Err(ProvisionError::Cloud(message)),
            None => Ok(InstanceState::Pending),
        }
    }
}
