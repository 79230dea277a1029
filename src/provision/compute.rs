//! Compute provider operations used by instance acquisition.
//!
//! `AwsComputeOps` shells out to the `aws` CLI. `LocalComputeOps` is an in-process simulation.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::process::Command;

use super::error::{ProvisionError, ProvisionResult};
use super::types::{InstanceRequest, InstanceState, MarketOption};

const CMD_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
/// Provider operations required to create, observe and destroy instances.
pub trait ComputeOps: Send + Sync {
    /// Submits one creation request for `request` placed in `subnet`.
    ///
    /// Returns the ids of the instances the provider created. The request
    /// always caps the count at one.
    async fn create_instance(
        &self,
        request: &InstanceRequest,
        subnet: &str,
    ) -> ProvisionResult<Vec<String>>;
    /// Requests destruction of the given instances.
    async fn terminate_instances(&self, instance_ids: &[String]) -> ProvisionResult<()>;
    /// Returns the current state of one instance.
    async fn instance_state(&self, instance_id: &str) -> ProvisionResult<InstanceState>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunInstancesOutput {
    #[serde(default)]
    instances: Vec<InstanceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesOutput {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<InstanceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceDescription {
    instance_id: String,
    state: Option<StateDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StateDescription {
    name: String,
}

/// Amazon EC2 implementation backed by the `aws` CLI.
pub struct AwsComputeOps {
    aws_path: PathBuf,
    region: Option<String>,
    timeout: Duration,
}

impl AwsComputeOps {
    /// Creates a new EC2 implementation using `aws` from `PATH`.
    pub fn new(region: Option<String>) -> Self {
        Self {
            aws_path: PathBuf::from("aws"),
            region,
            timeout: CMD_TIMEOUT,
        }
    }

    /// Uses the CLI at `aws_path` and kills any call running longer than `timeout`.
    pub fn with_cli(mut self, aws_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        self.aws_path = aws_path.into();
        self.timeout = timeout;
        self
    }

    fn base_args(&self, subcommand: &str) -> Vec<String> {
        let mut args = vec!["ec2".to_string(), subcommand.to_string()];
        if let Some(region) = &self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args.push("--output".to_string());
        args.push("json".to_string());
        args
    }

    async fn run_command(&self, args: Vec<String>, label: &str) -> ProvisionResult<Vec<u8>> {
        let mut cmd = Command::new(&self.aws_path);
        cmd.args(&args)
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| ProvisionError::Cloud(format!("Failed to spawn {label}: {e}")))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => {
                res.map_err(|e| ProvisionError::Cloud(format!("Failed waiting for {label}: {e}")))?
            }
            Err(_) => {
                return Err(ProvisionError::CommandTimedOut {
                    command: label.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(ProvisionError::Cloud(format!("{label} failed: {stderr}")))
    }

    pub(super) fn run_instances_args(
        &self,
        request: &InstanceRequest,
        subnet: &str,
        user_data_path: &str,
    ) -> Vec<String> {
        let mut args = self.base_args("run-instances");
        args.extend([
            "--image-id".to_string(),
            request.image_id().to_string(),
            "--instance-type".to_string(),
            request.instance_type().to_string(),
            "--count".to_string(),
            "1".to_string(),
            "--subnet-id".to_string(),
            subnet.to_string(),
            "--user-data".to_string(),
            format!("file://{user_data_path}"),
        ]);

        if let Some(group) = request.security_group_id() {
            args.push("--security-group-ids".to_string());
            args.push(group.to_string());
        }
        if let Some(role) = request.iam_role_name() {
            args.push("--iam-instance-profile".to_string());
            args.push(format!("Name={role}"));
        }
        if let Some(key) = request.key_pair_name() {
            args.push("--key-name".to_string());
            args.push(key.to_string());
        }

        let tag_specs = serde_json::json!([
            { "ResourceType": "instance", "Tags": request.tags() }
        ]);
        args.push("--tag-specifications".to_string());
        args.push(tag_specs.to_string());

        if request.market() == MarketOption::Spot {
            let market = serde_json::json!({
                "MarketType": "spot",
                "SpotOptions": { "SpotInstanceType": "one-time" }
            });
            args.push("--instance-market-options".to_string());
            args.push(market.to_string());
        }

        args
    }
}

impl Default for AwsComputeOps {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ComputeOps for AwsComputeOps {
    async fn create_instance(
        &self,
        request: &InstanceRequest,
        subnet: &str,
    ) -> ProvisionResult<Vec<String>> {
        // The CLI base64-encodes file:// user data itself.
        let mut user_data = tempfile::Builder::new()
            .prefix("ec2-runner-user-data")
            .tempfile()?;
        user_data.write_all(request.boot_data())?;
        user_data.flush()?;
        let user_data_path = user_data.path().to_string_lossy().to_string();

        let args = self.run_instances_args(request, subnet, &user_data_path);
        let stdout = match self.run_command(args, "aws ec2 run-instances").await {
            Ok(stdout) => stdout,
            Err(e @ ProvisionError::CommandTimedOut { .. }) => {
                tracing::warn!(
                    subnet,
                    error = %e,
                    "run-instances was killed before answering; an instance may be orphaned"
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_slice::<RunInstancesOutput>(&stdout) {
            Ok(output) => Ok(output
                .instances
                .into_iter()
                .map(|instance| instance.instance_id)
                .collect()),
            Err(e) => {
                tracing::warn!(
                    subnet,
                    error = %e,
                    "run-instances succeeded but its output could not be read; an instance may be orphaned"
                );
                Err(ProvisionError::Cloud(format!(
                    "Failed to decode run-instances output: {e}"
                )))
            }
        }
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> ProvisionResult<()> {
        let mut args = self.base_args("terminate-instances");
        args.push("--instance-ids".to_string());
        args.extend(instance_ids.iter().cloned());
        self.run_command(args, "aws ec2 terminate-instances")
            .await
            .map(|_| ())
    }

    async fn instance_state(&self, instance_id: &str) -> ProvisionResult<InstanceState> {
        let mut args = self.base_args("describe-instances");
        args.push("--instance-ids".to_string());
        args.push(instance_id.to_string());
        let stdout = self
            .run_command(args, "aws ec2 describe-instances")
            .await?;

        let output: DescribeInstancesOutput = serde_json::from_slice(&stdout).map_err(|e| {
            ProvisionError::Cloud(format!("Failed to decode describe-instances output: {e}"))
        })?;

        output
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .find(|i| i.instance_id == instance_id)
            .and_then(|i| i.state)
            .map(|s| InstanceState::from_name(&s.name))
            .ok_or_else(|| ProvisionError::Cloud(format!("Instance {instance_id} not found")))
    }
}

/// In-process simulation of [`ComputeOps`].
///
/// Instances start `pending` and report `running` from the first status poll on.
pub struct LocalComputeOps {
    instances: Mutex<HashMap<String, InstanceState>>,
}

impl LocalComputeOps {
    /// Creates a new local implementation.
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for LocalComputeOps {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComputeOps for LocalComputeOps {
    async fn create_instance(
        &self,
        request: &InstanceRequest,
        subnet: &str,
    ) -> ProvisionResult<Vec<String>> {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("i-{}", &simple[..17]);
        self.instances
            .lock()
            .insert(id.clone(), InstanceState::Pending);
        tracing::info!(
            instance_id = %id,
            subnet,
            image_id = request.image_id(),
            instance_type = request.instance_type(),
            "LocalComputeOps: instance created (simulated)"
        );
        Ok(vec![id])
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> ProvisionResult<()> {
        let mut instances = self.instances.lock();
        for id in instance_ids {
            match instances.get_mut(id) {
                Some(state) => *state = InstanceState::Terminated,
                None => {
                    return Err(ProvisionError::Cloud(format!(
                        "Local instance not found: {id}"
                    )));
                }
            }
        }
        tracing::info!(?instance_ids, "LocalComputeOps: termination requested (simulated)");
        Ok(())
    }

    async fn instance_state(&self, instance_id: &str) -> ProvisionResult<InstanceState> {
        let mut instances = self.instances.lock();
        let state = instances
            .get_mut(instance_id)
            .ok_or_else(|| ProvisionError::Cloud(format!("Local instance not found: {instance_id}")))?;
        if *state == InstanceState::Pending {
            *state = InstanceState::Running;
        }
        Ok(state.clone())
    }
}
