//! `start`/`stop` flows: boot script → acquire → await running, and terminate.

pub mod error;


pub use error::{RunnerError, RunnerResult};

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::bootscript::build_boot_script;
use crate::config::{Config, Mode};
use crate::provision::{InstanceAcquirer, InstanceHandle};

/// Output name for the runner label.
pub const OUTPUT_LABEL: &str = "label";
/// Output name for the instance id.
pub const OUTPUT_INSTANCE_ID: &str = "ec2-instance-id";

/// What a successful `start` hands back to the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutputs {
    pub label: String,
    pub instance: InstanceHandle,
}

/// Returns a fresh label of the form `ec2-runner-<8 hex chars>`.
pub fn generate_label() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("ec2-runner-{}", &id[..8])
}

/// Starts a runner instance, publishes its outputs, then waits until it is running.
///
/// Outputs go to `config.output_path` as soon as the instance exists, so a later
/// `stop` can terminate it even when the wait fails.
pub async fn start(config: &Config, acquirer: &InstanceAcquirer) -> RunnerResult<StartOutputs> {
    let label = config.label.clone().unwrap_or_else(generate_label);
    let boot_data = build_boot_script(
        config.os,
        &config.install_mode(),
        &config.boot_params(&label),
    );
    let request = config.instance_request(&label, boot_data);
    let subnets = config.subnet_list()?;

    tracing::info!(
        %label,
        image_id = request.image_id(),
        instance_type = request.instance_type(),
        subnets = subnets.len(),
        "Starting runner instance"
    );

    let instance = acquirer
        .acquire(&request, &subnets, config.retry_policy())
        .await?;

    let outputs = StartOutputs { label, instance };
    if let Err(e) = write_outputs(config.output_path.as_deref(), &outputs).await {
        tracing::warn!(instance_id = %outputs.instance, error = %e, "Failed to publish outputs; stop the instance by id");
        return Err(e);
    }

    if let Err(e) = acquirer
        .await_running(&outputs.instance, config.wait_policy())
        .await
    {
        tracing::warn!(instance_id = %outputs.instance, "Instance did not reach running; stop it with this id");
        return Err(e.into());
    }

    Ok(outputs)
}

/// Terminates the configured instance.
pub async fn stop(config: &Config, acquirer: &InstanceAcquirer) -> RunnerResult<()> {
    let Some(id) = config.instance_id.as_deref() else {
        return Err(crate::config::ConfigError::MissingForMode {
            name: "EC2_RUNNER_INSTANCE_ID",
            mode: Mode::Stop.as_str(),
        }
        .into());
    };
    acquirer.terminate(&InstanceHandle::new(id)).await?;
    Ok(())
}

/// Appends `name=value` lines to `path`, or prints them when no path is set.
pub async fn write_outputs(path: Option<&Path>, outputs: &StartOutputs) -> RunnerResult<()> {
    let text = format!(
        "{OUTPUT_LABEL}={}\n{OUTPUT_INSTANCE_ID}={}\n",
        outputs.label, outputs.instance
    );

    match path {
        Some(path) => {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(text.as_bytes()).await?;
            file.flush().await?;
        }
        None => print!("{text}"),
    }
    Ok(())
}
