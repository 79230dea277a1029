//! `ec2-runner` entrypoint: `EC2_RUNNER_MODE=start|stop`.

use mimalloc::MiMalloc;
use tokio::signal;

use ec2_runner::config::{Config, Mode};
use ec2_runner::provision::InstanceAcquirer;
use ec2_runner::runner;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!(
        mode = config.mode.as_str(),
        provider = ?config.provider,
        region = config.region.as_deref().unwrap_or("default"),
        "ec2-runner starting"
    );

    let acquirer = InstanceAcquirer::for_provider(&config.provider, config.region.clone());

    let run = async {
        match config.mode {
            Mode::Start => {
                let outputs = runner::start(&config, &acquirer).await?;
                tracing::info!(
                    label = %outputs.label,
                    instance_id = %outputs.instance,
                    "Runner instance ready"
                );
            }
            Mode::Stop => runner::stop(&config, &acquirer).await?,
        }
        Ok::<(), runner::RunnerError>(())
    };

    tokio::select! {
        res = run => res?,
        _ = shutdown_signal() => {
            anyhow::bail!("interrupted before {} completed", config.mode.as_str());
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Received Ctrl+C, abandoning in-flight provider call");
        }
        _ = terminate => {
            tracing::warn!("Received SIGTERM, abandoning in-flight provider call");
        }
    }
}
