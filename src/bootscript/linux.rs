use super::{BootParams, BootScript, InstallMode, RUNNER_VERSION, join_lines};

/// Bash user data. Runs as root, hence `RUNNER_ALLOW_RUNASROOT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxBootScript;

impl BootScript for LinuxBootScript {
    fn build(&self, mode: &InstallMode, params: &BootParams) -> Vec<u8> {
        let mut lines = vec!["#!/bin/bash".to_string()];

        match mode {
            InstallMode::Preinstalled { home_dir } => {
                lines.push(format!("cd \"{home_dir}\""));
                push_pre_runner(&mut lines, params);
            }
            InstallMode::Fresh => {
                let archive = format!("actions-runner-linux-x64-{RUNNER_VERSION}.tar.gz");
                lines.push("mkdir actions-runner && cd actions-runner".to_string());
                push_pre_runner(&mut lines, params);
                lines.push(format!(
                    "curl -o {archive} -L https://github.com/actions/runner/releases/download/v{RUNNER_VERSION}/{archive}"
                ));
                lines.push(format!("tar xzf ./{archive}"));
            }
        }

        lines.push("export RUNNER_ALLOW_RUNASROOT=1".to_string());
        lines.push(format!(
            "./config.sh --url {} --token {} --labels {}",
            params.repo_url(),
            params.registration_token,
            params.label
        ));
        lines.push("./run.sh".to_string());

        join_lines(lines)
    }
}

fn push_pre_runner(lines: &mut Vec<String>, params: &BootParams) {
    lines.push(format!(
        "echo \"{}\" > pre-runner-script.sh",
        params.pre_runner_script
    ));
    lines.push("source pre-runner-script.sh".to_string());
}
