use super::{BootParams, BootScript, InstallMode, RUNNER_VERSION, join_lines};

/// PowerShell user data. The runner is named after its label so machine
/// names never collide on the CI side.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsBootScript;

const WINRM_SETUP: [&str; 4] = [
    "winrm quickconfig -q",
    "winrm set winrm/config/service/Auth '@{Basic=\"true\"}'",
    "winrm set winrm/config/service '@{AllowUnencrypted=\"true\"}'",
    "winrm set winrm/config/winrs '@{MaxMemoryPerShellMB=\"0\"}'",
];

impl BootScript for WindowsBootScript {
    fn build(&self, mode: &InstallMode, params: &BootParams) -> Vec<u8> {
        let mut lines = vec!["<powershell>".to_string()];
        lines.extend(WINRM_SETUP.iter().map(|line| line.to_string()));

        match mode {
            InstallMode::Preinstalled { home_dir } => {
                lines.push(format!("cd \"{home_dir}\""));
                push_pre_runner(&mut lines, params);
            }
            InstallMode::Fresh => {
                let archive = format!("actions-runner-win-x64-{RUNNER_VERSION}.zip");
                lines.push("mkdir actions-runner; cd actions-runner".to_string());
                push_pre_runner(&mut lines, params);
                lines.push(format!(
                    "Invoke-WebRequest -Uri https://github.com/actions/runner/releases/download/v{RUNNER_VERSION}/{archive} -OutFile {archive}"
                ));
                lines.push(format!(
                    "Add-Type -AssemblyName System.IO.Compression.FileSystem ; [System.IO.Compression.ZipFile]::ExtractToDirectory(\"$PWD/{archive}\", \"$PWD\")"
                ));
            }
        }

        lines.push(format!(
            "./config.cmd --url {} --token {} --labels {label} --name {label} --unattended",
            params.repo_url(),
            params.registration_token,
            label = params.label
        ));
        lines.push("./run.cmd".to_string());
        lines.push("</powershell>".to_string());
        lines.push("<persist>false</persist>".to_string());

        join_lines(lines)
    }
}

fn push_pre_runner(lines: &mut Vec<String>, params: &BootParams) {
    lines.push(format!(
        "echo \"{}\" > pre-runner-script.ps1",
        params.pre_runner_script
    ));
    lines.push("& pre-runner-script.ps1".to_string());
}
