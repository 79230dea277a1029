use super::*;

fn params() -> BootParams {
    BootParams {
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        registration_token: "AABBCC".to_string(),
        label: "ec2-runner-1a2b3c4d".to_string(),
        pre_runner_script: "yum install -y git".to_string(),
    }
}

fn render(os: TargetOs, mode: &InstallMode) -> String {
    String::from_utf8(build_boot_script(os, mode, &params())).unwrap()
}

#[test]
fn test_target_os_parse() {
    assert_eq!("Linux".parse::<TargetOs>().unwrap(), TargetOs::Linux);
    assert_eq!("windows".parse::<TargetOs>().unwrap(), TargetOs::Windows);
    assert!("macos".parse::<TargetOs>().is_err());
}

#[test]
fn test_install_mode_from_home_dir() {
    assert_eq!(InstallMode::from_home_dir(None), InstallMode::Fresh);
    assert_eq!(InstallMode::from_home_dir(Some("  ")), InstallMode::Fresh);
    assert_eq!(
        InstallMode::from_home_dir(Some("/opt/runner")),
        InstallMode::Preinstalled {
            home_dir: "/opt/runner".to_string()
        }
    );
}

#[test]
fn test_linux_fresh() {
    let script = render(TargetOs::Linux, &InstallMode::Fresh);
    let lines: Vec<&str> = script.lines().collect();

    assert_eq!(lines[0], "#!/bin/bash");
    assert_eq!(lines[1], "mkdir actions-runner && cd actions-runner");
    assert_eq!(lines[2], "echo \"yum install -y git\" > pre-runner-script.sh");
    assert!(script.contains(&format!(
        "releases/download/v{RUNNER_VERSION}/actions-runner-linux-x64-{RUNNER_VERSION}.tar.gz"
    )));
    assert!(script.contains("export RUNNER_ALLOW_RUNASROOT=1"));
    assert!(script.contains(
        "./config.sh --url https://github.com/acme/widgets --token AABBCC --labels ec2-runner-1a2b3c4d"
    ));
    assert_eq!(lines.last(), Some(&"./run.sh"));
}

#[test]
fn test_linux_preinstalled_skips_download() {
    let mode = InstallMode::Preinstalled {
        home_dir: "/home/runner/actions-runner".to_string(),
    };
    let script = render(TargetOs::Linux, &mode);

    assert!(script.contains("cd \"/home/runner/actions-runner\""));
    assert!(!script.contains("curl"));
    assert!(!script.contains("mkdir"));
    assert!(script.contains("source pre-runner-script.sh"));
}

#[test]
fn test_windows_fresh() {
    let script = render(TargetOs::Windows, &InstallMode::Fresh);
    let lines: Vec<&str> = script.lines().collect();

    assert_eq!(lines[0], "<powershell>");
    assert_eq!(lines[1], "winrm quickconfig -q");
    assert!(script.contains("Invoke-WebRequest"));
    assert!(script.contains("ExtractToDirectory"));
    assert!(script.contains("--labels ec2-runner-1a2b3c4d --name ec2-runner-1a2b3c4d --unattended"));
    assert_eq!(lines[lines.len() - 2], "</powershell>");
    assert_eq!(lines[lines.len() - 1], "<persist>false</persist>");
}

#[test]
fn test_windows_preinstalled() {
    let mode = InstallMode::Preinstalled {
        home_dir: "C:\\actions-runner".to_string(),
    };
    let script = render(TargetOs::Windows, &mode);

    assert!(script.contains("cd \"C:\\actions-runner\""));
    assert!(script.contains("& pre-runner-script.ps1"));
    assert!(!script.contains("Invoke-WebRequest"));
    assert!(script.contains("./run.cmd"));
}
