//! First-boot scripts that install, register and start the runner.
//!
//! One [`BootScript`] per target OS. The output is the opaque user-data payload
//! attached to an [`InstanceRequest`](crate::provision::InstanceRequest).

pub mod linux;
pub mod windows;

#[cfg(test)]
mod tests;

pub use linux::LinuxBootScript;
pub use windows::WindowsBootScript;

/// Runner release installed when the image does not ship one.
pub const RUNNER_VERSION: &str = "2.311.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Operating system of the runner image.
pub enum TargetOs {
    #[default]
    Linux,
    Windows,
}

impl std::str::FromStr for TargetOs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            _ => Err(format!("Unsupported OS: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Whether the runner software ships with the image.
pub enum InstallMode {
    /// The image already has the runner unpacked in `home_dir`.
    Preinstalled { home_dir: String },
    /// Download and unpack [`RUNNER_VERSION`] on boot.
    Fresh,
}

impl InstallMode {
    /// `Preinstalled` when a non-blank home directory is given, `Fresh` otherwise.
    pub fn from_home_dir(home_dir: Option<&str>) -> Self {
        match home_dir.map(str::trim).filter(|dir| !dir.is_empty()) {
            Some(dir) => Self::Preinstalled {
                home_dir: dir.to_string(),
            },
            None => Self::Fresh,
        }
    }
}

/// Values substituted into the boot script.
#[derive(Debug, Clone, Default)]
pub struct BootParams {
    pub owner: String,
    pub repo: String,
    pub registration_token: String,
    pub label: String,
    /// Commands run before the runner is configured.
    pub pre_runner_script: String,
}

impl BootParams {
    /// Repository URL the runner registers against.
    pub fn repo_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

/// Builds the user-data payload for one target OS.
pub trait BootScript: Send + Sync {
    fn build(&self, mode: &InstallMode, params: &BootParams) -> Vec<u8>;
}

/// Returns the script strategy for `os`.
pub fn script_for(os: TargetOs) -> Box<dyn BootScript> {
    match os {
        TargetOs::Linux => Box::new(LinuxBootScript),
        TargetOs::Windows => Box::new(WindowsBootScript),
    }
}

/// Builds the boot script for `os`.
pub fn build_boot_script(os: TargetOs, mode: &InstallMode, params: &BootParams) -> Vec<u8> {
    tracing::info!(?os, fresh = matches!(mode, InstallMode::Fresh), "Building boot script");
    script_for(os).build(mode, params)
}

pub(crate) fn join_lines(lines: Vec<String>) -> Vec<u8> {
    lines.join("\n").into_bytes()
}
