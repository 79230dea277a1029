//! Environment-backed configuration.
//!
//! Settings come from `EC2_RUNNER_*` variables plus the standard `GITHUB_REPOSITORY`
//! and `GITHUB_OUTPUT` variables of the Actions runtime. Most settings have defaults.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::bootscript::{BootParams, InstallMode, TargetOs};
use crate::provision::{
    ComputeProviderType, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_RETRY_DELAY_SECS, InstanceRequest, MarketOption, ProvisionResult, RetryPolicy,
    SubnetList, Tag, WaitPolicy,
};

/// What the binary does on this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Create an instance and register it as a runner.
    Start,
    /// Terminate a previously started instance.
    Stop,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            _ => Err("expected 'start' or 'stop'".to_string()),
        }
    }
}

/// Runner configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read overrides on top of defaults, then
/// [`Config::validate`] to check the settings the selected mode needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,

    /// Compute provider. Default: `aws`.
    pub provider: ComputeProviderType,

    /// Region passed to the provider. Default: the provider's own default.
    pub region: Option<String>,

    /// Repository owner the runner registers with.
    pub github_owner: String,

    /// Repository name the runner registers with.
    pub github_repo: String,

    /// Short-lived registration token embedded in the boot script.
    pub registration_token: Option<String>,

    /// Runner label. Generated when unset.
    pub label: Option<String>,

    pub image_id: String,
    pub instance_type: String,

    /// Candidate subnets, tried in order with wrap-around.
    pub subnet_ids: Vec<String>,

    pub security_group_id: Option<String>,
    pub iam_role_name: Option<String>,
    pub key_pair_name: Option<String>,

    /// Extra instance tags.
    pub tags: Vec<Tag>,

    /// Default: on-demand.
    pub market: MarketOption,

    /// Default: linux.
    pub os: TargetOs,

    /// Directory holding a pre-installed runner inside the image.
    pub runner_home_dir: Option<String>,

    pub pre_runner_script: String,

    /// Instance to terminate in `stop` mode.
    pub instance_id: Option<String>,

    /// Default: `10`.
    pub max_attempts: u32,

    /// Default: 30 seconds.
    pub retry_delay: Duration,

    /// Default: 30 seconds.
    pub max_wait: Duration,

    /// Default: 3 seconds.
    pub poll_interval: Duration,

    /// File the `start` outputs are appended to.
    pub output_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Start,
            provider: ComputeProviderType::default(),
            region: None,
            github_owner: String::new(),
            github_repo: String::new(),
            registration_token: None,
            label: None,
            image_id: String::new(),
            instance_type: String::new(),
            subnet_ids: Vec::new(),
            security_group_id: None,
            iam_role_name: None,
            key_pair_name: None,
            tags: Vec::new(),
            market: MarketOption::default(),
            os: TargetOs::default(),
            runner_home_dir: None,
            pre_runner_script: String::new(),
            instance_id: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            output_path: None,
        }
    }
}

impl Config {
    const ENV_MODE: &'static str = "EC2_RUNNER_MODE";
    const ENV_PROVIDER: &'static str = "EC2_RUNNER_PROVIDER";
    const ENV_REGION: &'static str = "EC2_RUNNER_REGION";
    const ENV_REPOSITORY: &'static str = "GITHUB_REPOSITORY";
    const ENV_REGISTRATION_TOKEN: &'static str = "EC2_RUNNER_REGISTRATION_TOKEN";
    const ENV_LABEL: &'static str = "EC2_RUNNER_LABEL";
    const ENV_IMAGE_ID: &'static str = "EC2_RUNNER_IMAGE_ID";
    const ENV_INSTANCE_TYPE: &'static str = "EC2_RUNNER_INSTANCE_TYPE";
    const ENV_SUBNET_IDS: &'static str = "EC2_RUNNER_SUBNET_IDS";
    const ENV_SECURITY_GROUP_ID: &'static str = "EC2_RUNNER_SECURITY_GROUP_ID";
    const ENV_IAM_ROLE_NAME: &'static str = "EC2_RUNNER_IAM_ROLE_NAME";
    const ENV_KEY_PAIR_NAME: &'static str = "EC2_RUNNER_KEY_PAIR_NAME";
    const ENV_TAGS: &'static str = "EC2_RUNNER_TAGS";
    const ENV_MARKET_TYPE: &'static str = "EC2_RUNNER_MARKET_TYPE";
    const ENV_OS: &'static str = "EC2_RUNNER_OS";
    const ENV_RUNNER_HOME_DIR: &'static str = "EC2_RUNNER_HOME_DIR";
    const ENV_PRE_RUNNER_SCRIPT: &'static str = "EC2_RUNNER_PRE_RUNNER_SCRIPT";
    const ENV_INSTANCE_ID: &'static str = "EC2_RUNNER_INSTANCE_ID";
    const ENV_MAX_ATTEMPTS: &'static str = "EC2_RUNNER_MAX_ATTEMPTS";
    const ENV_RETRY_DELAY_SECS: &'static str = "EC2_RUNNER_RETRY_DELAY_SECS";
    const ENV_MAX_WAIT_SECS: &'static str = "EC2_RUNNER_MAX_WAIT_SECS";
    const ENV_POLL_INTERVAL_SECS: &'static str = "EC2_RUNNER_POLL_INTERVAL_SECS";
    const ENV_OUTPUT: &'static str = "GITHUB_OUTPUT";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mode: Mode = Self::parse_required_from_env(Self::ENV_MODE)?;
        let provider =
            Self::parse_optional_from_env(Self::ENV_PROVIDER)?.unwrap_or(defaults.provider);
        let (github_owner, github_repo) = match Self::parse_optional_string(Self::ENV_REPOSITORY)
        {
            Some(value) => Self::split_repository(&value)?,
            None => (defaults.github_owner, defaults.github_repo),
        };
        let market =
            Self::parse_optional_from_env(Self::ENV_MARKET_TYPE)?.unwrap_or(defaults.market);
        let os = Self::parse_optional_from_env(Self::ENV_OS)?.unwrap_or(defaults.os);

        let max_attempts =
            Self::parse_optional_from_env(Self::ENV_MAX_ATTEMPTS)?.unwrap_or(defaults.max_attempts);
        let retry_delay = Self::parse_secs_from_env(Self::ENV_RETRY_DELAY_SECS, defaults.retry_delay)?;
        let max_wait = Self::parse_secs_from_env(Self::ENV_MAX_WAIT_SECS, defaults.max_wait)?;
        let poll_interval =
            Self::parse_secs_from_env(Self::ENV_POLL_INTERVAL_SECS, defaults.poll_interval)?;

        Ok(Self {
            mode,
            provider,
            region: Self::parse_optional_string(Self::ENV_REGION),
            github_owner,
            github_repo,
            registration_token: Self::parse_optional_string(Self::ENV_REGISTRATION_TOKEN),
            label: Self::parse_optional_string(Self::ENV_LABEL),
            image_id: Self::parse_optional_string(Self::ENV_IMAGE_ID).unwrap_or_default(),
            instance_type: Self::parse_optional_string(Self::ENV_INSTANCE_TYPE).unwrap_or_default(),
            subnet_ids: Self::parse_list_from_env(Self::ENV_SUBNET_IDS),
            security_group_id: Self::parse_optional_string(Self::ENV_SECURITY_GROUP_ID),
            iam_role_name: Self::parse_optional_string(Self::ENV_IAM_ROLE_NAME),
            key_pair_name: Self::parse_optional_string(Self::ENV_KEY_PAIR_NAME),
            tags: Self::parse_tags_from_env(Self::ENV_TAGS)?,
            market,
            os,
            runner_home_dir: Self::parse_optional_string(Self::ENV_RUNNER_HOME_DIR),
            pre_runner_script: env::var(Self::ENV_PRE_RUNNER_SCRIPT).unwrap_or_default(),
            instance_id: Self::parse_optional_string(Self::ENV_INSTANCE_ID),
            max_attempts,
            retry_delay,
            max_wait,
            poll_interval,
            output_path: Self::parse_optional_string(Self::ENV_OUTPUT).map(PathBuf::from),
        })
    }

    /// Checks that the settings the selected mode needs are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_MAX_ATTEMPTS,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_POLL_INTERVAL_SECS,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        match self.mode {
            Mode::Start => {
                self.require(!self.image_id.is_empty(), Self::ENV_IMAGE_ID)?;
                self.require(!self.instance_type.is_empty(), Self::ENV_INSTANCE_TYPE)?;
                self.require(!self.subnet_ids.is_empty(), Self::ENV_SUBNET_IDS)?;
                self.require(
                    self.security_group_id.is_some(),
                    Self::ENV_SECURITY_GROUP_ID,
                )?;
                self.require(
                    self.registration_token.is_some(),
                    Self::ENV_REGISTRATION_TOKEN,
                )?;
                self.require(!self.github_owner.is_empty(), Self::ENV_REPOSITORY)?;
            }
            Mode::Stop => {
                self.require(self.instance_id.is_some(), Self::ENV_INSTANCE_ID)?;
            }
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(self.max_wait, self.poll_interval)
    }

    pub fn subnet_list(&self) -> ProvisionResult<SubnetList> {
        SubnetList::new(self.subnet_ids.iter().cloned())
    }

    pub fn install_mode(&self) -> InstallMode {
        InstallMode::from_home_dir(self.runner_home_dir.as_deref())
    }

    pub fn boot_params(&self, label: &str) -> BootParams {
        BootParams {
            owner: self.github_owner.clone(),
            repo: self.github_repo.clone(),
            registration_token: self.registration_token.clone().unwrap_or_default(),
            label: label.to_string(),
            pre_runner_script: self.pre_runner_script.clone(),
        }
    }

    /// Builds the immutable request for one `start` run.
    ///
    /// A `Name` tag carrying the label is added unless one is configured.
    pub fn instance_request(&self, label: &str, boot_data: Vec<u8>) -> InstanceRequest {
        let mut tags = self.tags.clone();
        if !tags.iter().any(|tag| tag.key == "Name") {
            tags.push(Tag::new("Name", label));
        }

        let mut builder = InstanceRequest::builder(&self.image_id, &self.instance_type)
            .tags(tags)
            .boot_data(boot_data)
            .market(self.market);
        if let Some(group) = &self.security_group_id {
            builder = builder.security_group_id(group);
        }
        if let Some(role) = &self.iam_role_name {
            builder = builder.iam_role_name(role);
        }
        if let Some(key) = &self.key_pair_name {
            builder = builder.key_pair_name(key);
        }
        builder.build()
    }

    fn require(&self, present: bool, name: &'static str) -> Result<(), ConfigError> {
        if present {
            Ok(())
        } else {
            Err(ConfigError::MissingForMode {
                name,
                mode: self.mode.as_str(),
            })
        }
    }

    fn split_repository(value: &str) -> Result<(String, String), ConfigError> {
        match value.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
                Ok((owner.to_string(), repo.to_string()))
            }
            _ => Err(ConfigError::InvalidRepository {
                value: value.to_string(),
            }),
        }
    }

    fn parse_optional_string(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_required_from_env<T>(var_name: &'static str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        Self::parse_optional_from_env(var_name)?
            .ok_or(ConfigError::MissingEnvVar { name: var_name })
    }

    fn parse_optional_from_env<T>(var_name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::parse_optional_string(var_name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    name: var_name,
                    reason: e.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    }

    fn parse_secs_from_env(var_name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        Ok(Self::parse_optional_from_env::<u64>(var_name)?
            .map(Duration::from_secs)
            .unwrap_or(default))
    }

    fn parse_list_from_env(var_name: &str) -> Vec<String> {
        Self::parse_optional_string(var_name)
            .map(|v| {
                v.split([',', ' ', '\n'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse_tags_from_env(var_name: &'static str) -> Result<Vec<Tag>, ConfigError> {
        match Self::parse_optional_string(var_name) {
            Some(value) => serde_json::from_str(&value)
                .map_err(|source| ConfigError::InvalidTags { name: var_name, source }),
            None => Ok(Vec::new()),
        }
    }
}
