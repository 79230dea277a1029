use super::*;
use serial_test::serial;
use std::env;
use std::time::Duration;

const ALL_VARS: &[&str] = &[
    "EC2_RUNNER_MODE",
    "EC2_RUNNER_PROVIDER",
    "EC2_RUNNER_REGION",
    "GITHUB_REPOSITORY",
    "EC2_RUNNER_REGISTRATION_TOKEN",
    "EC2_RUNNER_LABEL",
    "EC2_RUNNER_IMAGE_ID",
    "EC2_RUNNER_INSTANCE_TYPE",
    "EC2_RUNNER_SUBNET_IDS",
    "EC2_RUNNER_SECURITY_GROUP_ID",
    "EC2_RUNNER_IAM_ROLE_NAME",
    "EC2_RUNNER_KEY_PAIR_NAME",
    "EC2_RUNNER_TAGS",
    "EC2_RUNNER_MARKET_TYPE",
    "EC2_RUNNER_OS",
    "EC2_RUNNER_HOME_DIR",
    "EC2_RUNNER_PRE_RUNNER_SCRIPT",
    "EC2_RUNNER_INSTANCE_ID",
    "EC2_RUNNER_MAX_ATTEMPTS",
    "EC2_RUNNER_RETRY_DELAY_SECS",
    "EC2_RUNNER_MAX_WAIT_SECS",
    "EC2_RUNNER_POLL_INTERVAL_SECS",
    "GITHUB_OUTPUT",
];

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_runner_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for key in ALL_VARS {
        unsafe { env::remove_var(key) };
    }
}

fn start_config() -> Config {
    Config {
        mode: Mode::Start,
        github_owner: "acme".to_string(),
        github_repo: "widgets".to_string(),
        registration_token: Some("token".to_string()),
        image_id: "ami-1".to_string(),
        instance_type: "t3.micro".to_string(),
        subnet_ids: vec!["subnet-a".to_string()],
        security_group_id: Some("sg-1".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.provider, ComputeProviderType::Aws);
    assert_eq!(config.market, MarketOption::OnDemand);
    assert_eq!(config.os, TargetOs::Linux);
    assert_eq!(config.max_attempts, 10);
    assert_eq!(config.retry_delay, Duration::from_secs(30));
    assert_eq!(config.max_wait, Duration::from_secs(30));
    assert_eq!(config.poll_interval, Duration::from_secs(3));
    assert!(config.subnet_ids.is_empty());
}

#[test]
#[serial]
fn test_from_env_requires_mode() {
    clear_runner_env();

    let err = Config::from_env().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MissingEnvVar {
            name: "EC2_RUNNER_MODE"
        }
    ));
}

#[test]
#[serial]
fn test_from_env_rejects_unknown_mode() {
    clear_runner_env();

    with_env_vars(&[("EC2_RUNNER_MODE", "restart")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("restart"));
    });
}

#[test]
#[serial]
fn test_from_env_start_mode() {
    clear_runner_env();

    with_env_vars(
        &[
            ("EC2_RUNNER_MODE", "start"),
            ("GITHUB_REPOSITORY", "acme/widgets"),
            ("EC2_RUNNER_REGISTRATION_TOKEN", "AABB"),
            ("EC2_RUNNER_IMAGE_ID", "ami-123"),
            ("EC2_RUNNER_INSTANCE_TYPE", "c5.xlarge"),
            ("EC2_RUNNER_SUBNET_IDS", "subnet-a, subnet-b,,subnet-c"),
            ("EC2_RUNNER_SECURITY_GROUP_ID", "sg-9"),
            ("EC2_RUNNER_MARKET_TYPE", "spot"),
            ("EC2_RUNNER_OS", "windows"),
            ("EC2_RUNNER_MAX_ATTEMPTS", "4"),
            ("EC2_RUNNER_RETRY_DELAY_SECS", "5"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            config.validate().expect("should validate");

            assert_eq!(config.mode, Mode::Start);
            assert_eq!(config.github_owner, "acme");
            assert_eq!(config.github_repo, "widgets");
            assert_eq!(
                config.subnet_ids,
                vec!["subnet-a", "subnet-b", "subnet-c"]
            );
            assert_eq!(config.market, MarketOption::Spot);
            assert_eq!(config.os, TargetOs::Windows);
            assert_eq!(config.retry_policy(), RetryPolicy::new(4, Duration::from_secs(5)));
            assert_eq!(config.subnet_list().unwrap().len(), 3);
        },
    );
}

#[test]
#[serial]
fn test_from_env_tags() {
    clear_runner_env();

    with_env_vars(
        &[
            ("EC2_RUNNER_MODE", "start"),
            (
                "EC2_RUNNER_TAGS",
                r#"[{"Key":"team","Value":"infra"},{"Key":"cost-center","Value":"42"}]"#,
            ),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert_eq!(
                config.tags,
                vec![Tag::new("team", "infra"), Tag::new("cost-center", "42")]
            );
        },
    );
}

#[test]
#[serial]
fn test_from_env_invalid_tags() {
    clear_runner_env();

    with_env_vars(
        &[("EC2_RUNNER_MODE", "start"), ("EC2_RUNNER_TAGS", "team=infra")],
        || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTags { .. }));
        },
    );
}

#[test]
#[serial]
fn test_from_env_invalid_repository() {
    clear_runner_env();

    with_env_vars(
        &[("EC2_RUNNER_MODE", "stop"), ("GITHUB_REPOSITORY", "widgets")],
        || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidRepository { .. }));
        },
    );
}

#[test]
#[serial]
fn test_from_env_invalid_number() {
    clear_runner_env();

    with_env_vars(
        &[
            ("EC2_RUNNER_MODE", "start"),
            ("EC2_RUNNER_RETRY_DELAY_SECS", "soon"),
        ],
        || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    name: "EC2_RUNNER_RETRY_DELAY_SECS",
                    ..
                }
            ));
        },
    );
}

#[test]
#[serial]
fn test_from_env_stop_mode() {
    clear_runner_env();

    with_env_vars(
        &[
            ("EC2_RUNNER_MODE", "stop"),
            ("EC2_RUNNER_INSTANCE_ID", "i-0abc"),
            ("EC2_RUNNER_PROVIDER", "local"),
            ("GITHUB_OUTPUT", "/tmp/out"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            config.validate().expect("stop needs only the instance id");
            assert_eq!(config.instance_id.as_deref(), Some("i-0abc"));
            assert_eq!(config.provider, ComputeProviderType::Local);
            assert_eq!(
                config.output_path,
                Some(std::path::PathBuf::from("/tmp/out"))
            );
        },
    );
}

#[test]
fn test_validate_start_requirements() {
    assert!(start_config().validate().is_ok());

    let config = Config {
        subnet_ids: Vec::new(),
        ..start_config()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingForMode {
            name: "EC2_RUNNER_SUBNET_IDS",
            mode: "start"
        })
    ));

    let config = Config {
        registration_token: None,
        ..start_config()
    };
    assert!(config.validate().is_err());

    let config = Config {
        max_attempts: 0,
        ..start_config()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_validate_stop_requires_instance_id() {
    let config = Config {
        mode: Mode::Stop,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingForMode {
            name: "EC2_RUNNER_INSTANCE_ID",
            mode: "stop"
        })
    ));
}

#[test]
fn test_instance_request_adds_name_tag() {
    let config = start_config();
    let request = config.instance_request("ec2-runner-1", b"#!/bin/bash".to_vec());

    assert_eq!(request.image_id(), "ami-1");
    assert_eq!(request.security_group_id(), Some("sg-1"));
    assert_eq!(request.tags(), &[Tag::new("Name", "ec2-runner-1")]);
    assert_eq!(request.boot_data(), b"#!/bin/bash");
    assert!(request.validate().is_ok());

    let config = Config {
        tags: vec![Tag::new("Name", "custom")],
        ..start_config()
    };
    let request = config.instance_request("ec2-runner-1", Vec::new());
    assert_eq!(request.tags(), &[Tag::new("Name", "custom")]);
}

#[test]
fn test_install_mode_and_boot_params() {
    let config = Config {
        runner_home_dir: Some("/opt/runner".to_string()),
        ..start_config()
    };
    assert!(matches!(
        config.install_mode(),
        InstallMode::Preinstalled { .. }
    ));
    assert_eq!(start_config().install_mode(), InstallMode::Fresh);

    let params = config.boot_params("lbl");
    assert_eq!(params.label, "lbl");
    assert_eq!(params.registration_token, "token");
    assert_eq!(params.repo_url(), "https://github.com/acme/widgets");
}
