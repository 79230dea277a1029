//! Shared fixtures for acquisition integration tests.

#![allow(dead_code)]

use std::time::Duration;

use ec2_runner::{InstanceRequest, RetryPolicy, SubnetList};

pub const DELAY: Duration = Duration::from_secs(30);

pub fn runner_request() -> InstanceRequest {
    InstanceRequest::builder("ami-0123456789abcdef0", "c5.2xlarge")
        .security_group_id("sg-0runner")
        .iam_role_name("ci-runner")
        .key_pair_name("ci")
        .tag("Name", "ec2-runner-test")
        .boot_data(b"#!/bin/bash\n./run.sh".to_vec())
        .build()
}

pub fn subnets(ids: &[&str]) -> SubnetList {
    SubnetList::new(ids.iter().copied()).expect("non-empty subnet list")
}

pub fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, DELAY)
}
