use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{ProvisionError, ProvisionResult};

/// Key/value tag applied to the created instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Pricing/availability mode for the instance.
pub enum MarketOption {
    #[default]
    /// Guaranteed on-demand capacity.
    OnDemand,
    /// One-time spot request (interruptible, discounted).
    Spot,
}

impl std::str::FromStr for MarketOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "on-demand" | "ondemand" => Ok(Self::OnDemand),
            "spot" => Ok(Self::Spot),
            _ => Err(format!("Unknown market type: {}", s)),
        }
    }
}

/// Immutable description of the instance to create.
///
/// Built once per provisioning run with [`InstanceRequest::builder`]; the
/// acquirer only reads it, attaching a subnet per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    image_id: String,
    instance_type: String,
    security_group_id: Option<String>,
    iam_role_name: Option<String>,
    key_pair_name: Option<String>,
    tags: Vec<Tag>,
    boot_data: Vec<u8>,
    market: MarketOption,
}

impl InstanceRequest {
    /// Starts a request for `image_id` on `instance_type`.
    pub fn builder(
        image_id: impl Into<String>,
        instance_type: impl Into<String>,
    ) -> InstanceRequestBuilder {
        InstanceRequestBuilder {
            request: Self {
                image_id: image_id.into(),
                instance_type: instance_type.into(),
                security_group_id: None,
                iam_role_name: None,
                key_pair_name: None,
                tags: Vec::new(),
                boot_data: Vec::new(),
                market: MarketOption::default(),
            },
        }
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    pub fn security_group_id(&self) -> Option<&str> {
        self.security_group_id.as_deref()
    }

    pub fn iam_role_name(&self) -> Option<&str> {
        self.iam_role_name.as_deref()
    }

    pub fn key_pair_name(&self) -> Option<&str> {
        self.key_pair_name.as_deref()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Opaque startup payload executed by the instance on first boot.
    pub fn boot_data(&self) -> &[u8] {
        &self.boot_data
    }

    pub fn market(&self) -> MarketOption {
        self.market
    }

    /// Checks the fields the provider cannot do without.
    ///
    /// At least one tag is required so the instance stays discoverable.
    pub fn validate(&self) -> ProvisionResult<()> {
        if self.image_id.trim().is_empty() {
            return Err(ProvisionError::InvalidRequest(
                "image id must not be empty".to_string(),
            ));
        }
        if self.instance_type.trim().is_empty() {
            return Err(ProvisionError::InvalidRequest(
                "instance type must not be empty".to_string(),
            ));
        }
        if self.tags.is_empty() {
            return Err(ProvisionError::InvalidRequest(
                "at least one tag is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`InstanceRequest`].
#[derive(Debug, Clone)]
pub struct InstanceRequestBuilder {
    request: InstanceRequest,
}

impl InstanceRequestBuilder {
    pub fn security_group_id(mut self, id: impl Into<String>) -> Self {
        self.request.security_group_id = Some(id.into());
        self
    }

    pub fn iam_role_name(mut self, name: impl Into<String>) -> Self {
        self.request.iam_role_name = Some(name.into());
        self
    }

    pub fn key_pair_name(mut self, name: impl Into<String>) -> Self {
        self.request.key_pair_name = Some(name.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.tags.push(Tag::new(key, value));
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.request.tags.extend(tags);
        self
    }

    pub fn boot_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.request.boot_data = data.into();
        self
    }

    pub fn market(mut self, market: MarketOption) -> Self {
        self.request.market = market;
        self
    }

    pub fn build(self) -> InstanceRequest {
        self.request
    }
}

/// Ordered, non-empty ring of candidate subnet ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetList {
    ids: Vec<String>,
}

impl SubnetList {
    /// Builds a ring from `ids`, rejecting an empty list or blank entries.
    pub fn new<I, S>(ids: I) -> ProvisionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(ProvisionError::InvalidRequest(
                "subnet list must not be empty".to_string(),
            ));
        }
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ProvisionError::InvalidRequest(
                "subnet ids must not be blank".to_string(),
            ));
        }
        Ok(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the subnet at `index`, wrapping modulo the ring length.
    pub fn at(&self, index: usize) -> &str {
        &self.ids[index % self.ids.len()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Provider-assigned identifier of a created instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceHandle(String);

impl InstanceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    Unknown(String),
}

impl InstanceState {
    /// Parses an EC2 state name (`pending`, `running`, ...).
    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// `true` for states an instance never leaves to become running.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::ShuttingDown | Self::Terminated)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Unknown(name) => name,
        };
        f.write_str(name)
    }
}
