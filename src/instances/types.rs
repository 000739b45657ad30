use crate::error::HubError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Instance role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    /// Primary instance, always first in iteration order
    Hub,
    Bridge,
    /// Development-linked instance, runs in the foreground from a project checkout
    Dev,
}

impl InstanceKind {
    /// Kinds that get a host service unit
    pub fn is_serviced(self) -> bool {
        matches!(self, Self::Hub | Self::Bridge)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hub => "hub",
            Self::Bridge => "bridge",
            Self::Dev => "dev",
        }
    }
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceKind {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hub" => Ok(Self::Hub),
            "bridge" => Ok(Self::Bridge),
            "dev" => Ok(Self::Dev),
            other => Err(HubError::Validation(format!(
                "Unknown instance kind '{}'. Valid: hub, bridge, dev",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InstanceKind,
    pub display_name: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub autostart_delay_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertiser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_project_path: Option<PathBuf>,
    /// Name of the host service unit launching this instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_unit_ref: Option<String>,
}

impl InstanceRecord {
    pub fn new(id: impl Into<String>, kind: InstanceKind, display_name: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            kind,
            display_name: display_name.into(),
            port,
            pin: None,
            username: None,
            autostart_delay_seconds: 0,
            advertiser: None,
            dev_project_path: None,
            service_unit_ref: None,
        }
    }
}

/// One row of `list()`: the record plus host facts gathered at listing time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    #[serde(flatten)]
    pub record: InstanceRecord,
    pub address: Option<String>,
    pub service_unit: Option<String>,
}
