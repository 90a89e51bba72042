//! Endpoint and device value types reported by discovery

use serde::{Deserialize, Serialize};

/// A connection endpoint through which a device communicates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Transport protocol (e.g., "serial", "network")
    pub protocol: String,
    /// Protocol-specific address (e.g., "/dev/ttyACM0")
    pub address: String,
}

impl Endpoint {
    pub fn new(protocol: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            address: address.into(),
        }
    }

    /// Shorthand for a serial endpoint
    pub fn serial(address: impl Into<String>) -> Self {
        Self::new("serial", address)
    }

    /// Check whether both sides name the same endpoint.
    ///
    /// Absent endpoints never match anything, including each other.
    pub fn same_as(left: Option<&Endpoint>, right: Option<&Endpoint>) -> bool {
        match (left, right) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.protocol, self.address)
    }
}

/// A hardware unit, optionally identified by the catalog and bound to an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Catalog type identifier (e.g., "arduino:avr:uno")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    /// Endpoint the device was seen on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
}

impl Device {
    /// Create a device with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: None,
            endpoint: None,
        }
    }

    pub fn with_type_id(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = Some(type_id.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Whether the catalog knows this device
    pub fn is_catalog_known(&self) -> bool {
        self.type_id.is_some()
    }

    /// Whether this device sits on the given endpoint
    pub fn has_endpoint(&self, endpoint: &Endpoint) -> bool {
        self.endpoint.as_ref() == Some(endpoint)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(type_id) = &self.type_id {
            write!(f, " [{}]", type_id)?;
        }
        if let Some(endpoint) = &self.endpoint {
            write!(f, " at {}", endpoint)?;
        }
        Ok(())
    }
}

/// One entry of a discovery attach/detach batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachItem {
    /// An identified device (its endpoint, if any, travels with it)
    Device(Device),
    /// A live endpoint with no resolved device
    Endpoint(Endpoint),
}

impl From<Device> for AttachItem {
    fn from(device: Device) -> Self {
        Self::Device(device)
    }
}

impl From<Endpoint> for AttachItem {
    fn from(endpoint: Endpoint) -> Self {
        Self::Endpoint(endpoint)
    }
}

impl std::fmt::Display for AttachItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device(device) => write!(f, "device {}", device),
            Self::Endpoint(endpoint) => write!(f, "endpoint {}", endpoint),
        }
    }
}
