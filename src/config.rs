//! Configuration consumed by the inputs.
//!
//! The ingestion layer does not own a configuration system; it consumes
//! plain serde-derived structs that a host process deserializes from its own
//! config file. A YAML helper is provided for hosts and tests that want one.

use serde::{Deserialize, Serialize};

use crate::{IntakeError, Result};

/// One named, versioned signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSpec {
    pub name: String,
    pub version: u32,
    /// Shared secret used as the HMAC key.
    pub key: String,
}

/// Configuration for the stream (connection-oriented) input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpInputConfig {
    /// Bind address, symbolic hostnames allowed.
    pub address: String,
    /// Accepted signing keys; empty means only unsigned messages pass.
    #[serde(default)]
    pub signers: Vec<SignerSpec>,
}

/// Configuration for the datagram (connectionless) input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpInputConfig {
    /// Bind address, symbolic hostnames allowed.
    pub address: String,
}

/// Configuration for any input variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputConfig {
    Tcp(TcpInputConfig),
    Udp(UdpInputConfig),
}

impl InputConfig {
    /// Deserialize an input configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|err| IntakeError::config(err.to_string()))
    }

    /// Deserialize an input configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        InputConfig::from_yaml(&text)
    }
}
