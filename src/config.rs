//! Configuration surface for the gateway engine.
//!
//! Split into `GatewayConfig` (engine-level), `CloudConfig` (bootstrap/MQTT)
//! and `OtaConfig` (receiver tuning). Each is a plain serde struct with a
//! `Default` impl and a `validate()` that rejects obviously-broken values
//! before they become a runtime fault.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::GatewayProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub device_id: String,
    pub loop_period_ms: u32,
    #[serde(default)]
    pub profile: GatewayProfile,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            loop_period_ms: 20,
            profile: GatewayProfile::default(),
            log_level: default_log_level(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.device_id.is_empty() {
            return Err(Error::invalid_argument("device_id must not be empty"));
        }
        if self.loop_period_ms == 0 {
            return Err(Error::invalid_argument("loop_period_ms must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub bootstrap_url: Option<String>,
    #[serde(default)]
    pub secret_url: Option<String>,
    #[serde(default)]
    pub broker_url: Option<String>,

    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub hardware_id: Option<String>,
    #[serde(default)]
    pub identity_key: Option<String>,
    pub manufacturing_key: String,

    #[serde(default)]
    pub mqtt_username: Option<String>,
    #[serde(default)]
    pub device_secret: Option<String>,
    #[serde(default)]
    pub topic_prefix: Option<String>,
    #[serde(default)]
    pub mqtt_client_id: Option<String>,

    #[serde(default = "default_tls_sec_tag")]
    pub tls_sec_tag: i32,
    #[serde(default = "default_keepalive")]
    pub mqtt_keepalive_sec: u16,
    #[serde(default = "default_bootstrap_timeout")]
    pub bootstrap_timeout_ms: u32,
    #[serde(default = "default_connect_timeout")]
    pub mqtt_connect_timeout_ms: u32,
}

fn default_tls_sec_tag() -> i32 {
    -1
}
fn default_keepalive() -> u16 {
    60
}
fn default_bootstrap_timeout() -> u32 {
    5000
}
fn default_connect_timeout() -> u32 {
    5000
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            bootstrap_url: None,
            secret_url: None,
            broker_url: None,
            device_id: None,
            hardware_id: None,
            identity_key: None,
            manufacturing_key: String::new(),
            mqtt_username: None,
            device_secret: None,
            topic_prefix: None,
            mqtt_client_id: None,
            tls_sec_tag: default_tls_sec_tag(),
            mqtt_keepalive_sec: default_keepalive(),
            bootstrap_timeout_ms: default_bootstrap_timeout(),
            mqtt_connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl CloudConfig {
    pub fn validate(&self) -> Result<()> {
        if self.manufacturing_key.is_empty() {
            return Err(Error::invalid_argument("manufacturing_key is required"));
        }
        if self.hardware_id.as_deref().unwrap_or("").is_empty()
            && self.device_id.as_deref().unwrap_or("").is_empty()
            && self.identity_key.as_deref().unwrap_or("").is_empty()
        {
            return Err(Error::invalid_argument(
                "one of hardware_id/device_id/identity_key must be set",
            ));
        }
        Ok(())
    }

    /// Pre-provisioned credentials bypass the secret exchange only when all
    /// three of username/secret/prefix are set.
    pub fn has_cached_credentials(&self) -> bool {
        self.mqtt_username.as_deref().is_some_and(|s| !s.is_empty())
            && self.device_secret.as_deref().is_some_and(|s| !s.is_empty())
            && self.topic_prefix.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OtaConfig {
    /// 0 disables the per-chunk size check.
    #[serde(default)]
    pub chunk_size: u32,
    /// Reserved for a pump-timeout extension.
    #[serde(default)]
    pub timeout_ms: u32,
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self {
            chunk_size: 0,
            timeout_ms: 0,
        }
    }
}
