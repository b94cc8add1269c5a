//! Provisioning-owned JSON config consumed by the call backend.
//!
//! The provisioning service writes this file; the core only reads it. The
//! file may also carry provisioning-side keys (wifi credentials), which
//! are ignored here.

use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// How long to wait before re-checking for a config file that is missing
/// or not yet valid.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneConfig {
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,

    #[serde(rename = "password")]
    pub password: String,

    /// Registrar address.
    #[serde(rename = "sipIP")]
    pub sip_ip: String,
}

pub fn load(path: &Path) -> Result<PhoneConfig, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Config {} is not valid: {}", path.display(), e))
}

/// Wait for the provisioning service to produce a readable config,
/// retrying at a fixed interval.
pub async fn wait_for(path: &Path) -> PhoneConfig {
    loop {
        match load(path) {
            Ok(config) => {
                info!("config loaded from {}", path.display());
                return config;
            }
            Err(e) => {
                debug!("{}; retrying in {:?}", e, RETRY_INTERVAL);
            }
        }
        tokio::time::sleep(RETRY_INTERVAL).await;
    }
}
