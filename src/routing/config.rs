use crate::routing::types::RoutePolicy;
use crate::routing::validation::validate_ipv4;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config directory not found")]
    ConfigDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Sentinel for `interfaceName`: pick the primary adapter automatically.
pub const AUTO_INTERFACE: &str = "auto";

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub interface_name: String,
    pub vpn_gateway: String,
    /// Next-hop for Normal mode under the fullDefault policy. Empty means
    /// the DHCP-assigned default is left in place (splitRoute policy only).
    pub normal_gateway: String,
    /// Empty means DHCP-assigned DNS.
    pub normal_dns: String,
    pub vpn_dns: String,
    pub vpn_metric: u32,
    pub last_known_vpn_state: bool,
    pub route_policy: RoutePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interface_name: AUTO_INTERFACE.to_string(),
            vpn_gateway: "10.0.0.9".to_string(),
            normal_gateway: String::new(),
            normal_dns: "10.0.0.1".to_string(),
            vpn_dns: "10.64.0.1".to_string(),
            vpn_metric: 1,
            last_known_vpn_state: false,
            route_policy: RoutePolicy::SplitRoute,
        }
    }
}

impl AppConfig {
    pub fn uses_auto_interface(&self) -> bool {
        let name = self.interface_name.trim();
        name.is_empty() || name.eq_ignore_ascii_case(AUTO_INTERFACE)
    }

    pub fn vpn_gateway_addr(&self) -> std::result::Result<Ipv4Addr, String> {
        self.vpn_gateway
            .trim()
            .parse()
            .map_err(|_| format!("invalid VPN gateway address: {:?}", self.vpn_gateway))
    }

    pub fn normal_gateway_addr(&self) -> std::result::Result<Option<Ipv4Addr>, String> {
        let gateway = self.normal_gateway.trim();
        if gateway.is_empty() {
            return Ok(None);
        }
        gateway
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid normal gateway address: {:?}", self.normal_gateway))
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let vpn_gateway = self.vpn_gateway_addr()?;
        let normal_gateway = self.normal_gateway_addr()?;

        if normal_gateway == Some(vpn_gateway) {
            return Err("VPN gateway and normal gateway must differ".to_string());
        }
        if self.vpn_metric < 1 {
            return Err("VPN metric must be at least 1".to_string());
        }
        if !validate_ipv4(&self.normal_dns) {
            return Err(format!("invalid normal DNS address: {:?}", self.normal_dns));
        }
        if !validate_ipv4(&self.vpn_dns) {
            return Err(format!("invalid VPN DNS address: {:?}", self.vpn_dns));
        }
        if self.route_policy == RoutePolicy::FullDefault && normal_gateway.is_none() {
            return Err(
                "the fullDefault route policy requires a normal gateway address".to_string(),
            );
        }

        Ok(())
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(dirs::data_local_dir)
        .ok_or(ConfigError::ConfigDirNotFound)?;

    let app_config_dir = config_dir.join("vpnswitch");
    Ok(app_config_dir.join("config.json"))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_path = get_config_path()?;
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(config_path)
}

/// Parse a config file, tolerating `//` and `/* */` comments left by hand
/// edits.
pub fn read_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)?;
    let stripped = json_comments::StripComments::new(content.as_bytes());
    let config: AppConfig = serde_json::from_reader(stripped)?;
    Ok(config)
}

/// Load the per-user config. A missing file yields defaults and writes them
/// back best-effort; a malformed file is an error the caller recovers from
/// with defaults.
pub fn load_config() -> Result<AppConfig> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        let config = AppConfig::default();
        if let Err(e) = save_config(&config) {
            log::warn!("could not write initial config: {}", e);
        }
        return Ok(config);
    }

    read_config(&config_path)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;
    Ok(())
}

/// Saves the configuration to the config file.
/// Note: Comments in the original file will not be preserved.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let config_path = ensure_config_dir()?;
    save_config_to(&config_path, config)
}
