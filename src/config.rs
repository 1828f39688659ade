//! Configuration management for the managed Cloud SDK

use crate::component::SdkComponent;
use crate::version::{Version, LATEST};
use crate::{ManagedSdkError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_USER_AGENT: &str = "google-cloud-tools-java";

/// `~/.google-cloud-tools-java/managed-cloud-sdk`
pub fn default_managed_sdk_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".google-cloud-tools-java")
        .join("managed-cloud-sdk")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManagedSdkConfig {
    pub managed_sdk_directory: PathBuf,
    /// `LATEST` or a pinned release such as `190.0.0`.
    pub version: String,
    pub user_agent: String,
    pub usage_reporting: bool,
    /// Component ids installed alongside the SDK.
    pub components: Vec<String>,
}

impl Default for ManagedSdkConfig {
    fn default() -> Self {
        Self {
            managed_sdk_directory: default_managed_sdk_directory(),
            version: LATEST.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            usage_reporting: false,
            components: Vec::new(),
        }
    }
}

impl ManagedSdkConfig {
    pub fn sdk_version(&self) -> Result<Version> {
        self.version.parse()
    }

    pub fn sdk_components(&self) -> Vec<SdkComponent> {
        self.components
            .iter()
            .filter_map(|id| id.parse().ok())
            .collect()
    }
}

#[derive(Clone)]
pub struct ConfigManager {
    config: ManagedSdkConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let default_path = || {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("managed-cloud-sdk")
                .join("config.json")
        };
        let mut manager = Self {
            config: ManagedSdkConfig::default(),
            config_path: config_path.unwrap_or_else(default_path),
        };

        // Try to load existing config
        if manager.config_path.exists() {
            manager.load_config()?;
        }

        Ok(manager)
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn get_config(&self) -> &ManagedSdkConfig {
        &self.config
    }

    pub fn get_config_mut(&mut self) -> &mut ManagedSdkConfig {
        &mut self.config
    }

    /// Pin or unpin the managed version. Invalid versions are rejected before
    /// anything is stored.
    pub fn set_version(&mut self, version: &str) -> Result<()> {
        let version: Version = version.parse()?;
        self.config.version = version.to_string();
        Ok(())
    }

    pub fn save_config(&self) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, json)?;

        info!("Configuration saved to: {:?}", self.config_path);
        Ok(())
    }

    pub fn load_config(&mut self) -> Result<()> {
        if !self.config_path.exists() {
            info!("No configuration file found, using default configuration");
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: ManagedSdkConfig = serde_json::from_str(&content)?;
        config.sdk_version().map_err(|e| {
            ManagedSdkError::config(format!("{}: {}", self.config_path.display(), e))
        })?;
        self.config = config;

        info!("Configuration loaded from: {:?}", self.config_path);
        Ok(())
    }
}
