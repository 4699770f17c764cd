//! Per-environment service configuration
//!
//! One YAML file per environment key maps service names to their placement,
//! sizing and environment overrides. Deploys only ever rewrite the `image`
//! of the deployed service; everything else, unknown keys included, is
//! written back as it was read.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::storage::layout::ConfigLayout;

/// Configuration of one service in one environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Currently deployed image reference
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    /// Desired replica count, zero keeps the template value
    #[serde(default, skip_serializing_if = "is_zero")]
    pub count: u32,

    /// CPU reservation in MHz, zero keeps the template value
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cpu: u32,

    /// Memory reservation in MB, zero keeps the template value
    #[serde(rename = "mem", default, skip_serializing_if = "is_zero")]
    pub memory: u32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostgroup: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node: String,

    #[serde(rename = "dc_region", default, skip_serializing_if = "String::is_empty")]
    pub region_tag: String,

    /// Number of canary allocations per task group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary: Option<u32>,

    /// Container launch arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment variable overrides, empty values are ignored
    #[serde(rename = "env", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// All service configurations of one environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(skip)]
    key: String,

    #[serde(skip)]
    file: Option<File>,

    /// Comma separated datacenters federated with this environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federated_dcs: Option<String>,

    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl EnvironmentConfig {
    /// Load the configuration of `key` using the repository layout
    pub async fn load(layout: &ConfigLayout, key: &str) -> Result<Self, DeployError> {
        let file = layout.environment_file(key);
        let contents = file
            .read_string_opt()
            .await?
            .ok_or_else(|| DeployError::ConfigNotFound(file.path().to_path_buf()))?;

        let mut config = Self::parse(&contents, file.path())?;
        config.key = key.to_string();
        debug!(
            "Loaded {} services for {} from {}",
            config.services.len(),
            key,
            file.path().display()
        );
        config.file = Some(file);
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, DeployError> {
        serde_yaml::from_str(contents).map_err(|e| DeployError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Environment key this configuration was loaded for
    pub fn key(&self) -> &str {
        &self.key
    }

    /// File backing this configuration
    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    /// Configured service names, sorted
    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// Find the configuration of a service
    pub fn find(&self, service: &str) -> Result<&ServiceConfig, DeployError> {
        self.services
            .get(service)
            .ok_or_else(|| DeployError::ServiceNotConfigured {
                service: service.to_string(),
                environment: self.key.clone(),
            })
    }

    /// Record the image a service now runs
    pub fn set_image(&mut self, service: &str, image: &str) -> Result<(), DeployError> {
        let environment = self.key.clone();
        let config = self
            .services
            .get_mut(service)
            .ok_or_else(|| DeployError::ServiceNotConfigured {
                service: service.to_string(),
                environment,
            })?;
        config.image = image.to_string();
        Ok(())
    }

    /// Write the configuration back to the file it was loaded from
    pub async fn save(&self) -> Result<(), DeployError> {
        let file = self.file.as_ref().ok_or_else(|| {
            DeployError::Internal(format!("configuration {} was not loaded from a file", self.key))
        })?;
        let contents = serde_yaml::to_string(self)?;
        file.write_atomic(contents.as_bytes()).await?;
        info!("Saved {} configuration to {}", self.key, file.path().display());
        Ok(())
    }
}
