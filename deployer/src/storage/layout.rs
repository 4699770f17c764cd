//! Configuration repository layout

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filesys::file::File;

/// Name of the per-environment configuration file
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Template directories, searched in order
const TEMPLATE_DIRS: [&str; 2] = ["service", "system"];

/// Template file extensions, searched in order
const TEMPLATE_EXTENSIONS: [&str; 3] = ["json", "nomad", "hcl"];

/// How an environment key maps to a directory of the repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// `<root>/environments/<key>/config.yml`
    #[default]
    Environments,

    /// `<root>/datacenters/<key>/config.yml`
    Datacenters,

    /// `<root>/deployments/<key>/config.yml`
    Deployments,
}

impl KeyStrategy {
    fn dir_name(&self) -> &'static str {
        match self {
            KeyStrategy::Environments => "environments",
            KeyStrategy::Datacenters => "datacenters",
            KeyStrategy::Deployments => "deployments",
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "environments" | "environment" => Ok(KeyStrategy::Environments),
            "datacenters" | "datacenter" | "dc" => Ok(KeyStrategy::Datacenters),
            "deployments" | "deployment" => Ok(KeyStrategy::Deployments),
            _ => Err(format!("Invalid layout: {}", s)),
        }
    }
}

/// Layout of the configuration repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayout {
    /// Repository root
    pub root: PathBuf,

    /// Environment key resolution
    pub strategy: KeyStrategy,
}

impl ConfigLayout {
    /// Create a new layout
    pub fn new(root: impl Into<PathBuf>, strategy: KeyStrategy) -> Self {
        Self {
            root: root.into(),
            strategy,
        }
    }

    /// Configuration file of an environment
    pub fn environment_file(&self, key: &str) -> File {
        File::new(
            self.root
                .join(self.strategy.dir_name())
                .join(key)
                .join(CONFIG_FILE_NAME),
        )
    }

    /// Candidate job template files of a service, in lookup order
    pub fn template_candidates(&self, service: &str) -> Vec<File> {
        TEMPLATE_DIRS
            .iter()
            .flat_map(|dir| {
                TEMPLATE_EXTENSIONS.iter().map(move |ext| {
                    File::new(
                        self.root
                            .join("nomad")
                            .join(dir)
                            .join(format!("{}.{}", service, ext)),
                    )
                })
            })
            .collect()
    }
}
