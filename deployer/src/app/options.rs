//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::deploy::supervisor::SupervisorOptions;
use crate::deploy::watcher;
use crate::storage::layout::ConfigLayout;
use crate::storage::settings::Settings;
use crate::workers::canary;

/// Options of one deploy invocation
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Environment key
    pub environment: String,

    /// Service to deploy
    pub service: String,

    /// Image to deploy, the configured image when unset
    pub image: Option<String>,

    /// Validate and print the job without submitting it
    pub dry_run: bool,

    /// Record the deployed image in the configuration file
    pub save_config: bool,

    /// Configuration repository
    pub layout: ConfigLayout,

    pub scheduler: SchedulerOptions,

    pub supervisor: SupervisorOptions,
}

impl DeployOptions {
    /// Options for `environment`/`service` with everything else from settings
    pub fn from_settings(settings: &Settings, environment: &str, service: &str) -> Self {
        let supervision = &settings.supervision;
        Self {
            environment: environment.to_string(),
            service: service.to_string(),
            image: None,
            dry_run: false,
            save_config: true,
            layout: ConfigLayout::new(&settings.repository.root, settings.repository.layout),
            scheduler: SchedulerOptions {
                address: settings.scheduler.address.clone(),
                token: settings.scheduler.token.clone(),
                request_timeout: Duration::from_secs(settings.scheduler.request_timeout_secs),
            },
            supervisor: SupervisorOptions {
                eval_poll: supervision.eval_poll(),
                eval_timeout: supervision.eval_timeout(),
                watch: watcher::Options {
                    wait_time: supervision.watch_wait(),
                },
                canary: canary::Options {
                    interval: supervision.canary_interval(),
                },
            },
        }
    }
}

/// Scheduler connection options
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Scheduler HTTP address
    pub address: String,

    /// ACL token
    pub token: Option<SecretString>,

    /// Timeout of non-blocking requests
    pub request_timeout: Duration,
}
