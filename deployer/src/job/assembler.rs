//! Job assembly
//!
//! Combines a job template with the service configuration of one environment
//! and the image to deploy. A template may define several task groups, e.g.
//! the service itself plus a shared `services` sidecar group, so only groups
//! and tasks addressed to the deployed service are touched.

use nomad_api::{Constraint, Job, Resources, UpdateStrategy};
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::errors::DeployError;

/// Env var carrying the federated datacenter list
pub const FEDERATED_DCS_ENV: &str = "SVCKIT_FEDERATED_DCS";

/// Env var carrying the deployment label
pub const DEPLOYMENT_ENV: &str = "deployment";

/// Task group name shared by sidecar services
const SHARED_GROUP: &str = "services";

/// Task name used by single-task templates
const SHARED_TASK: &str = "service";

const HOSTGROUP_TARGET: &str = "${meta.hostgroup}";
const NODE_TARGET: &str = "${meta.node}";
const REGION_TAG_TARGET: &str = "${meta.dc_region}";

/// Deployment target of an assembled job
#[derive(Debug, Clone, Copy)]
pub struct AssemblyContext<'a> {
    pub service: &'a str,
    pub image: &'a str,
    pub region: &'a str,
    pub datacenter: &'a str,
    pub deployment_label: Option<&'a str>,
    pub federated_dcs: Option<&'a str>,
}

/// Assemble the job to submit. The template is never modified, so the same
/// inputs always produce the same job.
pub fn assemble(
    template: &Job,
    config: &ServiceConfig,
    ctx: &AssemblyContext<'_>,
) -> Result<Job, DeployError> {
    if template.task_groups.is_empty() {
        return Err(DeployError::Validation(
            "job template defines no task groups".to_string(),
        ));
    }

    let mut job = template.clone();

    job.region = Some(ctx.region.to_string());
    job.datacenters = vec![ctx.datacenter.to_string()];

    for (target, value) in [
        (HOSTGROUP_TARGET, &config.hostgroup),
        (NODE_TARGET, &config.node),
        (REGION_TAG_TARGET, &config.region_tag),
    ] {
        if !value.is_empty() {
            job.constrain(Constraint::equals(target, value.as_str()));
        }
    }

    if let Some(canary) = config.canary {
        if canary > 0 || job.update.is_some() {
            job.update
                .get_or_insert_with(UpdateStrategy::default)
                .canary = Some(canary);
            debug!("Setting canary count {}", canary);
        }
    }

    let mut images_set = 0;
    for group in job.task_groups.iter_mut() {
        if !matches(group.name.as_deref(), ctx.service, SHARED_GROUP) {
            continue;
        }
        if config.count > 0 {
            group.count = Some(config.count);
            debug!("Setting count {}", config.count);
        }

        for task in group.tasks.iter_mut() {
            if !matches(Some(task.name.as_str()), ctx.service, SHARED_TASK) {
                continue;
            }

            task.config
                .insert("image".to_string(), Value::String(ctx.image.to_string()));
            images_set += 1;
            debug!("Setting image {} on task {}", ctx.image, task.name);

            if !config.args.is_empty() {
                task.config.insert(
                    "args".to_string(),
                    Value::Array(config.args.iter().cloned().map(Value::String).collect()),
                );
            }
            if config.cpu != 0 {
                task.resources.get_or_insert_with(Resources::default).cpu = Some(config.cpu);
            }
            if config.memory != 0 {
                task.resources
                    .get_or_insert_with(Resources::default)
                    .memory_mb = Some(config.memory);
            }

            if let Some(label) = ctx.deployment_label.filter(|l| !l.is_empty()) {
                task.env.insert(DEPLOYMENT_ENV.to_string(), label.to_string());
            }
            if let Some(dcs) = ctx.federated_dcs.filter(|d| !d.is_empty()) {
                task.env.insert(FEDERATED_DCS_ENV.to_string(), dcs.to_string());
            }
            for (key, value) in config.environment.iter().filter(|(_, v)| !v.is_empty()) {
                task.env.insert(key.clone(), value.clone());
            }
        }
    }

    if images_set == 0 {
        return Err(DeployError::Validation(format!(
            "no task named {} or {} in a group named {} or {}",
            ctx.service, SHARED_TASK, ctx.service, SHARED_GROUP
        )));
    }

    Ok(job)
}

fn matches(name: Option<&str>, service: &str, shared: &str) -> bool {
    matches!(name, Some(n) if n == service || n == shared)
}
