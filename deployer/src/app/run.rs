//! Deploy command

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::app::options::DeployOptions;
use crate::config::{EnvironmentConfig, ServiceConfig};
use crate::deploy::supervisor::{DeployOutcome, DeployRequest, DeploymentSupervisor};
use crate::errors::DeployError;
use crate::gateway::Connector;
use crate::job::JobTemplate;
use crate::terminal::Reporter;

/// Deploy one service to one environment
///
/// Resolves configuration and template, runs the supervisor and records the
/// deployed image once the rollout succeeded. The shutdown signal is handed
/// to the supervisor, which stops the rollout it is watching.
pub async fn run<C: Connector>(
    options: DeployOptions,
    connector: C,
    reporter: Arc<dyn Reporter>,
    shutdown_signal: impl Future<Output = ()> + Send,
) -> Result<DeployOutcome, DeployError> {
    info!(
        "Deploying {} to {}",
        options.service, options.environment
    );

    let mut config = EnvironmentConfig::load(&options.layout, &options.environment).await?;
    let service = config.find(&options.service)?.clone();
    let image = choose_image(options.image.as_deref(), &service, &options.service)?;
    let template = JobTemplate::locate(&options.layout, &options.service).await?;

    let request = DeployRequest {
        address: options.scheduler.address.clone(),
        service_name: options.service.clone(),
        service,
        template,
        image: image.clone(),
        deployment_label: Some(options.environment.clone()),
        federated_dcs: config.federated_dcs.clone(),
        dry_run: options.dry_run,
    };

    let supervisor =
        DeploymentSupervisor::new(connector, reporter.clone(), options.supervisor.clone());
    let (result, fsm) = supervisor.run(&request, shutdown_signal).await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(
                "Deployment of {} failed in state {:?}: {}",
                options.service,
                fsm.state(),
                e
            );
            return Err(e);
        }
    };

    if matches!(outcome, DeployOutcome::Succeeded { .. }) && options.save_config {
        config.set_image(&options.service, &image)?;
        config.save().await?;
        reporter.success(&format!(
            "Recorded {} for {} in {}",
            image, options.service, options.environment
        ));
    }

    Ok(outcome)
}

/// The requested image, or the configured one for a redeploy
fn choose_image(
    requested: Option<&str>,
    service: &ServiceConfig,
    name: &str,
) -> Result<String, DeployError> {
    match requested.filter(|image| !image.is_empty()) {
        Some(image) => Ok(image.to_string()),
        None if !service.image.is_empty() => {
            info!("No image given, redeploying {}", service.image);
            Ok(service.image.clone())
        }
        None => Err(DeployError::Validation(format!(
            "no image given and none configured for {}",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::app::options::SchedulerOptions;
    use crate::deploy::supervisor::SupervisorOptions;
    use crate::storage::layout::{ConfigLayout, KeyStrategy};
    use crate::testing::{FakeConnector, FakeGateway, RecordingReporter};

    const CONFIG: &str = r#"
federated_dcs: dc1,dc2
services:
  api:
    image: old
    count: 3
  worker:
    image: worker:1
"#;

    const TEMPLATE: &str = r#"{
  "Job": {
    "ID": "api",
    "Name": "api",
    "Datacenters": ["dc9"],
    "TaskGroups": [
      {
        "Name": "api",
        "Count": 1,
        "Tasks": [
          {"Name": "api", "Driver": "docker", "Config": {"image": "old"}}
        ]
      }
    ]
  }
}"#;

    fn setup(root: &Path) -> ConfigLayout {
        std::fs::create_dir_all(root.join("environments/prod")).unwrap();
        std::fs::create_dir_all(root.join("nomad/service")).unwrap();
        std::fs::write(root.join("environments/prod/config.yml"), CONFIG).unwrap();
        std::fs::write(root.join("nomad/service/api.json"), TEMPLATE).unwrap();
        ConfigLayout::new(root, KeyStrategy::Environments)
    }

    fn options(layout: ConfigLayout, service: &str, image: Option<&str>) -> DeployOptions {
        DeployOptions {
            environment: "prod".to_string(),
            service: service.to_string(),
            image: image.map(str::to_string),
            dry_run: false,
            save_config: true,
            layout,
            scheduler: SchedulerOptions {
                address: "http://nomad:4646".to_string(),
                token: None,
                request_timeout: std::time::Duration::from_secs(5),
            },
            supervisor: SupervisorOptions::default(),
        }
    }

    fn never() -> std::future::Pending<()> {
        std::future::pending()
    }

    #[tokio::test(start_paused = true)]
    async fn test_deploy_records_new_image() {
        let dir = tempfile::tempdir().unwrap();
        let layout = setup(dir.path());
        let connector = FakeConnector::new(FakeGateway::default().with_statuses(&["running", "successful"]));
        let fake = connector.gateway.clone();

        let outcome = run(
            options(layout.clone(), "api", Some("v2")),
            connector,
            Arc::new(RecordingReporter::default()),
            never(),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, DeployOutcome::Succeeded { .. }));

        let (job, _) = &fake.registered()[0];
        assert_eq!(job.task_groups[0].count, Some(3));
        assert_eq!(job.task_groups[0].tasks[0].config["image"], "v2");
        assert_eq!(job.task_groups[0].tasks[0].env["deployment"], "prod");
        assert_eq!(job.task_groups[0].tasks[0].env["SVCKIT_FEDERATED_DCS"], "dc1,dc2");

        let saved = EnvironmentConfig::load(&layout, "prod").await.unwrap();
        assert_eq!(saved.find("api").unwrap().image, "v2");
        assert_eq!(saved.find("api").unwrap().count, 3);
        assert_eq!(saved.find("worker").unwrap().image, "worker:1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_deploy_keeps_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let layout = setup(dir.path());
        let connector = FakeConnector::new(FakeGateway::default().with_statuses(&["failed"]));

        let err = run(
            options(layout.clone(), "api", Some("v2")),
            connector,
            Arc::new(RecordingReporter::default()),
            never(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::DeploymentFailed { .. }));

        let saved = EnvironmentConfig::load(&layout, "prod").await.unwrap();
        assert_eq!(saved.find("api").unwrap().image, "old");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_deploy_stops_rollout() {
        let dir = tempfile::tempdir().unwrap();
        let layout = setup(dir.path());
        let connector = FakeConnector::new(FakeGateway::default().with_statuses(&["running"]));
        let fake = connector.gateway.clone();

        let err = run(
            options(layout.clone(), "api", Some("v2")),
            connector,
            Arc::new(RecordingReporter::default()),
            tokio::time::sleep(std::time::Duration::from_secs(12)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::Interrupted));
        assert_eq!(fake.calls("fail_deployment"), 1);

        let saved = EnvironmentConfig::load(&layout, "prod").await.unwrap();
        assert_eq!(saved.find("api").unwrap().image, "old");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_service_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let layout = setup(dir.path());
        let connector = FakeConnector::new(FakeGateway::default());
        let fake = connector.gateway.clone();

        let err = run(
            options(layout, "search", Some("v2")),
            connector,
            Arc::new(RecordingReporter::default()),
            never(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::ServiceNotConfigured { .. }));
        assert_eq!(fake.calls("agent_defaults"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_leaves_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let layout = setup(dir.path());
        let connector = FakeConnector::new(FakeGateway::default());
        let fake = connector.gateway.clone();
        let reporter = Arc::new(RecordingReporter::default());
        let mut options = options(layout.clone(), "api", None);
        options.dry_run = true;

        let outcome = run(options, connector, reporter.clone(), never()).await.unwrap();

        match outcome {
            DeployOutcome::DryRun(job) => {
                assert_eq!(job.task_groups[0].tasks[0].config["image"], "old")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(reporter.jobs.lock().unwrap().len(), 1);
        assert_eq!(fake.calls("register"), 0);
    }

    #[test]
    fn test_choose_image() {
        let service = ServiceConfig {
            image: "api:1".to_string(),
            ..Default::default()
        };
        assert_eq!(choose_image(Some("api:2"), &service, "api").unwrap(), "api:2");
        assert_eq!(choose_image(None, &service, "api").unwrap(), "api:1");
        assert_eq!(choose_image(Some(""), &service, "api").unwrap(), "api:1");
        assert!(choose_image(None, &ServiceConfig::default(), "api").is_err());
    }
}
