//! Job assembly tests against JSON templates

use shipyard::config::ServiceConfig;
use shipyard::job::{assemble, AssemblyContext, JobTemplate};

const TEMPLATE: &str = r#"{
  "ID": "search",
  "Name": "search",
  "Datacenters": ["dc-a", "dc-b"],
  "Update": {"MaxParallel": 1},
  "Meta": {"team": "discovery"},
  "TaskGroups": [
    {
      "Name": "search",
      "Count": 1,
      "Tasks": [
        {"Name": "search", "Driver": "docker", "Config": {"image": "search:1", "ports": ["http"]}}
      ]
    },
    {
      "Name": "indexer",
      "Count": 4,
      "Tasks": [
        {"Name": "indexer", "Driver": "docker", "Config": {"image": "indexer:7"}}
      ]
    }
  ]
}"#;

fn ctx() -> AssemblyContext<'static> {
    AssemblyContext {
        service: "search",
        image: "search:2",
        region: "eu-west",
        datacenter: "dc-b",
        deployment_label: Some("staging"),
        federated_dcs: None,
    }
}

fn template() -> nomad_api::Job {
    let template = JobTemplate::from_json("search.json", TEMPLATE);
    let gateway = NoScheduler;
    tokio_test::block_on(template.to_job(&gateway)).unwrap()
}

/// JSON templates never reach the scheduler
struct NoScheduler;

#[async_trait::async_trait]
impl shipyard::gateway::SchedulerGateway for NoScheduler {
    async fn agent_defaults(
        &self,
    ) -> Result<shipyard::gateway::AgentDefaults, shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn parse_job(&self, _hcl: &str) -> Result<nomad_api::Job, shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn validate(&self, _job: &nomad_api::Job) -> Result<(), shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn plan(&self, _job: &nomad_api::Job) -> Result<u64, shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn register(
        &self,
        _job: &nomad_api::Job,
        _modify_index: u64,
    ) -> Result<String, shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn evaluation_info(
        &self,
        _eval_id: &str,
    ) -> Result<nomad_api::Evaluation, shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn deployment_info(
        &self,
        _deployment_id: &str,
        _query: &shipyard::gateway::QueryOptions,
    ) -> Result<(nomad_api::Deployment, u64), shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn promote_all(&self, _deployment_id: &str) -> Result<(), shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn fail_deployment(
        &self,
        _deployment_id: &str,
    ) -> Result<(), shipyard::errors::DeployError> {
        unreachable!()
    }

    async fn allocation_errors(
        &self,
        _deployment_id: &str,
    ) -> Result<Vec<String>, shipyard::errors::DeployError> {
        unreachable!()
    }
}

#[test]
fn test_count_only_touches_matching_group() {
    let config = ServiceConfig {
        count: 6,
        ..Default::default()
    };
    let job = assemble(&template(), &config, &ctx()).unwrap();

    assert_eq!(job.task_groups[0].count, Some(6));
    assert_eq!(job.task_groups[1].count, Some(4));
    assert_eq!(job.task_groups[1].tasks[0].config["image"], "indexer:7");
}

#[test]
fn test_unknown_template_fields_survive() {
    let job = assemble(&template(), &ServiceConfig::default(), &ctx()).unwrap();
    let json = serde_json::to_value(&job).unwrap();

    assert_eq!(json["Meta"]["team"], "discovery");
    assert_eq!(json["Update"]["MaxParallel"], 1);
    assert_eq!(json["TaskGroups"][0]["Tasks"][0]["Config"]["ports"][0], "http");
    assert_eq!(json["TaskGroups"][0]["Tasks"][0]["Env"]["deployment"], "staging");
}

#[test]
fn test_datacenters_never_accumulate() {
    let config = ServiceConfig {
        canary: Some(1),
        node: "node-7".to_string(),
        ..Default::default()
    };
    let mut job = template();
    for _ in 0..3 {
        job = assemble(&job, &config, &ctx()).unwrap();
    }

    assert_eq!(job.datacenters, vec!["dc-b".to_string()]);
    assert_eq!(job.constraints.len(), 1);
    assert_eq!(job.canary_count(), 1);
    assert_eq!(job.region.as_deref(), Some("eu-west"));
}
