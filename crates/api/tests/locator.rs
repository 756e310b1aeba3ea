#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use heimdall_api::{
    locator_from_config, AppConfig, FlinkJobType, JobLocator, K8sOperatorJobLocator, LocatorConfig, LocatorError,
    MockLocator,
};
use heimdall_core::FlinkDeployment;
use heimdall_kubehub::{DeploymentSource, ListConstraints};

struct StaticSource {
    by_ns: HashMap<&'static str, Vec<serde_json::Value>>,
    failing: &'static [&'static str],
}

#[async_trait::async_trait]
impl DeploymentSource for StaticSource {
    async fn list(&self, namespace: &str, _constraints: &ListConstraints) -> Result<Vec<FlinkDeployment>> {
        if self.failing.iter().any(|n| *n == namespace) {
            return Err(anyhow!("connection refused"));
        }
        let docs = self.by_ns.get(namespace).cloned().unwrap_or_default();
        Ok(docs.into_iter().map(|v| serde_json::from_value(v).expect("fixture")).collect())
    }
}

fn app(name: &str, ns: &str, slots: &str) -> serde_json::Value {
    serde_json::json!({
        "metadata": { "uid": format!("{}-{}", ns, name), "name": name, "namespace": ns, "labels": { "flink-app": name } },
        "spec": {
            "image": "registry.io/team/app:1.0",
            "flinkVersion": "v1_15",
            "flinkConfiguration": { "taskmanager.numberOfTaskSlots": slots },
            "job": { "parallelism": 0 },
            "jobManager": { "replicas": 1, "resource": { "cpu": 1.0, "memory": "2048m" } },
            "taskManager": { "replicas": 3, "resource": { "cpu": 2.0, "memory": "4096m" } }
        },
        "status": { "jobStatus": { "state": "RUNNING", "startTime": "1687261027814" } }
    })
}

fn locator(namespaces: &str, by_ns: HashMap<&'static str, Vec<serde_json::Value>>, failing: &'static [&'static str]) -> K8sOperatorJobLocator {
    let cfg = LocatorConfig { namespace_to_watch: Some(namespaces.to_string()), ..Default::default() };
    K8sOperatorJobLocator::new(Arc::new(StaticSource { by_ns, failing }), &cfg)
}

#[tokio::test]
async fn empty_cluster_yields_no_jobs() {
    let l = locator("empty-one", HashMap::new(), &[]);
    assert!(l.find_all().await.is_empty());
}

#[tokio::test]
async fn unreachable_namespace_does_not_hide_healthy_one() {
    let mut by_ns = HashMap::new();
    by_ns.insert("good", vec![app("a", "good", "2"), app("b", "good", "2")]);
    let l = locator("bad,good", by_ns, &["bad"]);
    let jobs = l.find_all().await;
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j.namespace == "good"));
}

#[tokio::test]
async fn bad_slot_count_only_affects_its_own_record() {
    let mut by_ns = HashMap::new();
    by_ns.insert("default", vec![app("a", "default", "2"), app("b", "default", "lots"), app("c", "default", "1")]);
    let l = locator("", by_ns, &[]);
    let jobs = l.find_all().await;
    let got: Vec<(&str, u32)> = jobs.iter().map(|j| (j.name.as_str(), j.parallelism)).collect();
    assert_eq!(got, vec![("a", 6), ("b", 0), ("c", 3)]);
}

#[tokio::test]
async fn jobs_follow_configured_namespace_order() {
    let mut by_ns = HashMap::new();
    by_ns.insert("prod", vec![app("p1", "prod", "1")]);
    by_ns.insert("staging", vec![app("s1", "staging", "1"), app("s2", "staging", "1")]);
    let l = locator("staging, prod", by_ns, &[]);
    let names: Vec<String> = l.find_all().await.into_iter().map(|j| j.name).collect();
    assert_eq!(names, vec!["s1", "s2", "p1"]);
}

#[tokio::test]
async fn normalized_job_has_contract_shape() {
    let mut by_ns = HashMap::new();
    by_ns.insert("default", vec![app("orders", "default", "2")]);
    let l = locator("default", by_ns, &[]);
    let jobs = l.find_all().await;
    let v = serde_json::to_value(&jobs[0]).expect("serialize");
    assert_eq!(v["id"], "default-orders");
    assert_eq!(v["type"], "APPLICATION");
    assert_eq!(v["startTime"], 1_687_261_027_814i64);
    assert_eq!(v["shortImage"], "team/app:1.0");
    assert_eq!(v["flinkVersion"], "1.15");
    assert_eq!(v["parallelism"], 6);
    assert_eq!(v["resources"]["tm"], serde_json::json!({ "replicas": 3, "cpu": "2.0", "mem": "4096m" }));
    assert_eq!(v["resources"]["jm"]["replicas"], 1);
    assert_eq!(v["metadata"]["flink-app"], "orders");
}

#[tokio::test]
async fn session_cluster_is_typed_session() {
    let mut by_ns = HashMap::new();
    by_ns.insert(
        "default",
        vec![serde_json::json!({ "metadata": { "uid": "s", "name": "shared", "namespace": "default" }, "spec": { "image": "flink:1.17" } })],
    );
    let l = locator("default", by_ns, &[]);
    let jobs = l.find_all().await;
    assert_eq!(jobs[0].job_type, FlinkJobType::Session);
    assert_eq!(jobs[0].status, "UNKNOWN");
    assert_eq!(jobs[0].short_image.as_deref(), Some("flink:1.17"));
}

#[tokio::test]
async fn disabled_strategy_is_reported() {
    let mut cfg = AppConfig::default();
    cfg.joblocator.enabled = false;
    match locator_from_config(&cfg).await {
        Err(LocatorError::Disabled(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected disabled locator"),
    }
}

#[tokio::test]
async fn mock_locator_defaults_to_empty() {
    let l = MockLocator::default();
    assert!(l.find_all().await.is_empty());
}
