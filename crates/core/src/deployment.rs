//! Raw `FlinkDeployment` custom resource (`flink.apache.org/v1beta1`) as served by the API server.
//!
//! Every field is optional: operator versions differ in what they populate and the
//! normalizer decides what absence means.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const GROUP: &str = "flink.apache.org";
pub const VERSION: &str = "v1beta1";
pub const KIND: &str = "FlinkDeployment";
pub const PLURAL: &str = "flinkdeployments";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlinkDeployment {
    pub metadata: DeploymentMeta,
    pub spec: FlinkDeploymentSpec,
    pub status: Option<FlinkDeploymentStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentMeta {
    pub uid: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlinkDeploymentSpec {
    pub image: Option<String>,
    pub flink_version: Option<String>,
    pub service_account: Option<String>,
    /// Absent for session clusters.
    pub job: Option<JobSpec>,
    pub job_manager: Option<JobManagerSpec>,
    pub task_manager: Option<TaskManagerSpec>,
    pub flink_configuration: Option<BTreeMap<String, Value>>,
}

impl FlinkDeploymentSpec {
    /// Scalar value of a `flinkConfiguration` key rendered as a string.
    pub fn config_value(&self, key: &str) -> Option<String> {
        self.flink_configuration.as_ref()?.get(key).and_then(scalar_to_string)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSpec {
    #[serde(rename = "jarURI")]
    pub jar_uri: Option<String>,
    pub entry_class: Option<String>,
    pub parallelism: Option<i64>,
    pub state: Option<String>,
    pub upgrade_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
    pub cpu: Option<f64>,
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobManagerSpec {
    pub replicas: Option<i64>,
    pub resource: Option<Resource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskManagerSpec {
    pub replicas: Option<i64>,
    pub resource: Option<Resource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlinkDeploymentStatus {
    pub job_status: Option<JobStatus>,
    pub task_manager: Option<TaskManagerInfo>,
    pub lifecycle_state: Option<String>,
    pub job_manager_deployment_status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobStatus {
    pub job_name: Option<String>,
    pub job_id: Option<String>,
    pub state: Option<String>,
    /// Epoch milliseconds as a string; some operator builds emit a number instead.
    #[serde(deserialize_with = "lenient_string")]
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskManagerInfo {
    pub label_selector: Option<String>,
    pub replicas: Option<i64>,
}

pub fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(scalar_to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_operator_document() {
        let raw = serde_json::json!({
            "apiVersion": "flink.apache.org/v1beta1",
            "kind": "FlinkDeployment",
            "metadata": { "name": "orders", "namespace": "flink", "uid": "u-1", "labels": { "team": "data" } },
            "spec": {
                "image": "registry.io/team/orders:1.0",
                "flinkVersion": "v1_17",
                "flinkConfiguration": { "taskmanager.numberOfTaskSlots": "2" },
                "jobManager": { "replicas": 1, "resource": { "cpu": 1, "memory": "2048m" } },
                "taskManager": { "resource": { "cpu": 0.5, "memory": "4096m" } },
                "job": { "jarURI": "local:///opt/job.jar", "parallelism": 4, "upgradeMode": "savepoint" }
            },
            "status": {
                "jobStatus": { "state": "RUNNING", "startTime": "1687261027814" },
                "taskManager": { "replicas": 2 }
            }
        });
        let d: FlinkDeployment = serde_json::from_value(raw).expect("decode");
        assert_eq!(d.metadata.name.as_deref(), Some("orders"));
        assert_eq!(d.spec.job.as_ref().and_then(|j| j.parallelism), Some(4));
        assert_eq!(d.spec.config_value("taskmanager.numberOfTaskSlots").as_deref(), Some("2"));
        let status = d.status.expect("status");
        assert_eq!(status.job_status.and_then(|j| j.start_time).as_deref(), Some("1687261027814"));
        assert_eq!(status.task_manager.and_then(|t| t.replicas), Some(2));
    }

    #[test]
    fn tolerates_sparse_and_numeric_fields() {
        let raw = serde_json::json!({
            "metadata": { "name": "session" },
            "spec": { "job": null, "flinkConfiguration": { "taskmanager.numberOfTaskSlots": 4 } },
            "status": { "jobStatus": { "startTime": 1687261027814u64 } }
        });
        let d: FlinkDeployment = serde_json::from_value(raw).expect("decode");
        assert!(d.spec.job.is_none());
        assert!(d.spec.task_manager.is_none());
        assert_eq!(d.spec.config_value("taskmanager.numberOfTaskSlots").as_deref(), Some("4"));
        let start = d.status.and_then(|s| s.job_status).and_then(|j| j.start_time);
        assert_eq!(start.as_deref(), Some("1687261027814"));
    }
}
