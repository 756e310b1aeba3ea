//! Heimdall core types: canonical Flink jobs and the raw records they come from.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod deployment;
pub mod namespaces;
pub mod normalize;

pub use deployment::FlinkDeployment;
pub use namespaces::{resolve_namespaces, DEFAULT_NAMESPACE};
pub use normalize::to_flink_job;

/// Sentinel status for deployments that do not report a job state yet.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";
/// Resource map key for the job manager.
pub const JM_LABEL: &str = "jm";
/// Resource map key for the task manager.
pub const TM_LABEL: &str = "tm";

/// Application jobs declare a job spec; session clusters run without one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlinkJobType {
    Application,
    Session,
}

impl std::fmt::Display for FlinkJobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlinkJobType::Application => f.write_str("APPLICATION"),
            FlinkJobType::Session => f.write_str("SESSION"),
        }
    }
}

/// Replica count and sizing of one manager role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlinkJobResources {
    pub replicas: u32,
    pub cpu: Option<String>,
    pub mem: Option<String>,
}

/// Flat job summary handed to dashboards and API clients.
///
/// Field order is the serialized order and is relied upon by consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlinkJob {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub status: String,
    #[serde(rename = "type")]
    pub job_type: FlinkJobType,
    /// Epoch milliseconds.
    pub start_time: Option<i64>,
    pub short_image: Option<String>,
    pub flink_version: Option<String>,
    /// 0 when it could not be determined. Best-effort, see [`normalize::parallelism`].
    pub parallelism: u32,
    pub resources: BTreeMap<String, FlinkJobResources>,
    pub metadata: BTreeMap<String, String>,
}

pub mod prelude {
    pub use super::{
        FlinkDeployment, FlinkJob, FlinkJobResources, FlinkJobType, JM_LABEL, TM_LABEL, UNKNOWN_STATUS,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_serializes_in_contract_order() {
        let mut resources = BTreeMap::new();
        resources.insert(
            TM_LABEL.to_string(),
            FlinkJobResources { replicas: 2, cpu: Some("1.0".into()), mem: Some("2048m".into()) },
        );
        let job = FlinkJob {
            id: "uid-1".into(),
            name: "orders".into(),
            namespace: "flink".into(),
            status: "RUNNING".into(),
            job_type: FlinkJobType::Application,
            start_time: None,
            short_image: Some("team/app:1.0".into()),
            flink_version: Some("1.15".into()),
            parallelism: 4,
            resources,
            metadata: BTreeMap::new(),
        };
        let s = serde_json::to_string(&job).expect("serialize");
        assert_eq!(
            s,
            r#"{"id":"uid-1","name":"orders","namespace":"flink","status":"RUNNING","type":"APPLICATION","startTime":null,"shortImage":"team/app:1.0","flinkVersion":"1.15","parallelism":4,"resources":{"tm":{"replicas":2,"cpu":"1.0","mem":"2048m"}},"metadata":{}}"#
        );
    }

    #[test]
    fn job_type_renders_upper_case() {
        assert_eq!(serde_json::to_value(FlinkJobType::Session).expect("ok"), serde_json::json!("SESSION"));
        assert_eq!(FlinkJobType::Application.to_string(), "APPLICATION");
    }
}
