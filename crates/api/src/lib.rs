//! Heimdall public API façade (in-process).
//!
//! Frontends (CLI, HTTP) depend on the [`JobLocator`] trait only. The operator-backed
//! implementation resolves namespaces, fetches FlinkDeployments with per-namespace
//! fault isolation and normalizes each record into a [`FlinkJob`].

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use heimdall_core::{resolve_namespaces, to_flink_job};
use heimdall_kubehub::{DeploymentSource, FlinkDeploymentClient, KubeDeploymentSource, ListConstraints};

pub mod config;

pub use config::{AppConfig, AppConfigView, LocatorConfig};
pub use heimdall_core::{FlinkJob, FlinkJobResources, FlinkJobType};

/// API errors suitable for transport over RPC later.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum LocatorError {
    #[error("disabled: {0}")]
    Disabled(String),
    #[error("client: {0}")]
    Client(String),
}

pub type LocatorResult<T> = Result<T, LocatorError>;

/// Source of the current job list.
#[async_trait::async_trait]
pub trait JobLocator: Send + Sync {
    /// Fresh snapshot of all jobs in the watched namespaces. Unreachable namespaces
    /// contribute nothing; the call itself does not fail for cluster reasons.
    async fn find_all(&self) -> Vec<FlinkJob>;
}

// ----------------- Operator-backed implementation -----------------

/// Locates jobs through `FlinkDeployment` resources reconciled by the Flink operator.
pub struct K8sOperatorJobLocator {
    client: FlinkDeploymentClient,
    namespace_to_watch: Option<String>,
    constraints: ListConstraints,
}

impl K8sOperatorJobLocator {
    pub fn new(source: Arc<dyn DeploymentSource>, cfg: &LocatorConfig) -> Self {
        Self {
            client: FlinkDeploymentClient::new(source),
            namespace_to_watch: cfg.namespace_to_watch.clone(),
            constraints: cfg.constraints(),
        }
    }

    pub fn namespaces(&self) -> Vec<String> {
        resolve_namespaces(self.namespace_to_watch.as_deref())
    }
}

#[async_trait::async_trait]
impl JobLocator for K8sOperatorJobLocator {
    async fn find_all(&self) -> Vec<FlinkJob> {
        let t0 = Instant::now();
        let namespaces = self.namespaces();
        debug!(namespaces = ?namespaces, "searching for flink deployments");
        let deployments = self.client.find_all(&namespaces, &self.constraints).await;
        let jobs: Vec<FlinkJob> = deployments.iter().map(to_flink_job).collect();
        histogram!("heimdall_find_all_ms", t0.elapsed().as_secs_f64() * 1000.0);
        info!(count = jobs.len(), namespaces = ?namespaces, took_ms = %t0.elapsed().as_millis(), "api: find_all ok");
        jobs
    }
}

/// Build the configured locator. Only the operator strategy exists; when it is
/// switched off there is nothing to serve.
pub async fn locator_from_config(cfg: &AppConfig) -> LocatorResult<Arc<dyn JobLocator>> {
    if !cfg.joblocator.enabled {
        return Err(LocatorError::Disabled("no job locator enabled (k8s-operator is off)".into()));
    }
    let source = KubeDeploymentSource::try_default()
        .await
        .map_err(|e| LocatorError::Client(format!("{:#}", e)))?;
    Ok(Arc::new(K8sOperatorJobLocator::new(Arc::new(source), &cfg.joblocator)))
}

// ----------------- Mock implementation -----------------

/// Simple in-memory mock implementation for tests and frontend work.
#[derive(Debug, Clone, Default)]
pub struct MockLocator {
    pub jobs: Vec<FlinkJob>,
}

impl MockLocator {
    pub fn new(jobs: Vec<FlinkJob>) -> Self {
        Self { jobs }
    }
}

#[async_trait::async_trait]
impl JobLocator for MockLocator {
    async fn find_all(&self) -> Vec<FlinkJob> {
        self.jobs.clone()
    }
}
