//! Heimdall kubehub – FlinkDeployment listing with per-namespace fault isolation

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use heimdall_core::deployment::{self, FlinkDeployment};
use kube::{
    api::{Api, ListParams},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Client,
};

/// Optional knobs applied to every per-namespace list call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConstraints {
    /// Result cap per namespace.
    pub limit: Option<u32>,
    pub label_selector: Option<String>,
    /// Deadline for a single namespace; expiry counts as a failed fetch.
    pub timeout: Option<Duration>,
}

/// Cluster-side listing of raw FlinkDeployment records for one namespace.
#[async_trait::async_trait]
pub trait DeploymentSource: Send + Sync {
    async fn list(&self, namespace: &str, constraints: &ListConstraints) -> Result<Vec<FlinkDeployment>>;
}

/// [`DeploymentSource`] backed by the Kubernetes API via a dynamic `ApiResource`.
#[derive(Clone)]
pub struct KubeDeploymentSource {
    client: Client,
    ar: ApiResource,
}

impl KubeDeploymentSource {
    pub fn new(client: Client) -> Self {
        Self { client, ar: flink_deployment_resource() }
    }

    /// Build from the ambient kubeconfig or in-cluster service account.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await.context("creating kube client")?;
        Ok(Self::new(client))
    }
}

pub fn flink_deployment_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(deployment::GROUP, deployment::VERSION, deployment::KIND);
    ApiResource::from_gvk_with_plural(&gvk, deployment::PLURAL)
}

fn list_params(constraints: &ListConstraints) -> ListParams {
    let mut lp = ListParams::default();
    if let Some(limit) = constraints.limit {
        lp = lp.limit(limit);
    }
    if let Some(sel) = constraints.label_selector.as_deref().filter(|s| !s.trim().is_empty()) {
        lp = lp.labels(sel);
    }
    lp
}

#[async_trait::async_trait]
impl DeploymentSource for KubeDeploymentSource {
    async fn list(&self, namespace: &str, constraints: &ListConstraints) -> Result<Vec<FlinkDeployment>> {
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &self.ar);
        let list = api
            .list(&list_params(constraints))
            .await
            .with_context(|| format!("listing {} in namespace {}", deployment::PLURAL, namespace))?;
        Ok(decode_items(namespace, list.items))
    }
}

fn strip_managed_fields(v: &mut serde_json::Value) {
    if let Some(meta) = v.get_mut("metadata") {
        if let Some(obj) = meta.as_object_mut() {
            obj.remove("managedFields");
        }
    }
}

fn decode(obj: &DynamicObject) -> Result<FlinkDeployment> {
    let mut raw = serde_json::to_value(obj).context("serializing DynamicObject")?;
    strip_managed_fields(&mut raw);
    serde_json::from_value(raw).context("decoding FlinkDeployment")
}

/// Decode listed objects one by one; an item that does not decode is logged and skipped.
pub fn decode_items(namespace: &str, items: Vec<DynamicObject>) -> Vec<FlinkDeployment> {
    let mut out = Vec::with_capacity(items.len());
    for obj in items.iter() {
        match decode(obj) {
            Ok(d) => out.push(d),
            Err(e) => {
                let name = obj.metadata.name.as_deref().unwrap_or("");
                warn!(ns = %namespace, name = %name, error = ?e, "skipping undecodable FlinkDeployment");
                counter!("heimdall_decode_failures_total", 1u64, "namespace" => namespace.to_string());
            }
        }
    }
    out
}

/// Fault-isolating front for a [`DeploymentSource`].
///
/// A namespace that errors or times out contributes nothing instead of failing the
/// whole listing. There are no retries; each call is a fresh attempt.
#[derive(Clone)]
pub struct FlinkDeploymentClient {
    source: Arc<dyn DeploymentSource>,
}

impl FlinkDeploymentClient {
    pub fn new(source: Arc<dyn DeploymentSource>) -> Self {
        Self { source }
    }

    pub async fn find(&self, namespace: &str, constraints: &ListConstraints) -> Vec<FlinkDeployment> {
        let t0 = Instant::now();
        debug!(ns = %namespace, "fetching flink deployments");
        let res = match constraints.timeout {
            Some(t) => match tokio::time::timeout(t, self.source.list(namespace, constraints)).await {
                Ok(r) => r,
                Err(_) => Err(anyhow!("timed out after {:?}", t)),
            },
            None => self.source.list(namespace, constraints).await,
        };
        match res {
            Ok(items) => {
                debug!(ns = %namespace, count = items.len(), took_ms = %t0.elapsed().as_millis(), "fetched flink deployments");
                items
            }
            Err(e) => {
                error!(ns = %namespace, error = ?e, took_ms = %t0.elapsed().as_millis(), "error fetching flink deployments");
                counter!("heimdall_namespace_fetch_failures_total", 1u64, "namespace" => namespace.to_string());
                Vec::new()
            }
        }
    }

    /// Fetch each namespace in order, one after another, and concatenate.
    pub async fn find_all(&self, namespaces: &[String], constraints: &ListConstraints) -> Vec<FlinkDeployment> {
        debug!(namespaces = namespaces.len(), "fetching flink deployments from namespaces");
        let mut all = Vec::new();
        for ns in namespaces {
            all.extend(self.find(ns, constraints).await);
        }
        info!(count = all.len(), namespaces = ?namespaces, "fetched flink deployments");
        all
    }
}
