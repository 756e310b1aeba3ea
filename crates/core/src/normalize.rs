//! Raw `FlinkDeployment` → [`FlinkJob`] mapping.
//!
//! Fields that need fallbacks are resolved by ordered rule lists: each rule either
//! yields a value or passes, and the first value wins. Scratch values (job type,
//! resolved task manager replicas) live in a per-call [`Facts`] and never escape it.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::deployment::{FlinkDeployment, Resource};
use crate::{FlinkJob, FlinkJobResources, FlinkJobType, JM_LABEL, TM_LABEL, UNKNOWN_STATUS};

pub const TM_NUMBER_OF_TASK_SLOTS: &str = "taskmanager.numberOfTaskSlots";

/// Operator default when the job manager spec omits `replicas`.
const JM_DEFAULT_REPLICAS: u32 = 1;

struct Facts<'a> {
    deployment: &'a FlinkDeployment,
    name: &'a str,
    tm_replicas: Option<u32>,
}

type ReplicaRule = fn(&FlinkDeployment, FlinkJobType) -> Option<u32>;
type ParallelismRule = fn(&Facts<'_>) -> Option<u32>;

const TM_REPLICA_RULES: &[ReplicaRule] = &[declared_tm_replicas, reported_tm_replicas, declared_tm_replicas_or_zero];
const PARALLELISM_RULES: &[ParallelismRule] = &[job_spec_parallelism, slots_times_replicas];

pub fn to_flink_job(d: &FlinkDeployment) -> FlinkJob {
    let name = d.metadata.name.clone().unwrap_or_default();
    let namespace = d.metadata.namespace.clone().unwrap_or_default();
    debug!(name = %name, ns = %namespace, "normalizing flink deployment");

    let job_type = job_type(d);
    let tm_replicas = resolve_tm_replicas(d, job_type);
    let facts = Facts { deployment: d, name: &name, tm_replicas };
    let parallelism = infer_parallelism(&facts);

    FlinkJob {
        id: job_id(d, &namespace, &name),
        status: status(d),
        job_type,
        start_time: start_time(d),
        short_image: d.spec.image.as_deref().map(short_image),
        flink_version: d.spec.flink_version.as_deref().map(normalize_version),
        parallelism,
        resources: resources(d, tm_replicas),
        metadata: d.metadata.labels.clone().unwrap_or_default(),
        name,
        namespace,
    }
}

fn job_id(d: &FlinkDeployment, namespace: &str, name: &str) -> String {
    match d.metadata.uid.as_deref() {
        Some(uid) if !uid.is_empty() => uid.to_string(),
        _ => format!("{}/{}", namespace, name),
    }
}

pub fn job_type(d: &FlinkDeployment) -> FlinkJobType {
    if d.spec.job.is_some() {
        FlinkJobType::Application
    } else {
        FlinkJobType::Session
    }
}

pub fn status(d: &FlinkDeployment) -> String {
    d.status
        .as_ref()
        .and_then(|s| s.job_status.as_ref())
        .and_then(|j| j.state.clone())
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string())
}

/// Reported start time in epoch millis; `None` when unset or not an integer.
pub fn start_time(d: &FlinkDeployment) -> Option<i64> {
    let raw = d.status.as_ref()?.job_status.as_ref()?.start_time.as_deref()?;
    match raw.trim().parse::<i64>() {
        Ok(ms) => Some(ms),
        Err(e) => {
            debug!(start_time = %raw, error = %e, "ignoring unparseable start time");
            None
        }
    }
}

/// Drop everything up to and including the first `/`.
pub fn short_image(image: &str) -> String {
    match image.split_once('/') {
        Some((_, rest)) => rest.to_string(),
        None => image.to_string(),
    }
}

/// `v1_15` → `1.15`. Already dotted input is returned unchanged.
pub fn normalize_version(raw: &str) -> String {
    raw.strip_prefix('v').unwrap_or(raw).replace('_', ".")
}

/// Task manager replicas, falling back to the reported count for application jobs
/// whose spec leaves it unset (the operator may have scaled the deployment).
pub fn resolve_tm_replicas(d: &FlinkDeployment, job_type: FlinkJobType) -> Option<u32> {
    TM_REPLICA_RULES.iter().find_map(|rule| rule(d, job_type))
}

fn declared_tm_replicas(d: &FlinkDeployment, _: FlinkJobType) -> Option<u32> {
    count(d.spec.task_manager.as_ref()?.replicas).filter(|n| *n != 0)
}

fn reported_tm_replicas(d: &FlinkDeployment, job_type: FlinkJobType) -> Option<u32> {
    if job_type != FlinkJobType::Application {
        return None;
    }
    let reported = count(d.status.as_ref()?.task_manager.as_ref()?.replicas)?;
    debug!(
        name = %d.metadata.name.as_deref().unwrap_or(""),
        replicas = reported,
        "task manager replicas not set in spec, using status value"
    );
    Some(reported)
}

fn declared_tm_replicas_or_zero(d: &FlinkDeployment, _: FlinkJobType) -> Option<u32> {
    count(d.spec.task_manager.as_ref()?.replicas)
}

/// Job parallelism: declared value, else slots per task manager × replicas, else 0.
///
/// The slot-based estimate assumes every slot is free and static. It is off for
/// shared session clusters, autoscaled deployments and custom slot sharing groups.
pub fn parallelism(d: &FlinkDeployment) -> u32 {
    let name = d.metadata.name.as_deref().unwrap_or("");
    let tm_replicas = resolve_tm_replicas(d, job_type(d));
    infer_parallelism(&Facts { deployment: d, name, tm_replicas })
}

fn infer_parallelism(facts: &Facts<'_>) -> u32 {
    match PARALLELISM_RULES.iter().find_map(|rule| rule(facts)) {
        Some(p) => p,
        None => {
            warn!(
                name = %facts.name,
                task_slots = ?facts.deployment.spec.config_value(TM_NUMBER_OF_TASK_SLOTS),
                replicas = ?facts.tm_replicas,
                "could not determine parallelism"
            );
            0
        }
    }
}

fn job_spec_parallelism(facts: &Facts<'_>) -> Option<u32> {
    let declared = count(facts.deployment.spec.job.as_ref()?.parallelism).filter(|p| *p != 0)?;
    debug!(name = %facts.name, parallelism = declared, "using job spec parallelism");
    Some(declared)
}

fn slots_times_replicas(facts: &Facts<'_>) -> Option<u32> {
    let raw = facts.deployment.spec.config_value(TM_NUMBER_OF_TASK_SLOTS)?;
    let replicas = facts.tm_replicas?;
    let slots = match raw.trim().parse::<u32>() {
        Ok(n) => n,
        Err(e) => {
            warn!(name = %facts.name, task_slots = %raw, error = %e, "ignoring non-numeric task slot count");
            return None;
        }
    };
    let p = slots.saturating_mul(replicas);
    debug!(name = %facts.name, parallelism = p, task_slots = slots, replicas, "calculated parallelism");
    Some(p)
}

fn resources(d: &FlinkDeployment, tm_replicas: Option<u32>) -> BTreeMap<String, FlinkJobResources> {
    let mut out = BTreeMap::new();
    if let Some(jm) = d.spec.job_manager.as_ref() {
        let replicas = count(jm.replicas).unwrap_or(JM_DEFAULT_REPLICAS);
        out.insert(JM_LABEL.to_string(), sized(replicas, jm.resource.as_ref()));
    }
    if let Some(tm) = d.spec.task_manager.as_ref() {
        out.insert(TM_LABEL.to_string(), sized(tm_replicas.unwrap_or(0), tm.resource.as_ref()));
    }
    out
}

fn sized(replicas: u32, resource: Option<&Resource>) -> FlinkJobResources {
    FlinkJobResources {
        replicas,
        cpu: resource.and_then(|r| r.cpu).map(render_cpu),
        mem: resource.and_then(|r| r.memory.clone()),
    }
}

/// Whole CPU counts keep one fractional digit (`1` → `1.0`), matching how the CRD echoes them.
fn render_cpu(cpu: f64) -> String {
    if cpu.is_finite() && cpu.fract() == 0.0 {
        format!("{:.1}", cpu)
    } else {
        cpu.to_string()
    }
}

fn count(v: Option<i64>) -> Option<u32> {
    v.and_then(|n| u32::try_from(n).ok())
}
