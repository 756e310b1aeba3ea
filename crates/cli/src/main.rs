use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use heimdall_api::{locator_from_config, AppConfig, FlinkJob, JobLocator};
use heimdall_core::{JM_LABEL, TM_LABEL};

#[derive(Parser, Debug)]
#[command(name = "heimdallctl", version, about = "List Flink jobs managed by the Kubernetes operator")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json, Yaml }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List jobs across the watched namespaces
    Jobs {
        /// Comma-separated namespaces (overrides HEIMDALL_JOBLOCATOR_K8S_OPERATOR_NAMESPACE_TO_WATCH)
        #[arg(long = "namespaces")]
        namespaces: Option<String>,
        /// Max deployments fetched per namespace
        #[arg(long = "limit")]
        limit: Option<u32>,
        /// Label selector, e.g. "team=data"
        #[arg(short = 'l', long = "selector")]
        selector: Option<String>,
    },
    /// Show the client-facing configuration (version, display and link patterns)
    Config,
    /// Show the namespaces that would be queried
    Namespaces {
        #[arg(long = "namespaces")]
        namespaces: Option<String>,
    },
}

fn init_tracing() {
    let env = std::env::var("HEIMDALL_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("HEIMDALL_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid HEIMDALL_METRICS_ADDR; expected host:port");
        }
    }
}

fn print_structured<T: serde::Serialize>(output: Output, value: &T) -> Result<()> {
    match output {
        Output::Yaml => print!("{}", serde_yaml::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let mut cfg = AppConfig::from_env();

    match cli.command {
        Commands::Jobs { namespaces, limit, selector } => {
            if namespaces.is_some() { cfg.joblocator.namespace_to_watch = namespaces; }
            if limit.is_some() { cfg.joblocator.list_limit = limit; }
            if selector.is_some() { cfg.joblocator.label_selector = selector; }
            info!(namespaces = ?cfg.joblocator.namespaces_to_watch(), "jobs invoked");
            let locator = match locator_from_config(&cfg).await {
                Ok(l) => l,
                Err(e) => {
                    error!(error = %e, "cannot build job locator");
                    eprintln!("jobs error: {}", e);
                    std::process::exit(1);
                }
            };
            let jobs = locator.find_all().await;
            match cli.output {
                Output::Human => {
                    println!("{:<14} {:<28} {:<12} {:<12} {:>4} {:<7} {:<8} {:<7} {:<7} IMAGE", "NAMESPACE", "NAME", "TYPE", "STATUS", "PAR", "FLINK", "JM", "TM", "AGE");
                    let now_ms = chrono::Utc::now().timestamp_millis();
                    for job in jobs.iter() {
                        println!("{}", render_row(job, now_ms));
                    }
                }
                _ => print_structured(cli.output, &jobs)?,
            }
        }
        Commands::Config => {
            let view = cfg.view();
            match cli.output {
                Output::Human => {
                    println!("version: {}", view.app_version);
                    for (k, v) in view.patterns.iter() { println!("pattern {} = {}", k, v); }
                    for (k, v) in view.endpoint_path_patterns.iter() { println!("endpoint {} = {}", k, v); }
                }
                _ => print_structured(cli.output, &view)?,
            }
        }
        Commands::Namespaces { namespaces } => {
            if namespaces.is_some() { cfg.joblocator.namespace_to_watch = namespaces; }
            let resolved = cfg.joblocator.namespaces_to_watch();
            match cli.output {
                Output::Human => {
                    for ns in resolved.iter() { println!("{}", ns); }
                }
                _ => print_structured(cli.output, &resolved)?,
            }
        }
    }

    Ok(())
}

fn render_row(job: &FlinkJob, now_ms: i64) -> String {
    let replicas = |role: &str| job.resources.get(role).map(|r| r.replicas.to_string()).unwrap_or_else(|| "-".to_string());
    let par = if job.parallelism == 0 { "?".to_string() } else { job.parallelism.to_string() };
    format!(
        "{:<14} {:<28} {:<12} {:<12} {:>4} {:<7} {:<8} {:<7} {:<7} {}",
        job.namespace,
        job.name,
        job.job_type.to_string(),
        job.status,
        par,
        job.flink_version.as_deref().unwrap_or("-"),
        replicas(JM_LABEL),
        replicas(TM_LABEL),
        render_age(job.start_time, now_ms),
        job.short_image.as_deref().unwrap_or("-"),
    )
}

fn render_age(start_ms: Option<i64>, now_ms: i64) -> String {
    let Some(start) = start_ms else { return "-".to_string() };
    let mut secs = ((now_ms - start).max(0) / 1000) as u64;
    let days = secs / 86_400; secs %= 86_400;
    let hours = secs / 3600; secs %= 3600;
    let mins = secs / 60; secs %= 60;
    if days > 0 { format!("{}d{}h", days, hours) }
    else if hours > 0 { format!("{}h{}m", hours, mins) }
    else if mins > 0 { format!("{}m", mins) }
    else { format!("{}s", secs) }
}
