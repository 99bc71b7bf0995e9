use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use scoutsec::analyzer::Detector;
use scoutsec::cli::{Cli, Commands};
use scoutsec::config::ScoutConfig;
use scoutsec::distributed::{Master, MasterServer, WorkerAgent};
use scoutsec::fuzzer::{PayloadCatalog, VulnClass, mutate};
use scoutsec::http::HttpClient;
use scoutsec::reporter::{ConsoleReporter, FindingsSink, JsonExporter, ScanReport};
use scoutsec::scanner::{ScanRegistry, ScanStats};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "scoutsec=debug" } else { "scoutsec=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => ScoutConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScoutConfig::from_env().context("Invalid environment configuration")?,
    };

    match cli.command {
        Commands::Scan {
            url,
            workers,
            rate,
            retries,
            timeout,
            middleware,
            output,
            progress,
        } => {
            if let Some(w) = workers {
                config.fuzz.workers = w;
            }
            if let Some(r) = rate {
                config.transport.rate_per_second = r;
            }
            if let Some(r) = retries {
                config.transport.max_retries = r;
            }
            if let Some(t) = timeout {
                config.transport.timeout_secs = t;
            }
            config.fuzz.show_progress = progress;
            config.validate()?;

            run_scan(config, &url, middleware, output).await?;
        }

        Commands::Master {
            bind,
            targets,
            scan_type,
            lease_secs,
        } => {
            if let Some(b) = bind {
                config.master.bind = b;
            }
            if lease_secs.is_some() {
                config.master.lease_secs = lease_secs;
            }
            config.validate()?;

            run_master(config, targets, &scan_type).await?;
        }

        Commands::Worker {
            master_url,
            poll_interval,
            worker_id,
            workers,
        } => {
            if let Some(u) = master_url {
                config.worker.master_url = u;
            }
            if let Some(p) = poll_interval {
                config.worker.poll_interval_secs = p;
            }
            if worker_id.is_some() {
                config.worker.worker_id = worker_id;
            }
            if let Some(w) = workers {
                config.fuzz.workers = w;
            }
            config.validate()?;

            run_worker(config).await?;
        }

        Commands::Payloads { class } => {
            list_payloads(class.as_deref())?;
        }
    }

    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}

fn build_registry(config: &ScoutConfig) -> Result<ScanRegistry> {
    let transport = Arc::new(HttpClient::new(&config.transport)?);
    let detector = Arc::new(
        Detector::load(config.signatures.rules_file.as_deref()).context("Failed to load signatures")?,
    );
    Ok(ScanRegistry::with_defaults(transport, detector, config.fuzz.clone()))
}

async fn run_scan(
    config: ScoutConfig,
    url: &str,
    middleware: bool,
    output: Option<String>,
) -> Result<()> {
    let registry = build_registry(&config)?;
    let sink = FindingsSink::session_default();
    sink.register_observer(ConsoleReporter::print_live);

    let cancel = cancel_on_ctrl_c();
    println!("{} {}", "Scanning".bold(), url.cyan());

    let mut stats: ScanStats = registry.run("active", url, sink.clone(), &cancel).await?;
    if middleware && !cancel.is_cancelled() {
        stats.merge(&registry.run("middleware", url, sink.clone(), &cancel).await?);
    }

    let findings = sink.snapshot();
    let reporter = ConsoleReporter::new();
    reporter.print_findings(&findings);
    reporter.print_summary(&findings, Some(&stats));

    if let Some(path) = output {
        let scan_type = if middleware { "active+middleware" } else { "active" };
        JsonExporter::export(&ScanReport::new(url, scan_type, findings), &path)?;
        println!("Report written to {}", path.green());
    }

    Ok(())
}

async fn run_master(config: ScoutConfig, targets: Vec<String>, scan_type: &str) -> Result<()> {
    let sink = FindingsSink::session_default();
    sink.register_observer(ConsoleReporter::print_live);

    let mut master = Master::new(sink.clone());
    if let Some(secs) = config.master.lease_secs {
        master = master.with_lease(Duration::from_secs(secs));
    }
    let master = Arc::new(master);

    for target in &targets {
        master.create_task(target.as_str(), scan_type);
    }

    let server = MasterServer::bind(&config.master.bind, master.clone())
        .await
        .with_context(|| format!("Failed to bind {}", config.master.bind))?;
    info!(tasks = targets.len(), "Master ready");

    server.serve(cancel_on_ctrl_c()).await?;

    let findings = sink.snapshot();
    let reporter = ConsoleReporter::new();
    reporter.print_findings(&findings);
    reporter.print_summary(&findings, None);
    Ok(())
}

async fn run_worker(config: ScoutConfig) -> Result<()> {
    let registry = Arc::new(build_registry(&config)?);
    let agent = WorkerAgent::new(&config.worker, registry)?;

    agent
        .run(cancel_on_ctrl_c())
        .await
        .with_context(|| format!("Worker {} could not start", agent.id()))?;
    Ok(())
}

fn list_payloads(class: Option<&str>) -> Result<()> {
    let payloads = match class {
        Some(name) => match VulnClass::parse(name) {
            Some(c) => PayloadCatalog::by_class(c),
            None => bail!(
                "Unknown payload class '{}' (expected one of: {})",
                name,
                VulnClass::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
            ),
        },
        None => PayloadCatalog::default_payloads(),
    };

    for payload in &payloads {
        println!("\n[{}] {}", payload.class.to_string().yellow(), payload.name.bold());
        for (idx, variant) in mutate(payload.content).iter().enumerate() {
            println!("  {} {}", idx, variant);
        }
    }
    println!("\n{} payloads", payloads.len());
    Ok(())
}
