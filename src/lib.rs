// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod naming;
pub mod resolve;
pub mod task;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, RecorderSettings};
use crate::engine::{CapturePlan, ChannelSink, Orchestrator, StartRequest, TaskEvent};
use crate::errors::LivecapError;
use crate::resolve::StreamResolver;
use crate::task::{TaskRecord, format_elapsed};

/// Log directory from the CLI, falling back to `[config].log_dir`.
pub fn effective_log_dir(args: &CliArgs, cfg: &ConfigFile) -> Option<PathBuf> {
    args.log_dir
        .clone()
        .or_else(|| cfg.config.log_dir.as_ref().map(PathBuf::from))
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - stream resolution from the config's `[stream.*]` sections
/// - the orchestrator with real processes
/// - the event channel and the task table on stdout
/// - Ctrl-C handling (stop everything, sweep orphans)
pub async fn run(args: CliArgs, cfg: ConfigFile) -> Result<()> {
    let settings = RecorderSettings::from_config(&cfg)?;
    let requests = plan_requests(&cfg, args.only.as_deref()).await?;

    if args.dry_run {
        print_dry_run(&settings, &requests);
        return Ok(());
    }

    let (sink, mut events) = ChannelSink::new();
    let orchestrator = Orchestrator::with_system_processes(settings, Arc::new(sink))?;

    let mut started = 0usize;
    for (name, req) in requests {
        match orchestrator.start(req) {
            Ok(id) => {
                println!("started '{name}' as {id}");
                started += 1;
            }
            Err(e) => eprintln!("failed to start '{name}': {e}"),
        }
    }

    if started == 0 {
        info!("no recording started; exiting");
        return Ok(());
    }
    print_table(&orchestrator.list());

    // Ctrl-C -> stop everything.
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            // Keep the sender alive so a dead listener never reads as Ctrl-C.
            std::future::pending::<()>().await;
        }
        let _ = shutdown_tx.send(());
    });

    loop {
        tokio::select! {
            Ok(()) = &mut shutdown_rx => {
                info!("shutdown requested; stopping all recordings");
                let report = orchestrator.stop_all().await;
                println!(
                    "stopped {} task(s) ({} orphaned)",
                    report.stopped, report.orphans
                );
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&orchestrator, &event);
                print_table(&orchestrator.list());
                if orchestrator.recording_count() == 0 {
                    info!("no recording left; exiting");
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Resolve every selected stream and pick its quality.
async fn plan_requests(
    cfg: &ConfigFile,
    only: Option<&str>,
) -> Result<Vec<(String, StartRequest)>> {
    if let Some(name) = only {
        if !cfg.stream.contains_key(name) {
            return Err(LivecapError::ConfigError(format!(
                "--only: no [stream.{name}] section in config"
            ))
            .into());
        }
    }

    let resolver = cfg.resolver();
    let mut out = Vec::new();

    for (name, stream) in cfg.stream.iter() {
        if only.is_some_and(|o| o != name.as_str()) {
            continue;
        }

        let resolved = resolver.resolve(&stream.room).await?.into_result()?;
        let quality = resolved
            .pick_quality(stream.quality.as_deref())
            .ok_or_else(|| {
                LivecapError::Resolve(format!("stream '{name}' has no matching quality"))
            })?;

        debug!(stream = %name, quality = %quality.name, kind = %quality.kind, "stream resolved");
        out.push((
            name.clone(),
            StartRequest::new(
                quality.play_url.clone(),
                resolved.room_id.clone(),
                quality.name.clone(),
                resolved.title.clone(),
            ),
        ));
    }

    Ok(out)
}

fn print_event(orchestrator: &Orchestrator, event: &TaskEvent) {
    let title = orchestrator
        .get(event.task())
        .map(|r| r.title)
        .unwrap_or_else(|_| event.task().to_string());
    let now = Local::now().format("%H:%M:%S");

    match event {
        TaskEvent::Failed { message, .. } => {
            warn!(task = %event.task(), "recording failed");
            println!("[{now}] {title}: failed: {message}");
        }
        TaskEvent::Completed { .. } => println!("[{now}] {title}: completed"),
        TaskEvent::Stopped { .. } => println!("[{now}] {title}: stopped"),
    }
}

fn print_table(records: &[TaskRecord]) {
    println!(
        "{:<32} {:<24} {:<8} {:<10} {:<8} {:>8}",
        "ID", "TITLE", "QUALITY", "STATUS", "CREATED", "ELAPSED"
    );
    for r in records {
        println!(
            "{:<32} {:<24} {:<8} {:<10} {:<8} {:>8}",
            r.id.as_str(),
            r.title,
            r.quality_label,
            r.status().label(),
            r.created_at.format("%H:%M:%S"),
            format_elapsed(r.elapsed()),
        );
    }
}

/// Print what would be started without spawning anything.
fn print_dry_run(settings: &RecorderSettings, requests: &[(String, StartRequest)]) {
    println!("livecap dry-run");
    println!("  output_dir = {}", settings.output_dir.display());
    println!("  grace_period = {:?}", settings.grace_period);
    println!("  silent_exit = {:?}", settings.policy.silent_exit);
    println!();

    println!("streams ({}):", requests.len());
    let now = Local::now();
    for (name, req) in requests {
        let plan = CapturePlan::new(settings, req, now);
        println!("  - {name}");
        println!("      id: {}", plan.id);
        println!("      title: {}", plan.title);
        println!("      quality: {}", req.quality_label);
        println!("      output: {}", plan.output_path.display());
        println!("      cmd: {}", plan.command);
    }

    debug!("dry-run complete (nothing started)");
}
