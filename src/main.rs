//! SEAT - Listening-effort experiment controller
//!
//! Entry point for the block runner.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use seat::args::{CheckCommand, RunCommand, SeatArgs, SeatCommand};
use seat::runner::{check_files, run_block, RunError, TrialLog};
use seat::{AppConfig, BlockConfig, SeatError, Session};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("seat=info".parse()?),
        )
        .init();

    let args = SeatArgs::parse();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!(
        "║        SEAT v{} - Listening-Effort Experiment           ║",
        seat::VERSION
    );
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    match args.command {
        SeatCommand::Run(run) => run_command(&run),
        SeatCommand::Check(check) => check_command(&check),
    }
}

fn check_command(check: &CheckCommand) -> Result<()> {
    let report = check_files(
        &check.files.config,
        &check.files.block,
        check.save_resolved,
        |name| std::env::var(name).ok(),
    )
    .context("checking configuration")?;

    println!("Scene:     {:?}", report.scene);
    println!("Trials:    {}", report.trials);
    println!("Display:   {}", report.addresses.display);
    println!("Renderer:  {}", report.addresses.renderer);
    for (i, sampler) in report.addresses.samplers.iter().enumerate() {
        println!("Sampler {}: {}", i + 1, sampler);
    }
    if check.save_resolved {
        println!("Resolved addresses saved to {}", check.files.config.display());
    }
    println!();
    println!("Configuration OK.");
    Ok(())
}

fn run_command(run: &RunCommand) -> Result<()> {
    let config = AppConfig::load(&run.files.config)
        .with_context(|| format!("loading app config {}", run.files.config.display()))?;
    let block = BlockConfig::load(&run.files.block)
        .with_context(|| format!("loading block config {}", run.files.block.display()))?;
    let mut log = TrialLog::for_run(&run.log_base(), Local::now())?;

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("installing Ctrl+C handler")?;

    println!(
        "Running {} trial(s). Press Ctrl+C to stop after the current trial.",
        block.trials.len()
    );
    println!();

    let session = Session::from_config(config);
    match run_block(session, &block, &mut log, &running) {
        Ok(summary) => {
            info!(
                presented = summary.presented,
                total = summary.total,
                state = ?summary.final_state,
                "Block finished"
            );
            println!();
            if summary.interrupted {
                println!("Stopped after {}/{} trials.", summary.presented, summary.total);
            } else {
                println!("Presented {} trials.", summary.presented);
            }
            println!("Trial log: {}", log.path().display());
            Ok(())
        }
        Err(RunError::Seat(SeatError::RendererStart {
            reason,
            stdout,
            stderr,
        })) => {
            error!(%reason, "Renderer failed to start");
            println!("Renderer stdout:\n{}", stdout);
            println!("Renderer stderr:\n{}", stderr);
            anyhow::bail!("renderer failed to start: {}", reason)
        }
        Err(e) => Err(e.into()),
    }
}
