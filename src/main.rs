//! docpipe-setup - Main entry point
//!
//! Parses the command line, installs logging and signal handling, and hands
//! off to the provisioning library.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use docpipe_setup::cli::{Cli, Commands, TargetArgs};
use docpipe_setup::command_runner::ProcessRunner;
use docpipe_setup::config_file::SetupConfig;
use docpipe_setup::naming::EnvironmentContext;
use docpipe_setup::preflight;
use docpipe_setup::process_guard::{self, ChildCleanupGuard, SIGNAL_GRACE_PERIOD};
use docpipe_setup::provisioner::{Provisioner, resolve_project_id};

/// Initialize the tracing subscriber. Logs go to stderr; stdout carries progress.
fn init_logger(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.log_level());
    tracing::debug!("docpipe-setup starting up");

    // Terminate in-flight CLI calls on SIGINT/SIGTERM/SIGHUP
    if let Err(e) = process_guard::init_signal_handlers() {
        tracing::warn!(error = %e, "failed to initialize signal handlers");
    }
    let _cleanup = ChildCleanupGuard::new(SIGNAL_GRACE_PERIOD);

    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::error!(error = %message, "command failed");
            eprintln!("✗ {}", message);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Run {
            target,
            report,
            skip_preflight,
        } => run_setup(&target, cli.dry_run, report.as_deref(), skip_preflight),
        Commands::Names { target } => print_names(&target),
        Commands::Validate { config } => validate_config(&config),
        Commands::InitConfig { path, force } => init_config(&path, force),
    }
}

/// Load the config file (or defaults) and apply command-line overrides
fn load_config(target: &TargetArgs) -> Result<SetupConfig> {
    let mut config = SetupConfig::load_or_default(target.config.as_deref())?;
    if let Some(project) = &target.project {
        config.project_id = Some(project.clone());
    }
    if let Some(region) = &target.region {
        config.region = region.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run_setup(
    target: &TargetArgs,
    dry_run: bool,
    report_path: Option<&Path>,
    skip_preflight: bool,
) -> Result<ExitCode> {
    let config = load_config(target)?;

    if skip_preflight {
        tracing::warn!("skipping pre-flight checks");
    } else {
        let report = preflight::verify_environment();
        if !report.is_ok() {
            preflight::print_failure(&report);
        }
        report.into_result()?;
    }

    let runner = ProcessRunner::new(dry_run);
    let project = resolve_project_id(&runner, config.project_id.as_deref())?;
    let ctx = EnvironmentContext::new(&project, &config)?;

    if dry_run {
        println!("[DRY RUN] No changes will be made to project {}", ctx.project_id());
    }

    let mut provisioner = Provisioner::new(&runner);
    let outcome = provisioner.run(&ctx);
    let report = provisioner.into_report();

    println!();
    print!("{}", report.render_summary());

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        tracing::info!(path = %path.display(), "report written");
    }

    match outcome {
        Ok(()) => {
            println!("\n✓ Pipeline provisioned for project {}", ctx.project_id());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("\n✗ Provisioning aborted: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_names(target: &TargetArgs) -> Result<ExitCode> {
    let config = load_config(target)?;
    // Only the read-only project lookup can run here
    let runner = ProcessRunner::new(true);
    let project = resolve_project_id(&runner, config.project_id.as_deref())?;
    let ctx = EnvironmentContext::new(&project, &config)?;

    for (label, value) in ctx.name_rows() {
        println!("{:<18} {}", label, value);
    }
    Ok(ExitCode::SUCCESS)
}

fn validate_config(path: &Path) -> Result<ExitCode> {
    tracing::info!(path = %path.display(), "validating configuration file");
    let config = SetupConfig::load_from_file(path)?;
    match config.validate() {
        Ok(()) => {
            println!("✓ Configuration file is valid: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_config(path: &Path, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    SetupConfig::default().save_to_file(path)?;
    println!("✓ Wrote default configuration to {}", path.display());
    Ok(ExitCode::SUCCESS)
}
