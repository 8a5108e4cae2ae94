use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tempfile::TempDir;

use collect_logs::bundle;
use collect_logs::cli::Args;
use collect_logs::collector;
use collect_logs::exec::{CommandRunner, SystemRunner};
use collect_logs::inner;
use collect_logs::juju::Juju;

fn main() -> Result<()> {
    let args = Args::parse();
    initialize_logging(args.verbose)?;

    let juju = Juju::new(
        &args.juju,
        args.model.as_deref(),
        args.cfgdir.as_deref(),
        !args.no_juju_ssh,
    );
    let runner = SystemRunner;

    // The staging tree is removed on every exit path, success or failure,
    // when the TempDir guard drops.
    let staging = TempDir::new().context("failed to create staging directory")?;
    info!("staging logs under {}", staging.path().display());

    run(&runner, &juju, staging.path(), &args)
}

fn run(runner: &dyn CommandRunner, juju: &Juju, staging: &Path, args: &Args) -> Result<()> {
    collector::collect_logs(runner, juju, staging, args.jobs)?;

    if !args.inner {
        // A missing or broken nested model never sinks the outer bundle.
        let script = env::current_exe().context("could not locate own executable")?;
        if let Err(err) = inner::collect_inner_logs(runner, juju, staging, &script) {
            warn!("inner model collection failed: {:#}", err);
        }
    }

    bundle::bundle_logs(runner, staging, &args.tarfile, &args.extrafiles)?;
    info!("logs collected into {}", args.tarfile.display());
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}
