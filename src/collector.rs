//! Per-unit collection and the concurrent dispatcher.
//!
//! One collection pass discovers units and machines, takes a memory-usage
//! snapshot on every host, then fans the per-unit sequence (process
//! snapshot, remote archive, pull, extract) out across a bounded worker
//! pool. Each worker owns a disjoint staging subdirectory, so the workers
//! share no mutable state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::constants::{
    EXCLUDED_PATHS, LOG_PATHS, PS_MEM_OUTPUT_FILE, PS_MEM_REMOTE_PATH, PS_MEM_REPO,
    PS_OUTPUT_FILE,
};
use crate::exec::CommandRunner;
use crate::juju::Juju;
use crate::models::Target;
use crate::topology;

/// Run one full collection pass against `juju`, staging results under
/// `staging`, collecting at most `jobs` units concurrently.
///
/// Discovery failures and memory-snapshot failures propagate immediately.
/// A failure inside one unit's collection sequence stops only that unit;
/// every other unit still runs to completion, after which the first
/// per-unit error is propagated so the run exits nonzero.
pub fn collect_logs(
    runner: &dyn CommandRunner,
    juju: &Juju,
    staging: &Path,
    jobs: usize,
) -> Result<()> {
    let mut units = topology::get_units(runner, juju)?;
    let bootstrap_ip = topology::get_bootstrap_ip(runner, juju)?;
    // The bootstrap machine is not a unit, but controller-level logs live
    // there; collect from it like any other target.
    units.push(Target::unit("0", bootstrap_ip));

    let hosts = topology::get_hosts(runner, juju)?;
    for host in &hosts {
        upload_ps_mem(runner, juju, staging, host)?;
        create_ps_mem_output_file(runner, juju, host)?;
    }

    info!("collecting logs from {} targets", units.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("failed to build worker pool")?;
    let mut failures: Vec<(String, anyhow::Error)> = pool.install(|| {
        units
            .par_iter()
            .filter_map(|unit| {
                collect_from(runner, juju, staging, unit)
                    .err()
                    .map(|err| (unit.name.clone(), err))
            })
            .collect()
    });

    for (name, err) in &failures {
        warn!("collection from {} failed: {:#}", name, err);
    }
    let first = failures.drain(..).next();
    match first {
        Some((name, err)) => Err(err.context(format!("collection from {} failed", name))),
        None => Ok(()),
    }
}

/// Run the fixed diagnostic sequence against one target and pull the
/// resulting archive into the staging directory.
pub fn collect_from(
    runner: &dyn CommandRunner,
    juju: &Juju,
    staging: &Path,
    target: &Target,
) -> Result<()> {
    debug!("collecting from {}", target.name);
    create_ps_output_file(runner, juju, staging, target)?;
    create_log_tarball(runner, juju, staging, target)?;
    download_log_from_target(runner, juju, staging, target)?;
    Ok(())
}

fn create_ps_output_file(
    runner: &dyn CommandRunner,
    juju: &Juju,
    staging: &Path,
    target: &Target,
) -> Result<()> {
    let command = format!("ps fauxww | sudo tee {}", PS_OUTPUT_FILE);
    runner
        .check_output(&juju.ssh_args(target, &command), &juju.env(), staging)
        .with_context(|| format!("ps snapshot on {} failed", target.name))?;
    Ok(())
}

fn remote_tarball(target: &Target) -> String {
    format!("/tmp/logs_{}.tar", target.safe_name())
}

fn create_log_tarball(
    runner: &dyn CommandRunner,
    juju: &Juju,
    staging: &Path,
    target: &Target,
) -> Result<()> {
    let tarfile = remote_tarball(target);
    // --ignore-failed-read keeps one unreadable path from sinking the whole
    // archive; the ls guard drops paths that do not exist on this unit.
    let command = format!(
        "sudo tar --ignore-failed-read --exclude={} --exclude={} -cf {} \
         $(sudo sh -c \"ls -1d {} 2>/dev/null\")",
        EXCLUDED_PATHS[0],
        EXCLUDED_PATHS[1],
        tarfile,
        LOG_PATHS.join(" "),
    );
    runner
        .check_output(&juju.ssh_args(target, &command), &juju.env(), staging)
        .with_context(|| format!("archiving logs on {} failed", target.name))?;
    runner
        .check_output(
            &juju.ssh_args(target, &format!("sudo gzip -f {}", tarfile)),
            &juju.env(),
            staging,
        )
        .with_context(|| format!("compressing logs on {} failed", target.name))?;
    Ok(())
}

fn download_log_from_target(
    runner: &dyn CommandRunner,
    juju: &Juju,
    staging: &Path,
    target: &Target,
) -> Result<()> {
    let name = target.safe_name();
    let filename = format!("logs_{}.tar.gz", name);
    let local_copy = staging.join(&filename);

    let result = (|| -> Result<()> {
        runner
            .check_call(
                &juju.pull_args(target, &format!("/tmp/{}", filename)),
                &juju.env(),
                staging,
            )
            .with_context(|| format!("pulling logs from {} failed", target.name))?;
        fs::create_dir_all(staging.join(&name))
            .with_context(|| format!("creating staging directory {} failed", name))?;
        let extract = vec![
            "tar".to_string(),
            "-C".to_string(),
            name.clone(),
            "-xzf".to_string(),
            filename.clone(),
        ];
        runner
            .check_call(&extract, &[], staging)
            .with_context(|| format!("extracting logs from {} failed", target.name))?;
        Ok(())
    })();

    // The compressed intermediate is never left behind, success or failure.
    if local_copy.exists() {
        if let Err(err) = fs::remove_file(&local_copy) {
            warn!("could not remove {}: {}", local_copy.display(), err);
        }
    }
    result
}

/// Make sure a local copy of the ps_mem utility is staged, cloning it if
/// needed, and push it to `host`.
pub fn upload_ps_mem(
    runner: &dyn CommandRunner,
    juju: &Juju,
    staging: &Path,
    host: &Target,
) -> Result<()> {
    let script = get_ps_mem(
        runner,
        &staging.join("ps_mem.py"),
        PS_MEM_REPO,
        &staging.join("ps_mem"),
    )?;
    runner
        .check_call(
            &juju.push_args(host, &script.to_string_lossy(), PS_MEM_REMOTE_PATH),
            &juju.env(),
            staging,
        )
        .with_context(|| format!("pushing ps_mem.py to host {} failed", host.name))?;
    Ok(())
}

/// Local path of ps_mem.py, cloning the upstream repo when no copy is
/// staged yet.
fn get_ps_mem(
    runner: &dyn CommandRunner,
    script_file: &Path,
    repo: &str,
    clone_dir: &Path,
) -> Result<PathBuf> {
    if script_file.exists() {
        return Ok(script_file.to_path_buf());
    }
    let clone = vec![
        "git".to_string(),
        "clone".to_string(),
        repo.to_string(),
        clone_dir.to_string_lossy().into_owned(),
    ];
    runner
        .check_output(&clone, &[], Path::new("."))
        .context("cloning the ps_mem repository failed")?;
    let script = clone_dir.join("ps_mem.py");
    if !script.exists() {
        return Err(anyhow!("cloned ps_mem repository has no ps_mem.py"));
    }
    Ok(script)
}

/// Take the memory-usage snapshot on one host. The output lands in a file
/// under /var/log, which the bootstrap target's archive sweeps up.
pub fn create_ps_mem_output_file(
    runner: &dyn CommandRunner,
    juju: &Juju,
    host: &Target,
) -> Result<()> {
    runner
        .check_output(
            &juju.ssh_args(host, "if ! python -V; then sudo apt-get install -y python; fi"),
            &juju.env(),
            Path::new("."),
        )
        .with_context(|| format!("installing python on host {} failed", host.name))?;
    let command = format!(
        "sudo {} -S | sudo tee {}",
        PS_MEM_REMOTE_PATH, PS_MEM_OUTPUT_FILE
    );
    runner
        .check_output(&juju.ssh_args(host, &command), &juju.env(), Path::new("."))
        .with_context(|| format!("memory snapshot on host {} failed", host.name))?;
    Ok(())
}
