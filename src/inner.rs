//! Nested-model recursion.
//!
//! Landscape deployments host a second Juju model inside the
//! landscape-server unit. Collecting its logs means probing that unit for a
//! bootstrapped inner environment, working out which Juju major version it
//! runs, uploading this very tool into the unit, invoking it there with
//! `--inner`, and pulling the bundle it produces back out.
//!
//! The outer and inner runs share nothing but the documented invocation
//! line and the fixed remote tarball path. Several conditions end the whole
//! step as a clean no-op: no landscape unit, no config directories, or
//! neither version probe succeeding.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::constants::{
    DEFAULT_MODEL, INNER_SCRIPT_PATH, INNER_TARBALL_PATH, JUJU_HOMES_ROOT, LANDSCAPE_APPS,
};
use crate::exec::CommandRunner;
use crate::juju::{Juju, JUJU1, JUJU2};
use crate::models::Target;
use crate::topology;

/// Collect logs from the nested model, if there is one.
///
/// `script` is the path of this tool's own executable, which gets uploaded
/// into the landscape unit for the inner run. Failures during upload,
/// invocation, or fetch propagate; the absence of a nested model does not.
pub fn collect_inner_logs(
    runner: &dyn CommandRunner,
    juju: &Juju,
    staging: &Path,
    script: &Path,
) -> Result<()> {
    let units = topology::get_units(runner, juju)?;
    let Some(unit) = find_landscape_unit(&units) else {
        info!("no landscape-server unit found, skipping inner model");
        return Ok(());
    };
    info!("collecting inner logs through {}", unit.name);

    disable_ssh_proxy(runner, juju, unit)?;

    let Some(cfgdir) = find_config_dir(runner, juju, unit)? else {
        info!("no inner juju configuration found, skipping inner model");
        return Ok(());
    };

    let Some(inner_juju) = detect_inner_juju(runner, juju, unit, &cfgdir)? else {
        info!("no bootstrapped inner model found, skipping inner model");
        return Ok(());
    };

    // Past this point the recursion is all-or-nothing: upload, invoke, and
    // fetch failures propagate. Cleanup of the tarball copies still runs.
    let result = run_inner_collection(runner, juju, staging, unit, &inner_juju, &cfgdir, script);

    let cleanup = format!("sudo rm -rf {}", INNER_TARBALL_PATH);
    match runner.call(&juju.ssh_args(unit, &cleanup), &juju.env(), staging) {
        Ok(0) => {}
        Ok(code) => warn!("remote tarball cleanup exited with status {}", code),
        Err(err) => warn!("remote tarball cleanup failed: {}", err),
    }
    let local_tarball = staging.join("inner-logs.tar.gz");
    if local_tarball.exists() {
        if let Err(err) = fs::remove_file(&local_tarball) {
            warn!("could not remove {}: {}", local_tarball.display(), err);
        }
    }
    result
}

/// The landscape-server unit (or its legacy alias), if deployed.
fn find_landscape_unit(units: &[Target]) -> Option<&Target> {
    units.iter().find(|unit| {
        unit.name
            .split('/')
            .next()
            .map(|app| LANDSCAPE_APPS.contains(&app))
            .unwrap_or(false)
    })
}

/// Turn off ssh proxying for the inner model so that untunneled scp works.
///
/// The Juju 2 form is tried first, falling back to the Juju 1 form. A
/// nonzero exit at either step just means "not applicable here"; only
/// transport failures propagate.
fn disable_ssh_proxy(runner: &dyn CommandRunner, juju: &Juju, unit: &Target) -> Result<()> {
    // The config dir is not known yet; let the remote shell pick the most
    // recently modified one.
    let latest_dir = format!("{root}`sudo ls -rt {root} | tail -1`", root = JUJU_HOMES_ROOT);
    let v2 = format!(
        "sudo JUJU_DATA={} {} model-config -m {} proxy-ssh=false",
        latest_dir, JUJU2, DEFAULT_MODEL
    );
    match runner.check_output(&juju.ssh_args(unit, &v2), &juju.env(), Path::new(".")) {
        Ok(_) => return Ok(()),
        Err(err) if err.is_exit() => {}
        Err(err) => return Err(err).context("disabling ssh proxy failed"),
    }
    let v1 = format!("sudo JUJU_HOME={} juju set-env proxy-ssh=false", latest_dir);
    match runner.check_output(&juju.ssh_args(unit, &v1), &juju.env(), Path::new(".")) {
        Ok(_) => Ok(()),
        Err(err) if err.is_exit() => Ok(()),
        Err(err) => Err(err).context("disabling ssh proxy failed"),
    }
}

/// Most recently modified per-user Juju config directory on the unit, or
/// `None` when there are none.
fn find_config_dir(
    runner: &dyn CommandRunner,
    juju: &Juju,
    unit: &Target,
) -> Result<Option<String>> {
    let listing = runner
        .check_output(
            &juju.ssh_args(unit, &format!("sudo ls -rt {}", JUJU_HOMES_ROOT)),
            &juju.env(),
            Path::new("."),
        )
        .context("listing inner juju configuration directories failed")?;
    Ok(listing
        .split_whitespace()
        .last()
        .map(|dir| format!("{}{}", JUJU_HOMES_ROOT, dir)))
}

/// Probe which Juju major version the inner model runs, by exit code:
/// Juju 2 first, then Juju 1. `None` when neither status query succeeds.
fn detect_inner_juju(
    runner: &dyn CommandRunner,
    juju: &Juju,
    unit: &Target,
    cfgdir: &str,
) -> Result<Option<Juju>> {
    let v2 = format!(
        "sudo JUJU_DATA={} {} status -m {} --format=yaml",
        cfgdir, JUJU2, DEFAULT_MODEL
    );
    if runner.call(&juju.ssh_args(unit, &v2), &juju.env(), Path::new("."))? == 0 {
        return Ok(Some(Juju::inner(JUJU2, Some(DEFAULT_MODEL), cfgdir)));
    }
    let v1 = format!(
        "sudo -u landscape JUJU_HOME={} juju status --format=yaml",
        cfgdir
    );
    if runner.call(&juju.ssh_args(unit, &v1), &juju.env(), Path::new("."))? == 0 {
        return Ok(Some(Juju::inner(JUJU1, None, cfgdir)));
    }
    Ok(None)
}

/// Command line that reruns this tool inside the unit against the inner
/// model. Juju 1 inner runs execute as the landscape user and carry no
/// model selector.
fn inner_invocation(inner_juju: &Juju, cfgdir: &str) -> String {
    if inner_juju.is_v1() {
        format!(
            "sudo -u landscape JUJU_HOME={} {} --inner --juju {} --cfgdir {} {}",
            cfgdir, INNER_SCRIPT_PATH, JUJU1, cfgdir, INNER_TARBALL_PATH
        )
    } else {
        format!(
            "sudo JUJU_DATA={} {} --inner --juju {} --model {} --cfgdir {} {}",
            cfgdir, INNER_SCRIPT_PATH, JUJU2, DEFAULT_MODEL, cfgdir, INNER_TARBALL_PATH
        )
    }
}

fn run_inner_collection(
    runner: &dyn CommandRunner,
    juju: &Juju,
    staging: &Path,
    unit: &Target,
    inner_juju: &Juju,
    cfgdir: &str,
    script: &Path,
) -> Result<()> {
    runner
        .check_call(
            &juju.push_args(unit, &script.to_string_lossy(), INNER_SCRIPT_PATH),
            &juju.env(),
            staging,
        )
        .context("uploading collect-logs to the landscape unit failed")?;

    runner
        .check_call(
            &juju.ssh_args(unit, &inner_invocation(inner_juju, cfgdir)),
            &juju.env(),
            staging,
        )
        .context("running collect-logs in the inner model failed")?;

    runner
        .check_call(
            &juju.pull_args(unit, INNER_TARBALL_PATH),
            &juju.env(),
            staging,
        )
        .context("downloading the inner-model bundle failed")?;

    let inner_dir = staging.join(format!("{}-inner-logs", unit.safe_name()));
    fs::create_dir_all(&inner_dir).context("creating the inner-logs directory failed")?;
    let extract = vec![
        "tar".to_string(),
        "-zxf".to_string(),
        staging.join("inner-logs.tar.gz").to_string_lossy().into_owned(),
    ];
    runner
        .check_call(&extract, &[], &inner_dir)
        .context("extracting the inner-model bundle failed")?;
    Ok(())
}
