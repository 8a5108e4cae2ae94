//! Final bundling of the staging tree into one tarball.
//!
//! Everything the workers and the recursor staged, plus any caller-supplied
//! extra files, goes into a single gzipped tar. The `--transform` strips the
//! staging prefix so the archive members start at the per-target directory
//! names. Membership is sorted, which keeps repeated runs over the same
//! staging tree byte-identical in their member listing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::exec::CommandRunner;

/// Create `tarfile` from the contents of `staging` plus `extrafiles`.
pub fn bundle_logs(
    runner: &dyn CommandRunner,
    staging: &Path,
    tarfile: &Path,
    extrafiles: &[PathBuf],
) -> Result<()> {
    let mut argv = vec![
        "tar".to_string(),
        "czf".to_string(),
        tarfile.to_string_lossy().into_owned(),
        "--transform".to_string(),
        transform_expression(staging),
    ];
    for entry in staged_entries(staging)? {
        argv.push(entry.to_string_lossy().into_owned());
    }
    for extra in extrafiles {
        argv.push(extra.to_string_lossy().into_owned());
    }
    info!("bundling logs into {}", tarfile.display());
    runner
        .check_call(&argv, &[], Path::new("."))
        .context("creating the log bundle failed")?;
    Ok(())
}

/// Sed expression stripping the staging directory prefix from member names.
/// tar stores paths without the leading `/`, so the pattern drops it too.
fn transform_expression(staging: &Path) -> String {
    let stripped = staging.to_string_lossy();
    format!("s,{}/,,", stripped.trim_start_matches('/'))
}

fn staged_entries(staging: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(staging)
        .with_context(|| format!("reading staging directory {} failed", staging.display()))?
    {
        entries.push(entry.context("reading staging directory entry failed")?.path());
    }
    entries.sort();
    Ok(entries)
}
