//! Command-line interface definitions and argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::constants::DEFAULT_JOBS;

/// Command-line arguments for the collect-logs tool.
///
/// The `--inner`, `--juju`, `--model`, and `--cfgdir` flags form the
/// contract with the nested-model recursor: an outer run invokes the
/// uploaded copy of this tool with exactly these flags, so their spelling
/// must stay stable.
#[derive(Parser, Debug)]
#[clap(name = "collect-logs", about = "Collect diagnostic logs from a Juju deployment")]
pub struct Args {
    /// Path of the tarball to create
    pub tarfile: PathBuf,

    /// Extra files to include in the bundle
    pub extrafiles: Vec<PathBuf>,

    /// Juju binary to drive the deployment with ("juju" selects the legacy
    /// Juju 1 command forms, anything else the Juju 2 forms)
    #[clap(long, default_value = "juju")]
    pub juju: String,

    /// Model to operate on (Juju 2 only)
    #[clap(long)]
    pub model: Option<String>,

    /// Juju configuration directory override (sets JUJU_DATA or JUJU_HOME)
    #[clap(long)]
    pub cfgdir: Option<String>,

    /// This run is already inside a nested model; skip recursion
    #[clap(long)]
    pub inner: bool,

    /// Connect directly to unit addresses where possible instead of
    /// proxying through "juju ssh"
    #[clap(long)]
    pub no_juju_ssh: bool,

    /// Number of units collected in parallel
    #[clap(long, default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["collect-logs", "/tmp/logs.tgz"]);
        assert_eq!(args.tarfile, PathBuf::from("/tmp/logs.tgz"));
        assert!(args.extrafiles.is_empty());
        assert_eq!(args.juju, "juju");
        assert!(!args.inner);
        assert!(!args.no_juju_ssh);
        assert_eq!(args.jobs, DEFAULT_JOBS);
    }

    #[test]
    fn test_parses_the_nested_invocation_line() {
        // The exact flags an outer run passes to the uploaded copy.
        let args = Args::parse_from([
            "collect-logs",
            "--inner",
            "--juju",
            "juju-2.1",
            "--model",
            "controller",
            "--cfgdir",
            "/var/lib/landscape/juju-homes/0",
            "/tmp/inner-logs.tar.gz",
        ]);
        assert!(args.inner);
        assert_eq!(args.juju, "juju-2.1");
        assert_eq!(args.model.as_deref(), Some("controller"));
        assert_eq!(args.cfgdir.as_deref(), Some("/var/lib/landscape/juju-homes/0"));
        assert_eq!(args.tarfile, PathBuf::from("/tmp/inner-logs.tar.gz"));
    }

    #[test]
    fn test_extra_files_follow_the_tarfile() {
        let args = Args::parse_from(["collect-logs", "/tmp/logs.tgz", "spam.py", "eggs.py"]);
        assert_eq!(
            args.extrafiles,
            vec![PathBuf::from("spam.py"), PathBuf::from("eggs.py")]
        );
    }
}
