//! Global constants for the collect-logs application.
//!
//! This module centralizes the fixed diagnostic command surface: which paths
//! get archived from every unit, which paths are excluded, and where the
//! remote side effects land. The collector and the nested-model recursor
//! take these explicitly instead of reaching into ambient scope.

/// Default number of units collected in parallel.
pub const DEFAULT_JOBS: usize = 4;

/// Model used for nested-model collection on Juju 2 controllers.
pub const DEFAULT_MODEL: &str = "controller";

/// Paths archived from every unit. Globs are expanded remotely; paths that
/// do not exist on a given unit are skipped by the `ls -1d` guard.
pub const LOG_PATHS: [&str; 14] = [
    "/var/log",
    "/etc/hosts",
    "/etc/network",
    "/var/crash",
    "/var/lib/landscape/client",
    "/etc/apache2",
    "/etc/haproxy",
    "/var/lib/lxc/*/rootfs/var/log",
    "/var/lib/juju/containers",
    "/etc/nova",
    "/etc/swift",
    "/etc/neutron",
    "/etc/ceph",
    "/etc/glance",
];

/// Paths excluded from every unit archive: the package hash-id cache is large
/// and reproducible, and LXC template containers are noise.
pub const EXCLUDED_PATHS: [&str; 2] = [
    "/var/lib/landscape/client/package/hash-id",
    "/var/lib/juju/containers/juju-*-lxc-template",
];

/// Remote file the process snapshot is written to (swept up by the archive).
pub const PS_OUTPUT_FILE: &str = "/var/log/ps-fauxww.txt";

/// Remote file the per-host memory snapshot is written to.
pub const PS_MEM_OUTPUT_FILE: &str = "/var/log/ps_mem.txt";

/// Where the ps_mem diagnostic utility is cloned from when not staged locally.
pub const PS_MEM_REPO: &str = "https://github.com/pixelb/ps_mem";

/// Remote location the ps_mem utility is pushed to on each host.
pub const PS_MEM_REMOTE_PATH: &str = "/tmp/ps_mem.py";

/// Remote location this tool is uploaded to for a nested run.
pub const INNER_SCRIPT_PATH: &str = "/tmp/collect-logs";

/// Remote tarball a nested run writes its bundle to.
pub const INNER_TARBALL_PATH: &str = "/tmp/inner-logs.tar.gz";

/// Root of the per-user Juju configuration directories inside the
/// landscape-server unit.
pub const JUJU_HOMES_ROOT: &str = "/var/lib/landscape/juju-homes/";

/// Application names whose unit hosts the nested model. "landscape" is the
/// legacy name of "landscape-server".
pub const LANDSCAPE_APPS: [&str; 2] = ["landscape-server", "landscape"];

/// Staging directory name (and remote archive name) used for the bootstrap
/// machine, which Juju reports simply as "0".
pub const BOOTSTRAP_NAME: &str = "bootstrap";
