//! Integration tests for a full collection pass.
//!
//! These drive the dispatcher end to end against a scripted command runner:
//! status queries answer with canned YAML, remote commands succeed or fail
//! per script, and pulls/extractions leave real files in a real staging
//! directory so the on-disk contract can be checked.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use tempfile::TempDir;

use collect_logs::collector::collect_logs;
use collect_logs::exec::{CommandRunner, ExecError};
use collect_logs::juju::Juju;
use collect_logs::topology::Status;

const STATUS_TWO_UNITS: &str = "applications:\n\
    \x20 ubuntu:\n\
    \x20   units:\n\
    \x20     ubuntu/1:\n\
    \x20       public-address: 1.2.3.4\n\
    \x20 ntp:\n\
    \x20   units:\n\
    \x20     ntp/1: {}\n";

const STATUS_EMPTY: &str = "applications: {}\n";

const STATUS_WITH_MACHINES: &str = "applications:\n\
    \x20 ubuntu:\n\
    \x20   units:\n\
    \x20     ubuntu/1:\n\
    \x20       public-address: 1.2.3.4\n\
    machines:\n\
    \x20 \"0\":\n\
    \x20   dns-name: 1.2.3.8\n";

/// Scripted [`CommandRunner`] for end-to-end tests. Pulls create the local
/// tarball, extractions populate the target directory, and one target's
/// pull can be scripted to fail.
struct FakeRunner {
    status_yaml: String,
    fail_pull_for: Option<String>,
    commands: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    fn new(status_yaml: &str) -> Self {
        FakeRunner {
            status_yaml: status_yaml.to_string(),
            fail_pull_for: None,
            commands: Mutex::new(Vec::new()),
        }
    }

    fn failing_pull(status_yaml: &str, safe_name: &str) -> Self {
        let mut runner = Self::new(status_yaml);
        runner.fail_pull_for = Some(format!("logs_{}.tar.gz", safe_name));
        runner
    }

    fn record(&self, argv: &[String]) {
        self.commands.lock().unwrap().push(argv.to_vec());
    }

    fn recorded(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn call(&self, argv: &[String], _env: &[(String, String)], _cwd: &Path) -> Result<i32, ExecError> {
        self.record(argv);
        Ok(0)
    }

    fn check_call(
        &self,
        argv: &[String],
        _env: &[(String, String)],
        cwd: &Path,
    ) -> Result<(), ExecError> {
        self.record(argv);
        if argv.first().map(String::as_str) == Some("tar")
            && argv.get(1).map(String::as_str) == Some("-C")
        {
            // Extraction: leave something behind in the target directory.
            fs::write(cwd.join(&argv[2]).join("syslog"), "log line\n").unwrap();
            return Ok(());
        }
        if argv.last().map(String::as_str) == Some(".") {
            // Pull (juju scp or direct scp): source is the remote-tagged arg.
            let source = argv.iter().find(|arg| arg.contains(":/tmp/")).unwrap();
            let filename = source.rsplit('/').next().unwrap().to_string();
            if self.fail_pull_for.as_deref() == Some(filename.as_str()) {
                return Err(ExecError::Exit {
                    command: argv.join(" "),
                    code: 1,
                    output: String::new(),
                });
            }
            fs::File::create(cwd.join(&filename)).unwrap();
            return Ok(());
        }
        // Pushes (local file to <target>:<path>) have no local side effect.
        Ok(())
    }

    fn check_output(
        &self,
        argv: &[String],
        _env: &[(String, String)],
        _cwd: &Path,
    ) -> Result<String, ExecError> {
        self.record(argv);
        if argv.get(1).map(String::as_str) == Some("status") {
            return Ok(self.status_yaml.clone());
        }
        if argv.first().map(String::as_str) == Some("git") {
            // Clone: provide the ps_mem checkout the collector expects.
            let clone_dir = Path::new(&argv[3]);
            fs::create_dir_all(clone_dir).unwrap();
            fs::write(clone_dir.join("ps_mem.py"), "# ps_mem\n").unwrap();
        }
        Ok(String::new())
    }
}

/// Status parsing end to end: one target per principal unit, address taken
/// from public-address when reported.
#[test]
fn test_status_yields_expected_targets() {
    let status = Status::parse(STATUS_TWO_UNITS).unwrap();
    let mut units = status.units();
    units.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].name, "ntp/1");
    assert_eq!(units[0].address, None);
    assert_eq!(units[1].name, "ubuntu/1");
    assert_eq!(units[1].address.as_deref(), Some("1.2.3.4"));
}

#[test]
fn test_collection_stages_one_directory_per_target() {
    let staging = TempDir::new().unwrap();
    let runner = FakeRunner::new(STATUS_TWO_UNITS);

    collect_logs(&runner, &Juju::default(), staging.path(), 4).unwrap();

    for dir in ["ubuntu-1", "ntp-1", "bootstrap"] {
        let path = staging.path().join(dir);
        assert!(path.is_dir(), "missing staging directory {}", dir);
        assert!(path.join("syslog").exists());
    }
    // The compressed intermediates are gone.
    for entry in fs::read_dir(staging.path()).unwrap() {
        let name = entry.unwrap().file_name();
        assert!(
            !name.to_string_lossy().ends_with(".tar.gz"),
            "leftover tarball {:?}",
            name
        );
    }
}

/// The bootstrap machine is collected even when the model has no units.
#[test]
fn test_bootstrap_target_is_always_collected() {
    let staging = TempDir::new().unwrap();
    let runner = FakeRunner::new(STATUS_EMPTY);

    collect_logs(&runner, &Juju::default(), staging.path(), 4).unwrap();

    assert!(staging.path().join("bootstrap").is_dir());
    let gzips: Vec<_> = runner
        .recorded()
        .iter()
        .filter(|argv| argv.last().map_or(false, |cmd| cmd.starts_with("sudo gzip")))
        .cloned()
        .collect();
    assert_eq!(gzips.len(), 1);
    assert!(gzips[0].last().unwrap().contains("/tmp/logs_bootstrap.tar"));
}

/// One target's failure stops only that target; the others complete, and
/// the error surfaces after every target was attempted.
#[test]
fn test_one_failing_target_does_not_stop_the_others() {
    let staging = TempDir::new().unwrap();
    let runner = FakeRunner::failing_pull(STATUS_TWO_UNITS, "ntp-1");

    let result = collect_logs(&runner, &Juju::default(), staging.path(), 4);
    assert!(result.is_err(), "per-target failure must surface after the join");

    // Both healthy targets were fully collected.
    assert!(staging.path().join("ubuntu-1").join("syslog").exists());
    assert!(staging.path().join("bootstrap").join("syslog").exists());
    assert!(!staging.path().join("ntp-1").exists());

    // The failed target still ran its remote sequence up to the pull.
    let ntp_gzip = runner
        .recorded()
        .iter()
        .any(|argv| argv.last().map_or(false, |cmd| cmd.contains("/tmp/logs_ntp-1.tar")));
    assert!(ntp_gzip, "failing target's remote steps should have run");
}

/// Machines reported by status get the memory-usage treatment before unit
/// collection starts, and the bootstrap machine's dns-name becomes the
/// bootstrap target's address.
#[test]
fn test_machines_get_memory_snapshot_and_name_the_bootstrap_address() {
    let staging = TempDir::new().unwrap();
    let runner = FakeRunner::new(STATUS_WITH_MACHINES);
    // Direct ssh so the addresses show up in the argument vectors.
    let juju = Juju::new("juju-2.1", None, Some("some-dir"), false);

    collect_logs(&runner, &juju, staging.path(), 4).unwrap();

    let recorded = runner.recorded();
    let shell_commands: Vec<&str> = recorded
        .iter()
        .filter(|argv| argv.first().map(String::as_str) == Some("/usr/bin/ssh"))
        .map(|argv| argv.last().unwrap().as_str())
        .collect();

    // One machine, so python was checked and the snapshot taken exactly once.
    let python_checks = shell_commands
        .iter()
        .filter(|cmd| **cmd == "if ! python -V; then sudo apt-get install -y python; fi")
        .count();
    assert_eq!(python_checks, 1);
    let snapshots = shell_commands
        .iter()
        .filter(|cmd| **cmd == "sudo /tmp/ps_mem.py -S | sudo tee /var/log/ps_mem.txt")
        .count();
    assert_eq!(snapshots, 1);

    // The utility was pushed to the machine's reported address.
    let pushed = recorded
        .iter()
        .any(|argv| argv.last().map(String::as_str) == Some("ubuntu@1.2.3.8:/tmp/ps_mem.py"));
    assert!(pushed, "ps_mem.py was not pushed to the machine");

    // The bootstrap pull went to the dns-name machine "0" reported.
    let bootstrap_pull = recorded.iter().any(|argv| {
        argv.iter()
            .any(|arg| arg == "ubuntu@1.2.3.8:/tmp/logs_bootstrap.tar.gz")
    });
    assert!(bootstrap_pull, "bootstrap pull did not use the reported address");

    assert!(staging.path().join("bootstrap").join("syslog").exists());
    assert!(staging.path().join("ubuntu-1").join("syslog").exists());
}

/// Remote command prefixes follow the transport profile, not the call site.
#[test]
fn test_commands_carry_the_model_selector() {
    let staging = TempDir::new().unwrap();
    let runner = FakeRunner::new(STATUS_EMPTY);
    let juju = Juju::new("juju-2.1", Some("controller"), Some("some-dir"), true);

    collect_logs(&runner, &juju, staging.path(), 1).unwrap();

    for argv in runner.recorded() {
        if argv.first().map(String::as_str) == Some("juju-2.1") {
            assert_eq!(argv[2], "-m", "missing model selector: {:?}", argv);
            assert_eq!(argv[3], "controller");
        }
    }
}
