//! Transport abstraction over the Juju CLI.
//!
//! A [`Juju`] value fully determines how every remote operation is issued:
//! which binary to shell through, whether a `-m <model>` selector is needed,
//! and which environment variable carries the config-directory override.
//! The `*_args` builders are pure: they produce argument vectors and never
//! touch the network themselves, so supporting a new CLI major version means
//! adding a preset here rather than branching at call sites.

use crate::models::Target;

/// Binary name for Juju 1 deployments.
pub const JUJU1: &str = "juju";

/// Binary name for Juju 2 deployments.
pub const JUJU2: &str = "juju-2.1";

/// Transport profile for one collection run (or one recursion level).
///
/// Constructed once and passed down immutably; the nested-model recursor
/// builds a fresh profile for the inner level instead of mutating this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Juju {
    /// Juju executable to shell through.
    pub binary: String,
    /// Model selector, present only for nested Juju 2 models.
    pub model: Option<String>,
    /// Config-directory override; sets `JUJU_DATA` (v2) or `JUJU_HOME` (v1)
    /// on every command issued through this profile.
    pub cfgdir: Option<String>,
    /// When false, units that expose a public address are reached by direct
    /// ssh/scp instead of shelling through the Juju binary.
    pub juju_ssh: bool,
}

impl Default for Juju {
    fn default() -> Self {
        Juju::new(JUJU1, None, None, true)
    }
}

impl Juju {
    pub fn new(
        binary: &str,
        model: Option<&str>,
        cfgdir: Option<&str>,
        juju_ssh: bool,
    ) -> Self {
        Juju {
            binary: binary.to_string(),
            model: model.map(String::from),
            cfgdir: cfgdir.map(String::from),
            juju_ssh,
        }
    }

    /// Profile for a nested ("inner") model reached through its config dir.
    /// Juju 2 nested controllers live in the "controller" model; Juju 1 has
    /// no model selector.
    pub fn inner(binary: &str, model: Option<&str>, cfgdir: &str) -> Self {
        if binary == JUJU1 {
            Juju::new(binary, None, Some(cfgdir), true)
        } else {
            Juju::new(binary, model, Some(cfgdir), true)
        }
    }

    /// True for the legacy Juju 1 command surface.
    pub fn is_v1(&self) -> bool {
        self.binary == JUJU1
    }

    /// Environment overlay applied to every command issued through this
    /// profile. Empty unless a config directory override is set.
    pub fn env(&self) -> Vec<(String, String)> {
        let var = if self.is_v1() { "JUJU_HOME" } else { "JUJU_DATA" };
        self.cfgdir
            .iter()
            .map(|dir| (var.to_string(), dir.clone()))
            .collect()
    }

    /// `-m <model>` selector arguments, empty when no model is set.
    pub fn model_args(&self) -> Vec<String> {
        match &self.model {
            Some(model) => vec!["-m".to_string(), model.clone()],
            None => Vec::new(),
        }
    }

    /// Identity file used for the direct-ssh fast path, derived from the
    /// config directory.
    fn identity_file(&self) -> Option<String> {
        self.cfgdir.as_ref().map(|dir| format!("{}/ssh/juju_id_rsa", dir))
    }

    /// Direct ssh/scp is only possible when it was requested, the target
    /// reported a real address, and we know where the identity file lives.
    fn direct(&self, target: &Target) -> Option<(String, String)> {
        if self.juju_ssh {
            return None;
        }
        match (&target.address, self.identity_file()) {
            (Some(address), Some(identity)) => Some((address.clone(), identity)),
            _ => None,
        }
    }

    /// Argument vector for a status query against this profile's model.
    pub fn status_args(&self) -> Vec<String> {
        let mut args = vec![self.binary.clone(), "status".to_string()];
        args.extend(self.model_args());
        args.push("--format=yaml".to_string());
        args
    }

    /// Argument vector running `command` on `target` over a remote shell.
    pub fn ssh_args(&self, target: &Target, command: &str) -> Vec<String> {
        if let Some((address, identity)) = self.direct(target) {
            return vec![
                "/usr/bin/ssh".to_string(),
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                "-i".to_string(),
                identity,
                format!("ubuntu@{}", address),
                command.to_string(),
            ];
        }
        let mut args = vec![self.binary.clone(), "ssh".to_string()];
        args.extend(self.model_args());
        args.push(target.name.clone());
        args.push(command.to_string());
        args
    }

    /// Argument vector copying `remote_file` from `target` into the working
    /// directory.
    pub fn pull_args(&self, target: &Target, remote_file: &str) -> Vec<String> {
        if let Some((address, identity)) = self.direct(target) {
            return vec![
                "/usr/bin/scp".to_string(),
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                "-i".to_string(),
                identity,
                format!("ubuntu@{}:{}", address, remote_file),
                ".".to_string(),
            ];
        }
        let mut args = vec![self.binary.clone(), "scp".to_string()];
        args.extend(self.model_args());
        args.push(format!("{}:{}", target.name, remote_file));
        args.push(".".to_string());
        args
    }

    /// Argument vector copying `local_file` to `remote_path` on `target`.
    pub fn push_args(&self, target: &Target, local_file: &str, remote_path: &str) -> Vec<String> {
        if let Some((address, identity)) = self.direct(target) {
            return vec![
                "/usr/bin/scp".to_string(),
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                "-i".to_string(),
                identity,
                local_file.to_string(),
                format!("ubuntu@{}:{}", address, remote_path),
            ];
        }
        let mut args = vec![self.binary.clone(), "scp".to_string()];
        args.extend(self.model_args());
        args.push(local_file.to_string());
        args.push(format!("{}:{}", target.name, remote_path));
        args
    }
}
