//! Core data models shared across the application.

use crate::constants::BOOTSTRAP_NAME;

/// Whether a [`Target`] came from the application-unit half of the topology
/// or the machine half. Machines are only used for the per-host memory
/// snapshot; everything else runs against units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Unit,
    Machine,
}

/// One addressable endpoint discovered from `juju status`.
///
/// `address` is `None` when the status output did not report a public
/// address for the target; such targets can only be reached by shelling
/// through the Juju binary, never by direct ssh.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub address: Option<String>,
    pub kind: TargetKind,
}

/// Equality is by (name, address). The bootstrap machine shows up both as
/// machine "0" during host discovery and as a synthetic unit-like
/// collection target; those refer to the same endpoint and compare equal.
impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.address == other.address
    }
}

impl Eq for Target {}

impl Target {
    pub fn unit(name: impl Into<String>, address: Option<String>) -> Self {
        Target {
            name: name.into(),
            address,
            kind: TargetKind::Unit,
        }
    }

    pub fn machine(name: impl Into<String>, address: Option<String>) -> Self {
        Target {
            name: name.into(),
            address,
            kind: TargetKind::Machine,
        }
    }

    /// Filesystem-safe rendering of the target name, used for its local
    /// staging subdirectory and its remote archive filename. Unit names
    /// contain a `/` (e.g. `haproxy/0`); the bootstrap machine is reported
    /// as plain `0` and gets a readable name instead.
    pub fn safe_name(&self) -> String {
        if self.name == "0" {
            BOOTSTRAP_NAME.to_string()
        } else {
            self.name.replace('/', "-")
        }
    }
}
