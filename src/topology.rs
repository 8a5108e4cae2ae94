//! Topology discovery: turning `juju status` output into collection targets.
//!
//! The status document is tree-shaped YAML. Only two slices of it matter
//! here: the applications map (spelled `services` by Juju 1) with their
//! units, and the machines map. Subordinate applications are skipped
//! entirely; their units ride along on a principal unit and are not
//! independently addressable.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::exec::CommandRunner;
use crate::juju::Juju;
use crate::models::Target;

/// Machine id of the bootstrap/controller machine.
const BOOTSTRAP_MACHINE_ID: &str = "0";

/// The slices of a `juju status` document this tool consumes.
#[derive(Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default, alias = "services")]
    applications: HashMap<String, Application>,
    #[serde(default)]
    machines: HashMap<String, Machine>,
}

#[derive(Debug, Default, Deserialize)]
struct Application {
    #[serde(default, rename = "subordinate-to")]
    subordinate_to: Option<Vec<String>>,
    #[serde(default)]
    units: HashMap<String, UnitStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct UnitStatus {
    #[serde(default, rename = "public-address")]
    public_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Machine {
    #[serde(default, rename = "dns-name")]
    dns_name: Option<String>,
}

impl Status {
    pub fn parse(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("malformed juju status output")
    }

    /// One target per unit of every principal application. Units without a
    /// reported public address get `address: None`.
    pub fn units(&self) -> Vec<Target> {
        let mut targets = Vec::new();
        for app in self.applications.values() {
            if app.subordinate_to.is_some() {
                continue;
            }
            for (name, unit) in &app.units {
                targets.push(Target::unit(name.clone(), unit.public_address.clone()));
            }
        }
        targets
    }

    /// One target per machine in the model.
    pub fn machines(&self) -> Vec<Target> {
        self.machines
            .iter()
            .map(|(name, machine)| Target::machine(name.clone(), machine.dns_name.clone()))
            .collect()
    }

    /// Address of machine "0", if the status reported one.
    pub fn bootstrap_address(&self) -> Option<String> {
        self.machines
            .get(BOOTSTRAP_MACHINE_ID)
            .and_then(|machine| machine.dns_name.clone())
    }
}

fn fetch_status(runner: &dyn CommandRunner, juju: &Juju) -> Result<Status> {
    let output = runner
        .check_output(&juju.status_args(), &juju.env(), std::path::Path::new("."))
        .context("juju status query failed")?;
    Status::parse(&output)
}

/// Discover the principal units of the model.
pub fn get_units(runner: &dyn CommandRunner, juju: &Juju) -> Result<Vec<Target>> {
    Ok(fetch_status(runner, juju)?.units())
}

/// Discover the machines of the model (used for the memory snapshot).
pub fn get_hosts(runner: &dyn CommandRunner, juju: &Juju) -> Result<Vec<Target>> {
    Ok(fetch_status(runner, juju)?.machines())
}

/// Address of the bootstrap machine, `None` if status did not report one.
pub fn get_bootstrap_ip(runner: &dyn CommandRunner, juju: &Juju) -> Result<Option<String>> {
    Ok(fetch_status(runner, juju)?.bootstrap_address())
}
