//! # collect-logs
//!
//! Diagnostic log collector for Juju-managed deployments.
//!
//! Pointed at a deployment, the tool discovers every principal unit and
//! machine from `juju status`, runs a fixed diagnostic sequence on each
//! (process snapshot, memory-usage snapshot, targeted archive of log and
//! config paths), pulls the archives into a local staging directory, and
//! bundles everything into a single tarball. Landscape deployments host a
//! second Juju model inside the landscape-server unit; when one is found,
//! the tool uploads itself into that unit, reruns there with `--inner`, and
//! merges the nested bundle into the outer one.
//!
//! Both Juju major versions are supported through [`juju::Juju`] transport
//! profiles; call sites never branch on the version themselves.
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Collection targets and their safe-name mapping
//! - [`juju`]: Transport profiles and pure command-vector builders
//! - [`topology`]: `juju status` parsing into units, machines, bootstrap
//! - [`collector`]: Per-unit collection and the concurrent dispatcher
//! - [`inner`]: Nested-model recursion
//! - [`bundle`]: Final tarball creation
//! - [`exec`]: Subprocess seam shared by all of the above
//! - [`constants`]: The fixed diagnostic command surface

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Collection targets and their safe-name mapping
pub mod models;

/// Subprocess execution seam
pub mod exec;

/// Transport profiles and pure command-vector builders
pub mod juju;

/// Topology discovery from `juju status`
pub mod topology;

/// Per-unit collection and the concurrent dispatcher
pub mod collector;

/// Nested-model recursion
pub mod inner;

/// Final tarball creation
pub mod bundle;

/// Application-wide constants
pub mod constants;
