//! Subprocess execution seam.
//!
//! Every remote interaction in this tool is a local subprocess (`juju ssh`,
//! `juju scp`, `ssh`, `tar`, `git`). The [`CommandRunner`] trait is the single
//! choke point those subprocesses go through, which keeps the orchestration
//! logic testable without a live deployment.
//!
//! The error type deliberately distinguishes a command that ran and exited
//! nonzero ([`ExecError::Exit`]) from a command that could not be run or
//! communicated with at all ([`ExecError::Transport`]). The nested-model
//! recursor branches on exactly that split: an ordinary failure means "not
//! applicable, try the next thing", a transport failure always propagates.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;
use thiserror::Error;

/// Error from running one subprocess.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The command ran to completion but exited nonzero.
    #[error("`{command}` exited with status {code}: {output}")]
    Exit {
        command: String,
        code: i32,
        output: String,
    },

    /// The command could not be spawned or its process could not be waited on.
    #[error("failed to run `{command}`")]
    Transport {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// True for an ordinary nonzero exit, false for a transport failure.
    pub fn is_exit(&self) -> bool {
        matches!(self, ExecError::Exit { .. })
    }
}

/// Runs argument vectors produced by the transport layer.
///
/// The three methods mirror how the rest of the code wants to consume
/// results: `call` for "give me the exit code", `check_call` for "nonzero is
/// an error", `check_output` for "nonzero is an error, hand me stdout".
/// `env` entries are added on top of the inherited environment; `cwd` is the
/// working directory the subprocess runs in.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run the command, inheriting stdout/stderr, and return its exit code.
    fn call(&self, argv: &[String], env: &[(String, String)], cwd: &Path) -> Result<i32, ExecError>;

    /// Run the command and fail on a nonzero exit.
    fn check_call(
        &self,
        argv: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<(), ExecError>;

    /// Run the command, capture its output, and fail on a nonzero exit.
    fn check_output(
        &self,
        argv: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<String, ExecError>;
}

/// [`CommandRunner`] backed by [`std::process::Command`].
pub struct SystemRunner;

impl SystemRunner {
    fn command(argv: &[String], env: &[(String, String)], cwd: &Path) -> Result<Command, ExecError> {
        let (program, args) = argv.split_first().ok_or_else(|| ExecError::Transport {
            command: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"),
        })?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.current_dir(cwd);
        Ok(cmd)
    }
}

fn render(argv: &[String]) -> String {
    argv.join(" ")
}

impl CommandRunner for SystemRunner {
    fn call(&self, argv: &[String], env: &[(String, String)], cwd: &Path) -> Result<i32, ExecError> {
        debug!("run: {}", render(argv));
        let status = Self::command(argv, env, cwd)?
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ExecError::Transport {
                command: render(argv),
                source,
            })?;
        // A signal death has no exit code; report it as a generic failure.
        Ok(status.code().unwrap_or(-1))
    }

    fn check_call(
        &self,
        argv: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<(), ExecError> {
        let code = self.call(argv, env, cwd)?;
        if code != 0 {
            return Err(ExecError::Exit {
                command: render(argv),
                code,
                output: String::new(),
            });
        }
        Ok(())
    }

    fn check_output(
        &self,
        argv: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<String, ExecError> {
        debug!("run (captured): {}", render(argv));
        let output = Self::command(argv, env, cwd)?
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecError::Transport {
                command: render(argv),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let mut combined = stdout;
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ExecError::Exit {
                command: render(argv),
                code: output.status.code().unwrap_or(-1),
                output: combined,
            });
        }
        Ok(stdout)
    }
}
