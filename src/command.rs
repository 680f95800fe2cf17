//! External programs as retryable operations.
//!
//! A [`Command`] runs a program with an explicit argument vector. Nothing is ever passed
//! through a shell, so arguments built from stack outputs or secrets cannot inject commands.
//!
//! ```no_run
//! use reprise::{Captured, Command};
//!
//! let endpoint = Captured::new();
//! let mut describe = Command::new("aws")
//!     .args(["cloudformation", "describe-stacks", "--stack-name", "workshop"])
//!     .args(["--query", "Stacks[0].Outputs", "--output", "text"])
//!     .capture(&endpoint);
//!
//! let report = reprise::retry().run(|| describe.attempt());
//! if report.succeeded() {
//!     println!("{}", endpoint.take().unwrap_or_default());
//! }
//! ```

use std::{
    ffi::{OsStr, OsString},
    process::{self, Stdio},
    sync::{Arc, Mutex},
};

use crate::Attempt;

/// Shared slot receiving the stdout of a successful [`Command`] attempt.
#[derive(Debug, Clone, Default)]
pub struct Captured(Arc<Mutex<Option<String>>>);

impl Captured {
    pub fn new() -> Self {
        Self::default()
    }
    /// Removes and returns the captured output, if a successful attempt stored one.
    pub fn take(&self) -> Option<String> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
    pub fn get(&self) -> Option<String> {
        self.0.lock().ok().and_then(|slot| slot.clone())
    }
    fn set(&self, value: String) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(value);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    capture: Option<Captured>,
}

impl Command {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            envs: Vec::new(),
            capture: None,
        }
    }
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }
    /// Store trimmed stdout of the successful attempt in `slot`.
    pub fn capture(mut self, slot: &Captured) -> Self {
        self.capture = Some(slot.clone());
        self
    }
    /// Runs the program once.
    ///
    /// Exit status 0 is [`Attempt::Succeeded`]. A non-zero status or a spawn error is
    /// [`Attempt::Failed`].
    pub fn attempt(&mut self) -> Attempt {
        let mut cmd = process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        cmd.stdout(if self.capture.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let output = match cmd.output() {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(program = ?self.program, %err, "failed to spawn command");
                return Attempt::Failed;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                program = ?self.program,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "command exited unsuccessfully"
            );
            return Attempt::Failed;
        }

        if let Some(slot) = &self.capture {
            slot.set(String::from_utf8_lossy(&output.stdout).trim_end().to_owned());
        }
        Attempt::Succeeded
    }
}
