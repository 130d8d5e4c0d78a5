//! Running compiler and linker subprocesses.

use std::fmt;
use std::process::Command;
use std::time::{Duration, Instant};

/// How often a running subprocess is polled when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The program to run.
    pub program: String,
    /// Arguments, not including the program.
    pub args: Vec<String>,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The value following the first `-o`, if any.
    pub fn output(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == "-o")
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a subprocess ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Exited with status 0.
    Success,
    /// Exited with a non-zero status, or was killed by a signal (`None`).
    Failed(Option<i32>),
    /// Killed after exceeding the timeout.
    TimedOut,
    /// Could not be started.
    SpawnFailed(String),
    /// Never started because an earlier job failed.
    Skipped,
}

impl CommandOutcome {
    /// Returns `true` for [`CommandOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Success => write!(f, "success"),
            CommandOutcome::Failed(Some(code)) => write!(f, "exit status {code}"),
            CommandOutcome::Failed(None) => write!(f, "terminated by signal"),
            CommandOutcome::TimedOut => write!(f, "timed out"),
            CommandOutcome::SpawnFailed(reason) => write!(f, "could not start: {reason}"),
            CommandOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Runs one invocation to completion.
///
/// Called concurrently from the compile workers.
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` and reports how it ended.
    fn run(&self, invocation: &Invocation) -> CommandOutcome;
}

/// Runs invocations as real subprocesses with inherited stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Creates a runner that kills subprocesses running longer than `timeout`.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> CommandOutcome {
        tracing::debug!("{invocation}");
        let mut child = match Command::new(&invocation.program)
            .args(&invocation.args)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return CommandOutcome::SpawnFailed(e.to_string()),
        };

        let status = match self.timeout {
            None => child.wait(),
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break Ok(status),
                        Ok(None) if Instant::now() >= deadline => {
                            tracing::debug!("killing {} after {timeout:?}", invocation.program);
                            let _ = child.kill();
                            let _ = child.wait();
                            return CommandOutcome::TimedOut;
                        }
                        Ok(None) => std::thread::sleep(POLL_INTERVAL),
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        match status {
            Ok(status) if status.success() => CommandOutcome::Success,
            Ok(status) => CommandOutcome::Failed(status.code()),
            Err(e) => CommandOutcome::SpawnFailed(e.to_string()),
        }
    }
}
