//! External command execution.
//!
//! Commands capture stdout/stderr and fail with the captured stderr on a
//! non-zero exit. [`CommandRunner`] is the seam the boot root teardown goes
//! through, so callers can observe or replace command execution.

use anyhow::{bail, Context, Result};
use std::process::{Command, ExitStatus};

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 if terminated by signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Builder for configuring command execution.
pub struct Cmd {
    program: String,
    args: Vec<String>,
    /// If true, don't fail on non-zero exit.
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Run the command and capture output.
    pub fn run(self) -> Result<CommandResult> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", self.program))?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !self.allow_fail && !result.success() {
            let stderr = result.stderr_trimmed();
            if stderr.is_empty() {
                bail!("'{}' failed (exit code {})", self.program, result.code());
            } else {
                bail!(
                    "'{}' failed (exit code {}):\n{}",
                    self.program,
                    result.code(),
                    stderr
                );
            }
        }

        Ok(result)
    }
}

/// Run a command with arguments. Fails with stderr on error.
pub fn run<I, S>(program: &str, args: I) -> Result<CommandResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Cmd::new(program).args(args).run()
}

/// Executes argv-style commands.
pub trait CommandRunner {
    /// Run `argv[0]` with the remaining elements as arguments.
    fn run(&self, argv: &[String]) -> Result<CommandResult>;
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostCommandRunner;

impl CommandRunner for HostCommandRunner {
    fn run(&self, argv: &[String]) -> Result<CommandResult> {
        let Some((program, args)) = argv.split_first() else {
            bail!("cannot run an empty command");
        };
        run(program, args)
    }
}

/// Host machine architecture as reported by `uname -m`.
///
/// Falls back to the compile-time architecture when `uname` is unavailable.
pub fn host_machine() -> String {
    match Cmd::new("uname").arg("-m").run() {
        Ok(result) if !result.stdout_trimmed().is_empty() => result.stdout_trimmed().to_string(),
        _ => std::env::consts::ARCH.to_string(),
    }
}
