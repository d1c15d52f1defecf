//! External tool invocation.
//!
//! Every cscope, ctags and readtags call goes through a `CommandRunner`, so
//! the query and build layers can be driven by a scripted runner in tests.
//! Calls block until the process exits; there is no shell in between, so
//! symbol names and filter expressions are passed as single arguments.

use std::{
    fmt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use tracing::{debug, trace};

/// One external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation
{
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation
{
    pub fn new(
        program: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
    ) -> Self
    {
        Self { program: program.into(), args: Vec::new(), cwd: cwd.into() }
    }

    pub fn arg(
        mut self,
        arg: impl Into<String>,
    ) -> Self
    {
        self.args
            .push(arg.into());
        self
    }

    /// Arguments joined with spaces; handy as a lookup key.
    pub fn args_line(&self) -> String
    {
        self.args
            .join(" ")
    }
}

impl fmt::Display for Invocation
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(
            f,
            "{} {}",
            self.program
                .display(),
            self.args_line()
        )
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput
{
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput
{
    pub fn ok(stdout: impl Into<String>) -> Self
    {
        Self { success: true, stdout: stdout.into(), stderr: String::new() }
    }

    pub fn failed(stderr: impl Into<String>) -> Self
    {
        Self { success: false, stdout: String::new(), stderr: stderr.into() }
    }

    /// Best reason text for a failure report.
    pub fn reason(&self) -> String
    {
        let stderr = self
            .stderr
            .trim();

        if stderr.is_empty()
        {
            "exited with a non-zero status".to_string()
        }
        else
        {
            stderr.to_string()
        }
    }
}

pub trait CommandRunner
{
    /// Run to completion. `Err` means the process could not be started.
    fn run(
        &self,
        invocation: &Invocation,
    ) -> std::io::Result<ProcessOutput>;
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner
{
    fn run(
        &self,
        invocation: &Invocation,
    ) -> std::io::Result<ProcessOutput>
    {
        debug!(command = %invocation, cwd = %invocation.cwd.display(), "spawning");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .output()?;

        let out = ProcessOutput {
            success: output
                .status
                .success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        trace!(
            success = out.success,
            stdout_bytes = out
                .stdout
                .len(),
            "finished"
        );

        Ok(out)
    }
}

/// Make sure the directory that will hold `path` exists.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()>
{
    match path.parent()
    {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
