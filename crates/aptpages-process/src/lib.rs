//! External process execution for aptpages.
//!
//! Every collaborator aptpages talks to (git, gpg, reprepro, dpkg-deb) is a
//! separate program. This crate runs them with captured output, optional
//! stdin payloads and an optional timeout, and reports the result as a plain
//! value the caller can inspect before deciding whether it failed.
//!
//! # Example
//!
//! ```ignore
//! use aptpages_process::ProcessCommand;
//!
//! let result = ProcessCommand::new("git").arg("--version").run().expect("run");
//! assert!(result.success);
//! assert!(result.stdout.contains("git version"));
//! ```

use std::ffi::{OsStr, OsString};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Result of a command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code (if available)
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Whether the command was killed after exceeding its timeout
    pub timed_out: bool,
    /// Duration of execution
    pub duration_ms: u64,
}

impl CommandResult {
    /// Turn an unsuccessful run into an error naming the failed step.
    pub fn check(self, what: &str) -> Result<Self> {
        if self.timed_out {
            bail!("{what} timed out: {}", self.stderr.trim());
        }
        if !self.success {
            bail!(
                "{what} failed (exit code {}): {}",
                self.exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                self.stderr.trim()
            );
        }
        Ok(self)
    }
}

/// Builder for one external program invocation.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    program: OsString,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    stdin: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl ProcessCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            dir: None,
            env: Vec::new(),
            stdin: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Bytes written to the child's stdin, which is then closed.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Kill the child if it runs longer than `timeout`. `None` waits forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn the program and wait for it, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error here; only failing to spawn is.
    pub fn run(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to run command: {}", self.program.to_string_lossy()))?;

        if let Some(input) = &self.stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            let input = input.clone();
            // A child that exits without draining stdin closes the pipe;
            // that surfaces through its exit status instead.
            thread::spawn(move || {
                let _ = pipe.write_all(&input);
            });
        }

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (exit_code, timed_out) = wait_for(&mut child, self.timeout)?;

        let stdout = stdout.join().unwrap_or_default();
        let mut stderr = stderr.join().unwrap_or_default();
        if timed_out && let Some(limit) = self.timeout {
            stderr.push_str(&format!(
                "\ncommand timed out after {}",
                humantime::format_duration(limit)
            ));
        }

        Ok(CommandResult {
            success: exit_code == Some(0) && !timed_out,
            exit_code,
            stdout,
            stderr,
            timed_out,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn wait_for(child: &mut Child, timeout: Option<Duration>) -> Result<(Option<i32>, bool)> {
    let Some(limit) = timeout else {
        let status = child.wait().context("failed to wait for command")?;
        return Ok((status.code(), false));
    };

    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().context("failed to poll command")? {
            return Ok((status.code(), false));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok((None, true));
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Run a command and capture its output
pub fn run_command(program: &str, args: &[&str]) -> Result<CommandResult> {
    ProcessCommand::new(program).args(args).run()
}

/// Full path of a program found on `PATH` (or an existing program path).
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// First line of `<program> --version`, if the program runs at all.
pub fn program_version(program: &str) -> Option<String> {
    let result = run_command(program, &["--version"]).ok()?;
    if !result.success {
        return None;
    }
    result.stdout.lines().next().map(|l| l.trim().to_string())
}
