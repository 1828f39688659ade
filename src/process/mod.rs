//! Child process execution.

pub mod stream;

pub use stream::{
    AsyncStreamHandler, AsyncStreamSaver, CollectingHandler, ForwardingHandler, LineHandler,
};

use crate::os_info::OsName;
use crate::{ManagedSdkError, Result};
use log::debug;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// An argument vector plus optional working directory and environment overlay.
/// The caller's environment is always inherited; the overlay is applied on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: HashMap<String, String>,
}

impl CommandLine {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: HashMap<String, String>) -> Self {
        self.environment.extend(vars);
        self
    }

    pub fn display(&self) -> String {
        self.args.join(" ")
    }
}

/// Exit code plus the still-draining output consumers of a finished process.
pub struct ProcessOutput<O, E> {
    pub exit_code: i32,
    pub stdout: AsyncStreamHandler<O>,
    pub stderr: AsyncStreamHandler<E>,
}

/// Starts exactly one child process per `run` and waits for it.
#[derive(Debug, Clone, Copy)]
pub struct ProcessExecutor {
    os: OsName,
}

impl ProcessExecutor {
    pub fn new(os: OsName) -> Self {
        Self { os }
    }

    /// The argument vector as it is handed to the OS. On Windows everything
    /// goes through `cmd.exe /c` so `.cmd`/`.bat` launchers resolve.
    pub fn platform_args(&self, args: &[String]) -> Vec<String> {
        match self.os {
            OsName::Windows => {
                let mut wrapped = vec!["cmd.exe".to_string(), "/c".to_string()];
                wrapped.extend(args.iter().cloned());
                wrapped
            }
            _ => args.to_vec(),
        }
    }

    /// Run `command_line`, draining stdout/stderr into the given handlers on
    /// background threads, and block until the process exits or `cancel` fires.
    /// On cancellation the child is killed and an `Interrupted` error returned.
    pub fn run<O, E>(
        &self,
        command_line: &CommandLine,
        stdout: O,
        stderr: E,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput<O::Output, E::Output>>
    where
        O: LineHandler,
        E: LineHandler,
    {
        let args = self.platform_args(&command_line.args);
        let Some((program, rest)) = args.split_first() else {
            return Err(ManagedSdkError::command_execution("empty command line"));
        };
        if cancel.is_cancelled() {
            return Err(ManagedSdkError::interrupted("Process cancelled"));
        }

        debug!("Running command: {}", args.join(" "));
        let mut cmd = Command::new(program);
        cmd.args(rest)
            .envs(&command_line.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command_line.working_directory {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            ManagedSdkError::command_execution(format!("Failed to start {}: {}", program, e))
        })?;

        let streams = Self::attach(&mut child, stdout, stderr);
        let (stdout, stderr) = match streams {
            Ok(streams) => streams,
            Err(e) => {
                destroy(&mut child);
                return Err(e);
            }
        };

        let exit_code = Self::wait(&mut child, cancel)?;
        debug!("Command exited with {}: {}", exit_code, program);
        Ok(ProcessOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    fn attach<O, E>(
        child: &mut Child,
        stdout: O,
        stderr: E,
    ) -> Result<(AsyncStreamHandler<O::Output>, AsyncStreamHandler<E::Output>)>
    where
        O: LineHandler,
        E: LineHandler,
    {
        let out = child
            .stdout
            .take()
            .ok_or_else(|| ManagedSdkError::command_execution("stdout was not captured"))?;
        let err = child
            .stderr
            .take()
            .ok_or_else(|| ManagedSdkError::command_execution("stderr was not captured"))?;
        let stdout = AsyncStreamHandler::spawn("stdout", out, stdout)?;
        let stderr = AsyncStreamHandler::spawn("stderr", err, stderr)?;
        Ok((stdout, stderr))
    }

    fn wait(child: &mut Child, cancel: &CancellationToken) -> Result<i32> {
        loop {
            if cancel.is_cancelled() {
                destroy(child);
                return Err(ManagedSdkError::interrupted("Process cancelled"));
            }
            match child.try_wait() {
                // killed by a signal: no code
                Ok(Some(status)) => return Ok(status.code().unwrap_or(-1)),
                Ok(None) => thread::sleep(WAIT_POLL_INTERVAL),
                Err(e) => {
                    destroy(child);
                    return Err(e.into());
                }
            }
        }
    }
}

fn destroy(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
