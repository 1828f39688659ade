//! Running gcloud-style commands on top of the process executor.

mod operation;

pub use operation::OperationHandle;

use crate::listener::MessageListener;
use crate::os_info::OsName;
use crate::process::{CollectingHandler, CommandLine, ForwardingHandler, ProcessExecutor};
use crate::{ManagedSdkError, Result};
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The seam every SDK operation drives subprocesses through.
pub trait CommandExecutor: Send + Sync {
    /// Run to completion, forwarding stdout and stderr to `listener`.
    /// A non-zero exit is a `CommandExit` error.
    fn run(
        &self,
        command: &CommandLine,
        listener: Arc<dyn MessageListener>,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Run to completion and return stdout. A non-zero exit is a
    /// `CommandExit` error carrying both streams.
    fn call(&self, command: &CommandLine, cancel: &CancellationToken) -> Result<String>;
}

/// `CommandExecutor` backed by real child processes.
#[derive(Debug, Clone, Copy)]
pub struct ProcessCommandExecutor {
    process: ProcessExecutor,
}

impl ProcessCommandExecutor {
    pub fn new(os: OsName) -> Self {
        Self {
            process: ProcessExecutor::new(os),
        }
    }
}

impl CommandExecutor for ProcessCommandExecutor {
    fn run(
        &self,
        command: &CommandLine,
        listener: Arc<dyn MessageListener>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let output = self.process.run(
            command,
            ForwardingHandler::new(Arc::clone(&listener)),
            ForwardingHandler::new(listener),
            cancel,
        )?;
        output.stdout.result()?;
        output.stderr.result()?;
        if output.exit_code != 0 {
            debug!("Command failed with exit code {}: {}", output.exit_code, command.display());
            return Err(ManagedSdkError::command_exit(output.exit_code, String::new()));
        }
        Ok(())
    }

    fn call(&self, command: &CommandLine, cancel: &CancellationToken) -> Result<String> {
        let output = self.process.run(
            command,
            CollectingHandler::default(),
            CollectingHandler::default(),
            cancel,
        )?;
        let stdout = output.stdout.result()?;
        let stderr = output.stderr.result()?;
        if output.exit_code != 0 {
            debug!("Command failed with exit code {}: {}", output.exit_code, command.display());
            return Err(ManagedSdkError::command_exit(
                output.exit_code,
                format!("{}\n{}", stdout, stderr),
            ));
        }
        Ok(stdout)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::CommandExecutor;
    use crate::listener::MessageListener;
    use crate::process::CommandLine;
    use crate::{ManagedSdkError, Result};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    /// What a stubbed command answers with.
    pub enum Reply {
        Output(String),
        Exit(i32),
    }

    /// Records every command and answers from a script, oldest reply first.
    /// Commands without a scripted reply succeed with empty output.
    #[derive(Default)]
    pub struct StubExecutor {
        pub commands: Mutex<Vec<CommandLine>>,
        replies: Mutex<VecDeque<Reply>>,
    }

    impl StubExecutor {
        pub fn with_replies(replies: Vec<Reply>) -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            }
        }

        pub fn commands(&self) -> Vec<CommandLine> {
            self.commands.lock().unwrap().clone()
        }

        fn answer(&self, command: &CommandLine) -> Result<String> {
            self.commands.lock().unwrap().push(command.clone());
            match self.replies.lock().unwrap().pop_front() {
                None => Ok(String::new()),
                Some(Reply::Output(out)) => Ok(out),
                Some(Reply::Exit(code)) => Err(ManagedSdkError::command_exit(code, "")),
            }
        }
    }

    impl CommandExecutor for StubExecutor {
        fn run(
            &self,
            command: &CommandLine,
            listener: Arc<dyn MessageListener>,
            _cancel: &CancellationToken,
        ) -> Result<()> {
            let out = self.answer(command)?;
            if !out.is_empty() {
                listener.message(&out);
            }
            Ok(())
        }

        fn call(&self, command: &CommandLine, _cancel: &CancellationToken) -> Result<String> {
            self.answer(command)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::listener::testing::RecordingListener;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new(["sh", "-c", script])
    }

    #[test]
    fn test_run_forwards_output() {
        let executor = ProcessCommandExecutor::new(OsName::Linux);
        let listener = Arc::new(RecordingListener::default());
        executor
            .run(&sh("echo hello; echo oops >&2"), listener.clone(), &CancellationToken::new())
            .unwrap();
        let mut messages = listener.messages();
        messages.sort();
        assert_eq!(messages, vec!["hello\n".to_string(), "oops\n".to_string()]);
    }

    #[test]
    fn test_run_non_zero_exit() {
        let executor = ProcessCommandExecutor::new(OsName::Linux);
        let listener = Arc::new(RecordingListener::default());
        let err = executor.run(&sh("exit 10"), listener, &CancellationToken::new()).unwrap_err();
        assert_eq!(err.exit_code(), Some(10));
        assert_eq!(err.to_string(), "Process exited with non-zero exit code: 10");
    }

    #[test]
    fn test_call_returns_stdout() {
        let executor = ProcessCommandExecutor::new(OsName::Linux);
        let out = executor
            .call(&sh("echo '[]'; echo noise >&2"), &CancellationToken::new())
            .unwrap();
        assert_eq!(out, "[]\n");
    }

    #[test]
    fn test_call_failure_carries_both_streams() {
        let executor = ProcessCommandExecutor::new(OsName::Linux);
        let err = executor
            .call(&sh("echo partial; echo broken >&2; exit 2"), &CancellationToken::new())
            .unwrap_err();
        match err {
            ManagedSdkError::CommandExit { exit_code, output } => {
                assert_eq!(exit_code, 2);
                assert_eq!(output, "partial\n\nbroken\n");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
