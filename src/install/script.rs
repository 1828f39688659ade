//! Runs the bootstrap script shipped inside a freshly extracted SDK.

use crate::command::CommandExecutor;
use crate::error::OperationKind;
use crate::listener::MessageListener;
use crate::os_info::OsName;
use crate::process::CommandLine;
use crate::progress::{ProgressListener, UNKNOWN};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// OS specific bootstrap script of an extracted SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallScriptProvider {
    Unix,
    /// `install.bat`; the process executor supplies the `cmd.exe /c` prefix.
    Windows,
}

impl InstallScriptProvider {
    pub fn for_os(os: OsName) -> Self {
        match os {
            OsName::Windows => InstallScriptProvider::Windows,
            OsName::Mac | OsName::Linux => InstallScriptProvider::Unix,
        }
    }

    pub fn script_command_line(&self, sdk_root: &Path) -> Vec<String> {
        let script = match self {
            InstallScriptProvider::Unix => sdk_root.join("install.sh"),
            InstallScriptProvider::Windows => sdk_root.join("install.bat"),
        };
        vec![script.to_string_lossy().to_string()]
    }
}

pub struct Installer {
    sdk_root: PathBuf,
    script_provider: InstallScriptProvider,
    usage_reporting: bool,
    executor: Arc<dyn CommandExecutor>,
    listener: Arc<dyn MessageListener>,
}

impl Installer {
    pub fn new(
        sdk_root: impl Into<PathBuf>,
        script_provider: InstallScriptProvider,
        usage_reporting: bool,
        executor: Arc<dyn CommandExecutor>,
        listener: Arc<dyn MessageListener>,
    ) -> Self {
        Self {
            sdk_root: sdk_root.into(),
            script_provider,
            usage_reporting,
            executor,
            listener,
        }
    }

    pub fn command(&self) -> CommandLine {
        let mut args = self.script_provider.script_command_line(&self.sdk_root);
        args.push("--path-update=false".to_string());
        args.push("--command-completion=false".to_string());
        args.push("--quiet".to_string());
        args.push(format!("--usage-reporting={}", self.usage_reporting));
        CommandLine::new(args).working_directory(&self.sdk_root)
    }

    /// Run the install script. Any non-zero exit fails the install.
    pub fn install(&self, progress: &ProgressListener, cancel: &CancellationToken) -> Result<()> {
        progress.start("Installing Cloud SDK", UNKNOWN);
        self.executor
            .run(&self.command(), Arc::clone(&self.listener), cancel)
            .map_err(|e| e.within(OperationKind::InstallScript))?;
        progress.done();
        Ok(())
    }
}
