//! Installing gcloud components into a managed SDK.

use crate::command::{CommandExecutor, OperationHandle};
use crate::component::SdkComponent;
use crate::error::OperationKind;
use crate::listener::MessageListener;
use crate::os_info::OsName;
use crate::process::CommandLine;
use crate::progress::{ProgressListener, UNKNOWN};
use crate::Result;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Environment variable gcloud reads its interpreter from.
pub const CLOUDSDK_PYTHON: &str = "CLOUDSDK_PYTHON";

const PYTHON_EXE: &str = "python.exe";

/// Runs `gcloud components install <id> --quiet`.
#[derive(Clone)]
pub struct SdkComponentInstaller {
    gcloud: PathBuf,
    os: OsName,
    executor: Arc<dyn CommandExecutor>,
}

impl SdkComponentInstaller {
    pub fn new(gcloud: impl Into<PathBuf>, os: OsName, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            gcloud: gcloud.into(),
            os,
            executor,
        }
    }

    pub fn command(&self, component: &SdkComponent) -> CommandLine {
        CommandLine::new([
            self.gcloud.to_string_lossy().to_string(),
            "components".to_string(),
            "install".to_string(),
            component.id().to_string(),
            "--quiet".to_string(),
        ])
    }

    /// Install `component` on a background thread.
    pub fn install(
        &self,
        component: SdkComponent,
        progress: ProgressListener,
        listener: Arc<dyn MessageListener>,
    ) -> OperationHandle<()> {
        let installer = self.clone();
        OperationHandle::spawn(move |cancel| {
            installer.install_blocking(&component, &progress, listener, &cancel)
        })
    }

    pub fn install_blocking(
        &self,
        component: &SdkComponent,
        progress: &ProgressListener,
        listener: Arc<dyn MessageListener>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        progress.start(&format!("Installing {}", component), UNKNOWN);
        self.run_install(component, listener, cancel)
            .map_err(|e| e.within(OperationKind::ComponentInstall))?;
        progress.done();
        Ok(())
    }

    fn run_install(
        &self,
        component: &SdkComponent,
        listener: Arc<dyn MessageListener>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut command = self.command(component);
        // the copy lives until the install finished
        let _python = match self.os {
            OsName::Windows => {
                let copier = WindowsBundledPythonCopier::new(&self.gcloud, Arc::clone(&self.executor));
                let python = copier.copy_python(cancel)?;
                command = command.envs(python.environment());
                Some(python)
            }
            OsName::Mac | OsName::Linux => None,
        };
        self.executor.run(&command, listener, cancel)
    }
}

/// Copies gcloud's bundled interpreter out of the SDK so gcloud can replace
/// its own files while running on Windows.
pub struct WindowsBundledPythonCopier {
    gcloud: PathBuf,
    executor: Arc<dyn CommandExecutor>,
}

impl WindowsBundledPythonCopier {
    pub fn new(gcloud: impl Into<PathBuf>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            gcloud: gcloud.into(),
            executor,
        }
    }

    pub fn command(&self) -> CommandLine {
        CommandLine::new([
            self.gcloud.to_string_lossy().to_string(),
            "components".to_string(),
            "copy-bundled-python".to_string(),
        ])
    }

    pub fn copy_python(&self, cancel: &CancellationToken) -> Result<CopiedPython> {
        // cmd.exe rejects environment values with line breaks
        let location = self.executor.call(&self.command(), cancel)?.trim().to_string();
        debug!("Copied bundled python to {}", location);
        Ok(CopiedPython { location })
    }
}

/// A temporary interpreter copy. Dropping it deletes the copy.
#[derive(Debug)]
pub struct CopiedPython {
    location: String,
}

impl CopiedPython {
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn environment(&self) -> HashMap<String, String> {
        HashMap::from([(CLOUDSDK_PYTHON.to_string(), self.location.clone())])
    }
}

impl Drop for CopiedPython {
    fn drop(&mut self) {
        delete_copied_python(&self.location);
    }
}

/// Remove the directory holding a copied `python.exe`. Locations that do not
/// name a `python.exe` are left alone.
pub fn delete_copied_python(location: &str) {
    let Some(split) = location.len().checked_sub(PYTHON_EXE.len()) else {
        return;
    };
    let ends_with_python = location
        .get(split..)
        .map_or(false, |tail| tail.eq_ignore_ascii_case(PYTHON_EXE));
    if !ends_with_python {
        return;
    }
    let python_home = Path::new(&location[..split]);
    if let Err(e) = fs::remove_dir_all(python_home) {
        debug!("Could not remove copied python at {}: {}", python_home.display(), e);
    }
}
