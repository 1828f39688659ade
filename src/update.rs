//! Updating a managed SDK in place through `gcloud components update`.

use crate::command::{CommandExecutor, OperationHandle};
use crate::components::WindowsBundledPythonCopier;
use crate::error::OperationKind;
use crate::listener::MessageListener;
use crate::os_info::OsName;
use crate::process::CommandLine;
use crate::progress::{ProgressListener, UNKNOWN};
use crate::version::Version;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct UpdateCommand {
    gcloud: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    version: Option<String>,
}

impl UpdateCommand {
    fn command_line(&self) -> CommandLine {
        let mut args = vec![
            self.gcloud.to_string_lossy().to_string(),
            "components".to_string(),
            "update".to_string(),
            "--quiet".to_string(),
        ];
        if let Some(version) = &self.version {
            args.push(format!("--version={}", version));
        }
        CommandLine::new(args)
    }
}

/// Runs the update command directly.
#[derive(Clone)]
pub struct UnixUpdater {
    update: UpdateCommand,
}

impl UnixUpdater {
    fn update(&self, listener: Arc<dyn MessageListener>, cancel: &CancellationToken) -> Result<()> {
        self.update
            .executor
            .run(&self.update.command_line(), listener, cancel)
    }
}

/// Runs the update against a copy of the bundled interpreter, since gcloud
/// cannot overwrite the python it is running on.
#[derive(Clone)]
pub struct WindowsUpdater {
    update: UpdateCommand,
}

impl WindowsUpdater {
    fn update(&self, listener: Arc<dyn MessageListener>, cancel: &CancellationToken) -> Result<()> {
        let copier = WindowsBundledPythonCopier::new(&self.update.gcloud, Arc::clone(&self.update.executor));
        let python = copier.copy_python(cancel)?;
        let command = self.update.command_line().envs(python.environment());
        self.update.executor.run(&command, listener, cancel)
    }
}

/// Platform specific updater, chosen once from the OS.
#[derive(Clone)]
pub enum SdkUpdater {
    Unix(UnixUpdater),
    Windows(WindowsUpdater),
}

impl SdkUpdater {
    pub fn new(os: OsName, gcloud: impl Into<PathBuf>, executor: Arc<dyn CommandExecutor>) -> Self {
        let update = UpdateCommand {
            gcloud: gcloud.into(),
            executor,
            version: None,
        };
        match os {
            OsName::Windows => SdkUpdater::Windows(WindowsUpdater { update }),
            OsName::Mac | OsName::Linux => SdkUpdater::Unix(UnixUpdater { update }),
        }
    }

    /// Move the SDK to exactly `version` instead of the newest release.
    pub fn pinned_to(mut self, version: &Version) -> Self {
        let pinned = match version {
            Version::Latest => None,
            Version::Pinned(release) => Some(release.to_string()),
        };
        match &mut self {
            SdkUpdater::Unix(updater) => updater.update.version = pinned,
            SdkUpdater::Windows(updater) => updater.update.version = pinned,
        }
        self
    }

    pub fn command(&self) -> CommandLine {
        match self {
            SdkUpdater::Unix(updater) => updater.update.command_line(),
            SdkUpdater::Windows(updater) => updater.update.command_line(),
        }
    }

    /// Update on a background thread.
    pub fn update(&self, progress: ProgressListener, listener: Arc<dyn MessageListener>) -> OperationHandle<()> {
        let updater = self.clone();
        OperationHandle::spawn(move |cancel| updater.update_blocking(&progress, listener, &cancel))
    }

    /// Update on the calling thread. How long an update takes is unknown up
    /// front, so progress only reports start and done.
    pub fn update_blocking(
        &self,
        progress: &ProgressListener,
        listener: Arc<dyn MessageListener>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        progress.start("Updating Cloud SDK", UNKNOWN);
        let result = match self {
            SdkUpdater::Unix(updater) => updater.update(listener, cancel),
            SdkUpdater::Windows(updater) => updater.update(listener, cancel),
        };
        result.map_err(|e| e.within(OperationKind::Update))?;
        progress.done();
        Ok(())
    }
}
