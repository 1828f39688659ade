//! Installing a managed Cloud SDK: download, extract, run the install script.

pub mod download_url;
pub mod downloader;
pub mod extract;
pub mod script;

pub use downloader::Downloader;
pub use extract::ExtractorProvider;
pub use script::{InstallScriptProvider, Installer};

use crate::command::{CommandExecutor, OperationHandle};
use crate::error::OperationKind;
use crate::listener::MessageListener;
use crate::os_info::OsInfo;
use crate::progress::{ProgressListener, UNKNOWN};
use crate::version::Version;
use crate::{ManagedSdkError, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Top-level directory every Cloud SDK archive unpacks to.
pub const SDK_DIRECTORY_NAME: &str = "google-cloud-sdk";

const DOWNLOAD_WORK: u64 = 100;
const EXTRACT_WORK: u64 = 100;
const INSTALL_SCRIPT_WORK: u64 = 100;

/// Installs one version of the SDK under a managed root.
///
/// Everything happens in a staging directory inside the managed root. The
/// finished `google-cloud-sdk` is moved to `<root>/<version>/` only after the
/// install script succeeded, so a failed install never looks installed.
#[derive(Clone)]
pub struct SdkInstaller {
    managed_sdk_directory: PathBuf,
    version: Version,
    os_info: OsInfo,
    user_agent: Option<String>,
    usage_reporting: bool,
    download_url: Option<Url>,
    executor: Arc<dyn CommandExecutor>,
}

impl SdkInstaller {
    pub fn new(
        managed_sdk_directory: impl Into<PathBuf>,
        version: Version,
        os_info: OsInfo,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            managed_sdk_directory: managed_sdk_directory.into(),
            version,
            os_info,
            user_agent: None,
            usage_reporting: false,
            download_url: None,
            executor,
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn usage_reporting(mut self, usage_reporting: bool) -> Self {
        self.usage_reporting = usage_reporting;
        self
    }

    /// Fetch the archive from `url` instead of the published location.
    pub fn download_url(mut self, url: Url) -> Self {
        self.download_url = Some(url);
        self
    }

    /// Where the SDK ends up: `<root>/<version>/google-cloud-sdk`.
    pub fn sdk_home(&self) -> PathBuf {
        self.managed_sdk_directory
            .join(self.version.as_str())
            .join(SDK_DIRECTORY_NAME)
    }

    pub fn source_url(&self) -> Result<Url> {
        match &self.download_url {
            Some(url) => Ok(url.clone()),
            None => download_url::sdk_download_url(&self.version, &self.os_info),
        }
    }

    /// Install on a background thread.
    pub fn install(
        &self,
        progress: ProgressListener,
        listener: Arc<dyn MessageListener>,
    ) -> OperationHandle<PathBuf> {
        let installer = self.clone();
        OperationHandle::spawn(move |cancel| installer.install_blocking(&progress, listener, &cancel))
    }

    /// Install on the calling thread and return the new SDK home.
    pub fn install_blocking(
        &self,
        progress: &ProgressListener,
        listener: Arc<dyn MessageListener>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.try_install(progress, listener, cancel)
            .map_err(|e| e.within(OperationKind::SdkInstall))
    }

    fn try_install(
        &self,
        progress: &ProgressListener,
        listener: Arc<dyn MessageListener>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let source = self.source_url()?;
        let archive_name = download_url::archive_file_name(&source).ok_or_else(|| {
            ManagedSdkError::installation(format!("Cannot name an archive for {}", source))
        })?;

        fs::create_dir_all(&self.managed_sdk_directory)?;
        let staging = tempfile::Builder::new()
            .prefix(".install-")
            .tempdir_in(&self.managed_sdk_directory)?;
        debug!("Staging Cloud SDK install in {}", staging.path().display());

        progress.start(
            &format!("Installing Cloud SDK {}", self.version),
            Some(DOWNLOAD_WORK + EXTRACT_WORK + INSTALL_SCRIPT_WORK),
        );

        let archive = staging.path().join("download").join(archive_name);
        Downloader::new(source, &archive, self.user_agent.clone(), Arc::clone(&listener))
            .download(&progress.new_child(DOWNLOAD_WORK), cancel)?;

        let extracted = staging.path().join("extract");
        let extract_progress = progress.new_child(EXTRACT_WORK);
        extract_progress.start("Extracting archive", UNKNOWN);
        ExtractorProvider::for_archive(&archive)
            .and_then(|provider| provider.extract(&archive, &extracted, listener.as_ref(), cancel))
            .map_err(|e| e.within(OperationKind::Extract))?;
        extract_progress.done();

        let staged_home = extracted.join(SDK_DIRECTORY_NAME);
        if !staged_home.is_dir() {
            return Err(ManagedSdkError::installation(format!(
                "Archive does not contain a {} directory",
                SDK_DIRECTORY_NAME
            )));
        }

        Installer::new(
            &staged_home,
            InstallScriptProvider::for_os(self.os_info.name()),
            self.usage_reporting,
            Arc::clone(&self.executor),
            listener,
        )
        .install(&progress.new_child(INSTALL_SCRIPT_WORK), cancel)?;

        if cancel.is_cancelled() {
            return Err(ManagedSdkError::interrupted("Install was interrupted"));
        }
        let sdk_home = self.sdk_home();
        promote(&staged_home, &sdk_home)?;
        progress.done();
        info!("Cloud SDK {} installed at {}", self.version, sdk_home.display());
        Ok(sdk_home)
    }
}

/// Move a staged SDK into place, replacing leftovers of an earlier attempt.
fn promote(staged: &Path, sdk_home: &Path) -> Result<()> {
    if let Some(parent) = sdk_home.parent() {
        fs::create_dir_all(parent)?;
    }
    if sdk_home.exists() {
        debug!("Removing stale Cloud SDK at {}", sdk_home.display());
        fs::remove_dir_all(sdk_home)?;
    }
    fs::rename(staged, sdk_home)?;
    Ok(())
}
