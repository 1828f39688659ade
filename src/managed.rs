//! A Cloud SDK whose whole lifecycle lives under one managed directory.

use crate::command::{CommandExecutor, ProcessCommandExecutor};
use crate::component::SdkComponent;
use crate::components::SdkComponentInstaller;
use crate::config::{ManagedSdkConfig, DEFAULT_USER_AGENT};
use crate::install::{SdkInstaller, SDK_DIRECTORY_NAME};
use crate::os_info::{OsInfo, OsName};
use crate::process::CommandLine;
use crate::update::SdkUpdater;
use crate::version::Version;
use crate::{ManagedSdkError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

const NOT_INSTALLED: &str = "Not Installed";
const UPDATE_AVAILABLE: &str = "Update Available";

/// One entry of `gcloud components list --format=json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentListing {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub state: ComponentState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentState {
    pub name: String,
}

/// Parse a `gcloud components list --format=json` document.
pub fn parse_component_listing(output: &str) -> Result<Vec<ComponentListing>> {
    serde_json::from_str(output.trim()).map_err(|e| {
        ManagedSdkError::malformed_output(format!("gcloud components list: {}", e))
    })
}

/// Facade over one managed SDK at `<root>/<version>/google-cloud-sdk`.
///
/// Installed state is read from the filesystem every time; nothing is cached.
#[derive(Clone)]
pub struct ManagedCloudSdk {
    version: Version,
    managed_sdk_directory: PathBuf,
    os_info: OsInfo,
    user_agent: String,
    usage_reporting: bool,
    download_url: Option<Url>,
    executor: Arc<dyn CommandExecutor>,
}

impl ManagedCloudSdk {
    pub fn new(version: Version, managed_sdk_directory: impl Into<PathBuf>, os_info: OsInfo) -> Self {
        Self {
            version,
            managed_sdk_directory: managed_sdk_directory.into(),
            os_info,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            usage_reporting: false,
            download_url: None,
            executor: Arc::new(ProcessCommandExecutor::new(os_info.name())),
        }
    }

    pub fn from_config(config: &ManagedSdkConfig, os_info: OsInfo) -> Result<Self> {
        Ok(Self::new(config.sdk_version()?, &config.managed_sdk_directory, os_info)
            .user_agent(&config.user_agent)
            .usage_reporting(config.usage_reporting))
    }

    /// Drive every subprocess through `executor`.
    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn usage_reporting(mut self, usage_reporting: bool) -> Self {
        self.usage_reporting = usage_reporting;
        self
    }

    /// Install from `url` instead of the published archive.
    pub fn download_url(mut self, url: Url) -> Self {
        self.download_url = Some(url);
        self
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn managed_sdk_directory(&self) -> &Path {
        &self.managed_sdk_directory
    }

    pub fn os_info(&self) -> OsInfo {
        self.os_info
    }

    pub fn sdk_home(&self) -> PathBuf {
        self.managed_sdk_directory
            .join(self.version.as_str())
            .join(SDK_DIRECTORY_NAME)
    }

    pub fn gcloud(&self) -> PathBuf {
        let launcher = match self.os_info.name() {
            OsName::Windows => "gcloud.cmd",
            OsName::Mac | OsName::Linux => "gcloud",
        };
        self.sdk_home().join("bin").join(launcher)
    }

    /// The SDK home is a directory holding a regular `bin/gcloud` file.
    /// Never runs a subprocess.
    pub fn is_installed(&self) -> bool {
        self.sdk_home().is_dir() && self.gcloud().is_file()
    }

    /// False when the SDK is not installed or gcloud lists `component` as not
    /// installed.
    pub fn has_component(&self, component: &SdkComponent) -> Result<bool> {
        if !self.is_installed() {
            return Ok(false);
        }
        let filter = format!("--filter=id:{} AND state.name:{}", component.id(), NOT_INSTALLED);
        let missing = self.list_components(&filter)?;
        Ok(!missing
            .iter()
            .any(|c| c.id == component.id() && c.state.name == NOT_INSTALLED))
    }

    /// Pinned versions never drift, so an installed pinned SDK is always up
    /// to date.
    pub fn is_up_to_date(&self) -> Result<bool> {
        if !self.is_installed() {
            return Ok(false);
        }
        if !self.version.is_latest() {
            return Ok(true);
        }
        let filter = format!("--filter=state.name:{}", UPDATE_AVAILABLE);
        let stale = self.list_components(&filter)?;
        Ok(!stale.iter().any(|c| c.state.name == UPDATE_AVAILABLE))
    }

    fn list_components(&self, filter: &str) -> Result<Vec<ComponentListing>> {
        let command = CommandLine::new([
            self.gcloud().to_string_lossy().to_string(),
            "components".to_string(),
            "list".to_string(),
            "--format=json".to_string(),
            filter.to_string(),
        ]);
        let output = self.executor.call(&command, &CancellationToken::new())?;
        parse_component_listing(&output)
    }

    pub fn new_installer(&self) -> SdkInstaller {
        let installer = SdkInstaller::new(
            &self.managed_sdk_directory,
            self.version.clone(),
            self.os_info,
            Arc::clone(&self.executor),
        )
        .user_agent(&self.user_agent)
        .usage_reporting(self.usage_reporting);
        match &self.download_url {
            Some(url) => installer.download_url(url.clone()),
            None => installer,
        }
    }

    pub fn new_component_installer(&self) -> SdkComponentInstaller {
        SdkComponentInstaller::new(self.gcloud(), self.os_info.name(), Arc::clone(&self.executor))
    }

    /// `None` for pinned versions, which are never updated in place.
    pub fn new_updater(&self) -> Option<SdkUpdater> {
        if !self.version.is_latest() {
            return None;
        }
        Some(SdkUpdater::new(
            self.os_info.name(),
            self.gcloud(),
            Arc::clone(&self.executor),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{Reply, StubExecutor};
    use crate::os_info::Arch;
    use std::fs;
    use tempfile::TempDir;

    fn linux() -> OsInfo {
        OsInfo::new(OsName::Linux, Arch::X86_64)
    }

    fn sdk(root: &Path, version: Version, executor: Arc<StubExecutor>) -> ManagedCloudSdk {
        ManagedCloudSdk::new(version, root, linux()).with_executor(executor)
    }

    fn fake_install(sdk: &ManagedCloudSdk) {
        fs::create_dir_all(sdk.gcloud().parent().unwrap()).unwrap();
        fs::write(sdk.gcloud(), b"#!/bin/sh\n").unwrap();
    }

    #[test]
    fn test_paths() {
        let sdk = ManagedCloudSdk::new(Version::pinned("190.0.0").unwrap(), "/managed", linux());
        assert_eq!(sdk.sdk_home(), Path::new("/managed/190.0.0/google-cloud-sdk"));
        assert_eq!(sdk.gcloud(), Path::new("/managed/190.0.0/google-cloud-sdk/bin/gcloud"));

        let windows = ManagedCloudSdk::new(Version::Latest, "/managed", OsInfo::new(OsName::Windows, Arch::X86));
        assert_eq!(windows.gcloud().file_name().unwrap(), "gcloud.cmd");
        assert!(windows.sdk_home().ends_with("LATEST/google-cloud-sdk"));
    }

    #[test]
    fn test_is_installed_is_a_filesystem_check() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(StubExecutor::with_replies(vec![Reply::Exit(1)]));
        let sdk = sdk(tmp.path(), Version::Latest, executor.clone());

        assert!(!sdk.is_installed());
        fs::create_dir_all(sdk.sdk_home()).unwrap();
        assert!(!sdk.is_installed());
        fs::create_dir_all(sdk.gcloud()).unwrap();
        // a directory named gcloud is not a launcher
        assert!(!sdk.is_installed());
        fs::remove_dir(sdk.gcloud()).unwrap();
        fake_install(&sdk);
        assert!(sdk.is_installed());

        assert!(executor.commands().is_empty());
    }

    #[test]
    fn test_not_installed_answers_without_gcloud() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(StubExecutor::default());
        let sdk = sdk(tmp.path(), Version::Latest, executor.clone());
        assert!(!sdk.has_component(&SdkComponent::AppEngineJava).unwrap());
        assert!(!sdk.is_up_to_date().unwrap());
        assert!(executor.commands().is_empty());
    }

    #[test]
    fn test_has_component() {
        let tmp = TempDir::new().unwrap();
        let missing = r#"[{"id": "app-engine-java", "name": "gcloud app Java Extensions", "state": {"name": "Not Installed"}}]"#;
        let executor = Arc::new(StubExecutor::with_replies(vec![
            Reply::Output(missing.to_string()),
            Reply::Output("[]\n".to_string()),
        ]));
        let sdk = sdk(tmp.path(), Version::Latest, executor.clone());
        fake_install(&sdk);

        assert!(!sdk.has_component(&SdkComponent::AppEngineJava).unwrap());
        assert!(sdk.has_component(&SdkComponent::AppEngineJava).unwrap());

        let commands = executor.commands();
        assert_eq!(
            commands[0].args[1..].to_vec(),
            vec![
                "components",
                "list",
                "--format=json",
                "--filter=id:app-engine-java AND state.name:Not Installed",
            ]
        );
    }

    #[test]
    fn test_is_up_to_date() {
        let tmp = TempDir::new().unwrap();
        let stale = r#"[{"id": "core", "state": {"name": "Update Available"}}]"#;
        let executor = Arc::new(StubExecutor::with_replies(vec![
            Reply::Output(stale.to_string()),
            Reply::Output("[]".to_string()),
        ]));
        let sdk = sdk(tmp.path(), Version::Latest, executor.clone());
        fake_install(&sdk);

        assert!(!sdk.is_up_to_date().unwrap());
        assert!(sdk.is_up_to_date().unwrap());
        assert_eq!(
            executor.commands()[0].args.last().map(String::as_str),
            Some("--filter=state.name:Update Available")
        );
    }

    #[test]
    fn test_pinned_is_always_up_to_date_once_installed() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(StubExecutor::default());
        let sdk = sdk(tmp.path(), Version::pinned("190.0.0").unwrap(), executor.clone());
        fake_install(&sdk);
        assert!(sdk.is_up_to_date().unwrap());
        assert!(executor.commands().is_empty());
        assert!(sdk.new_updater().is_none());
    }

    #[test]
    fn test_malformed_listing() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(StubExecutor::with_replies(vec![Reply::Output(
            "ERROR: not json".to_string(),
        )]));
        let sdk = sdk(tmp.path(), Version::Latest, executor);
        fake_install(&sdk);
        let err = sdk.is_up_to_date().unwrap_err();
        assert!(matches!(err, ManagedSdkError::MalformedOutput { .. }));
    }

    #[test]
    fn test_failed_listing_is_exit_error() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(StubExecutor::with_replies(vec![Reply::Exit(1)]));
        let sdk = sdk(tmp.path(), Version::Latest, executor);
        fake_install(&sdk);
        assert_eq!(sdk.has_component(&SdkComponent::Beta).unwrap_err().exit_code(), Some(1));
    }

    #[test]
    fn test_factories_share_layout() {
        let executor = Arc::new(StubExecutor::default());
        let sdk = sdk(Path::new("/managed"), Version::Latest, executor);
        assert_eq!(sdk.new_installer().sdk_home(), sdk.sdk_home());
        assert_eq!(
            sdk.new_component_installer().command(&SdkComponent::Beta).args[0],
            sdk.gcloud().to_string_lossy()
        );
        let updater = sdk.new_updater().unwrap();
        assert_eq!(updater.command().args[0], sdk.gcloud().to_string_lossy());
    }

    #[test]
    fn test_from_config() {
        let config = ManagedSdkConfig {
            managed_sdk_directory: PathBuf::from("/managed"),
            version: "200.0.0".to_string(),
            ..Default::default()
        };
        let sdk = ManagedCloudSdk::from_config(&config, linux()).unwrap();
        assert_eq!(sdk.version(), &Version::pinned("200.0.0").unwrap());
        assert_eq!(sdk.sdk_home(), Path::new("/managed/200.0.0/google-cloud-sdk"));

        let bad = ManagedSdkConfig {
            version: "latest-ish".to_string(),
            ..Default::default()
        };
        assert!(ManagedCloudSdk::from_config(&bad, linux()).is_err());
    }
}
