//! End-to-end lifecycle against a fake SDK whose launchers are shell scripts.

#![cfg(unix)]

use flate2::write::GzEncoder;
use flate2::Compression;
use managed_cloud_sdk::listener::MessageListener;
use managed_cloud_sdk::progress::ProgressListener;
use managed_cloud_sdk::{Arch, ManagedCloudSdk, OsInfo, OsName, SdkComponent, Version};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;

const INSTALL_SH: &str = r#"#!/bin/sh
echo "install.sh $*"
[ "$1" = "--path-update=false" ] || exit 3
[ "$2" = "--command-completion=false" ] || exit 3
[ "$3" = "--quiet" ] || exit 3
touch .install-ran
"#;

const GCLOUD: &str = r#"#!/bin/sh
sdk="$(cd "$(dirname "$0")/.." && pwd)"
state="$sdk/.installed-components"
touch "$state"
case "$1 $2" in
  "components list")
    case "$4" in
      --filter=id:*)
        id="${4#--filter=id:}"
        id="${id%% *}"
        if grep -qx "$id" "$state"; then
          echo "[]"
        else
          printf '[{"id": "%s", "state": {"name": "Not Installed"}}]\n' "$id"
        fi
        ;;
      *) echo "[]" ;;
    esac
    ;;
  "components install")
    echo "$3" >> "$state"
    echo "Installing $3"
    ;;
  "components update")
    echo "All components are up to date."
    ;;
  *)
    echo "unknown command: $*" >&2
    exit 1
    ;;
esac
"#;

fn write_fake_sdk(archive: &Path) {
    let encoder = GzEncoder::new(File::create(archive).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for dir in ["google-cloud-sdk/", "google-cloud-sdk/bin/"] {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_mode(0o755);
        header.set_size(0);
        builder.append_data(&mut header, dir, std::io::empty()).unwrap();
    }
    for (name, script) in [
        ("google-cloud-sdk/install.sh", INSTALL_SH),
        ("google-cloud-sdk/bin/gcloud", GCLOUD),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(0o755);
        header.set_size(script.len() as u64);
        builder.append_data(&mut header, name, script.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

#[derive(Default)]
struct Console {
    lines: Mutex<Vec<String>>,
}

impl MessageListener for Console {
    fn message(&self, raw: &str) {
        self.lines.lock().unwrap().push(raw.to_string());
    }
}

#[tokio::test]
async fn test_install_then_add_component() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("google-cloud-sdk-linux-x86_64.tar.gz");
    write_fake_sdk(&archive);

    let sdk = ManagedCloudSdk::new(
        Version::Latest,
        tmp.path().join("managed"),
        OsInfo::new(OsName::Linux, Arch::X86_64),
    )
    .download_url(Url::from_file_path(&archive).unwrap());
    let console = Arc::new(Console::default());

    assert!(!sdk.is_installed());

    let home = sdk
        .new_installer()
        .install(ProgressListener::noop(), console.clone())
        .await
        .unwrap();
    assert_eq!(home, sdk.sdk_home());
    assert!(sdk.is_installed());
    assert!(home.join(".install-ran").exists());
    assert!(console
        .lines
        .lock()
        .unwrap()
        .iter()
        .any(|l| l.contains("--usage-reporting=false")));

    let component = SdkComponent::AppEngineJava;
    assert!(!sdk.has_component(&component).unwrap());
    sdk.new_component_installer()
        .install(component.clone(), ProgressListener::noop(), console.clone())
        .await
        .unwrap();
    assert!(sdk.has_component(&component).unwrap());
    assert!(!sdk.has_component(&SdkComponent::Beta).unwrap());

    assert!(sdk.is_up_to_date().unwrap());
    sdk.new_updater()
        .unwrap()
        .update(ProgressListener::noop(), console.clone())
        .await
        .unwrap();
    assert!(console
        .lines
        .lock()
        .unwrap()
        .iter()
        .any(|l| l.contains("All components are up to date.")));
}
