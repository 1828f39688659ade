//! Where Cloud SDK archives are published.

use crate::os_info::{Arch, OsInfo, OsName};
use crate::version::Version;
use crate::Result;
use url::Url;

const LATEST_BASE_URL: &str = "https://dl.google.com/dl/cloudsdk/channels/rapid/google-cloud-sdk";
const VERSIONED_BASE_URL: &str = "https://storage.googleapis.com/cloud-sdk-release/google-cloud-sdk-";

/// Archive URL for `version` built for the `os` platform.
pub fn sdk_download_url(version: &Version, os: &OsInfo) -> Result<Url> {
    let base = match version {
        Version::Latest => LATEST_BASE_URL.to_string(),
        Version::Pinned(v) => format!("{}{}", VERSIONED_BASE_URL, v),
    };
    Ok(Url::parse(&format!("{}{}", base, platform_suffix(os)))?)
}

fn platform_suffix(os: &OsInfo) -> String {
    let (os_name, extension) = match os.name() {
        OsName::Windows => ("windows", "-bundled-python.zip"),
        OsName::Mac => ("darwin", ".tar.gz"),
        OsName::Linux => ("linux", ".tar.gz"),
    };
    let arch = match os.arch() {
        Arch::X86_64 => "x86_64",
        Arch::X86 => "x86",
    };
    format!("-{}-{}{}", os_name, arch, extension)
}

/// Last path segment of `url`, used as the local archive name.
pub fn archive_file_name(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
