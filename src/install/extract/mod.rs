//! Streaming archive extraction.
//!
//! Only directories and regular files are materialised. Symlinks, devices and
//! other entry kinds are skipped.

mod tar_gz;
mod zip_file;

use crate::error::OperationKind;
use crate::listener::MessageListener;
use crate::{ManagedSdkError, Result};
use log::warn;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Extraction strategy, chosen from the archive's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorProvider {
    TarGz,
    Zip,
}

impl ExtractorProvider {
    /// Pick a provider by suffix. The file contents are not inspected.
    pub fn for_archive(archive: &Path) -> Result<Self> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") {
            Ok(ExtractorProvider::TarGz)
        } else if name.ends_with(".zip") {
            Ok(ExtractorProvider::Zip)
        } else {
            Err(ManagedSdkError::unknown_archive_type(archive))
        }
    }

    /// Extract `archive` into `destination`, reporting each entry's target
    /// path to `listener`.
    pub fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        listener: &dyn MessageListener,
        cancel: &CancellationToken,
    ) -> Result<()> {
        fs::create_dir_all(destination)?;
        let result = match self {
            ExtractorProvider::TarGz => tar_gz::extract(archive, destination, listener, cancel),
            ExtractorProvider::Zip => zip_file::extract(archive, destination, listener, cancel),
        };
        result.map_err(|e| e.within(OperationKind::Extract))
    }
}

/// Resolve an entry path under `destination`, refusing anything that would
/// land outside it.
fn entry_target(destination: &Path, entry: &Path) -> Result<PathBuf> {
    let mut target = destination.to_path_buf();
    for component in entry.components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ManagedSdkError::installation(format!(
                    "Archive entry escapes the destination: {}",
                    entry.display()
                )))
            }
        }
    }
    Ok(target)
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ManagedSdkError::interrupted("Extraction was interrupted"));
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Best effort: a file whose mode cannot be set is still extracted.
#[cfg(unix)]
fn restore_mode(path: &Path, mode: u32) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777)) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not set mode {:o} on {}: {}", mode & 0o7777, path.display(), e);
            false
        }
    }
}

#[cfg(not(unix))]
fn restore_mode(_path: &Path, _mode: u32) -> bool {
    true
}
