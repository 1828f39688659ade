//! Utility functions for the managed Cloud SDK CLI

use crate::os_info::OsInfo;
use std::path::PathBuf;

/// Show version information
pub fn show_version() {
    println!("managed-cloud-sdk version: {}", crate::config::VERSION);
}

/// A `gcloud` on PATH that this tool does not manage.
pub fn find_system_gcloud() -> Option<PathBuf> {
    which::which("gcloud").ok()
}

/// Get system information
pub fn get_system_info(os_info: &OsInfo) -> String {
    let mut info = Vec::new();
    info.push(format!("Platform: {}", os_info));
    info.push(format!(
        "System gcloud: {}",
        find_system_gcloud()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not found".to_string())
    ));
    info.join("\n")
}

/// Archive size as shown in download progress, e.g. `113.4 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os_info::{Arch, OsName};

    #[test]
    fn test_archive_sizes_are_human_readable() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(8 * 1024 * 10 + 1), "80.0 KB");
        // a typical bundled-python archive
        assert_eq!(format_file_size(113 * 1024 * 1024 + 400 * 1024), "113.4 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn test_system_info_names_platform() {
        let info = get_system_info(&OsInfo::new(OsName::Linux, Arch::X86_64));
        assert!(info.starts_with("Platform: "));
        assert!(info.contains("System gcloud: "));
    }
}
