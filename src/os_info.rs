//! Operating system and architecture resolution.
//!
//! The host platform is resolved once at startup and handed to every component
//! that needs it, so tests can construct any platform they like.

use crate::{ManagedSdkError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsName {
    Mac,
    Windows,
    Linux,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsInfo {
    name: OsName,
    arch: Arch,
}

impl OsInfo {
    pub fn new(name: OsName, arch: Arch) -> Self {
        Self { name, arch }
    }

    pub fn name(&self) -> OsName {
        self.name
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Detect the platform this binary runs on.
    pub fn system() -> Result<Self> {
        Self::from_raw(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Resolve from raw environment strings such as `"Mac OS X"` / `"amd64"`.
    pub fn from_raw(raw_os: &str, raw_arch: &str) -> Result<Self> {
        Ok(Self::new(OsName::from_raw(raw_os)?, Arch::from_raw(raw_arch)))
    }

    pub fn is_windows(&self) -> bool {
        self.name == OsName::Windows
    }
}

impl OsName {
    pub fn from_raw(raw: &str) -> Result<Self> {
        let os = raw.to_lowercase();
        if os.contains("windows") {
            return Ok(OsName::Windows);
        }
        if os.contains("linux") {
            return Ok(OsName::Linux);
        }
        if os.contains("mac") || os.contains("darwin") {
            return Ok(OsName::Mac);
        }
        Err(ManagedSdkError::unsupported_os(format!("Unknown OS: {}", raw)))
    }
}

impl Arch {
    pub fn from_raw(raw: &str) -> Self {
        let arch = raw.to_lowercase();
        if arch.contains("64") || arch.contains("universal") {
            Arch::X86_64
        } else {
            Arch::X86
        }
    }
}

impl fmt::Display for OsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.name, self.arch)
    }
}
