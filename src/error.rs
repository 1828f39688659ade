//! Error handling for the managed Cloud SDK

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Download,
    Extract,
    InstallScript,
    SdkInstall,
    ComponentInstall,
    Update,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Download => "Download",
            OperationKind::Extract => "Extraction",
            OperationKind::InstallScript => "Install script",
            OperationKind::SdkInstall => "Cloud SDK install",
            OperationKind::ComponentInstall => "Component install",
            OperationKind::Update => "Cloud SDK update",
        };
        f.write_str(name)
    }
}

/// Main error type for managed Cloud SDK operations
#[derive(Error, Debug)]
pub enum ManagedSdkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unsupported platform: {os}")]
    UnsupportedOs { os: String },

    #[error("Invalid Cloud SDK version: {version}")]
    BadVersion { version: String },

    #[error("File already exists: {}", path.display())]
    FileAlreadyExists { path: PathBuf },

    #[error("Interrupted: {message}")]
    Interrupted { message: String },

    #[error("Process exited with non-zero exit code: {exit_code}")]
    CommandExit { exit_code: i32, output: String },

    #[error("Command execution failed: {message}")]
    CommandExecution { message: String },

    #[error("Unknown archive type: {}", path.display())]
    UnknownArchiveType { path: PathBuf },

    #[error("Malformed command output: {message}")]
    MalformedOutput { message: String },

    #[error("Installation error: {message}")]
    Installation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{operation} failed: {source}")]
    Operation {
        operation: OperationKind,
        #[source]
        source: Box<ManagedSdkError>,
    },
}

/// Result type alias for managed Cloud SDK operations
pub type Result<T> = std::result::Result<T, ManagedSdkError>;

impl ManagedSdkError {
    pub fn unsupported_os(os: impl Into<String>) -> Self {
        Self::UnsupportedOs { os: os.into() }
    }

    pub fn bad_version(version: impl Into<String>) -> Self {
        Self::BadVersion {
            version: version.into(),
        }
    }

    pub fn file_already_exists(path: impl Into<PathBuf>) -> Self {
        Self::FileAlreadyExists { path: path.into() }
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted {
            message: message.into(),
        }
    }

    pub fn command_exit(exit_code: i32, output: impl Into<String>) -> Self {
        Self::CommandExit {
            exit_code,
            output: output.into(),
        }
    }

    pub fn command_execution(message: impl Into<String>) -> Self {
        Self::CommandExecution {
            message: message.into(),
        }
    }

    pub fn unknown_archive_type(path: impl Into<PathBuf>) -> Self {
        Self::UnknownArchiveType { path: path.into() }
    }

    pub fn malformed_output(message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            message: message.into(),
        }
    }

    pub fn installation(message: impl Into<String>) -> Self {
        Self::Installation {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap this error as a failure of `operation`. Errors that already carry an
    /// operation are returned unchanged so each failure is wrapped once.
    pub fn within(self, operation: OperationKind) -> Self {
        match self {
            wrapped @ Self::Operation { .. } => wrapped,
            other => Self::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// The operation this error was raised in, if it crossed a component boundary.
    pub fn operation(&self) -> Option<OperationKind> {
        match self {
            Self::Operation { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// The underlying error, looking through the operation wrapper.
    pub fn root(&self) -> &ManagedSdkError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.root(), Self::Interrupted { .. })
    }

    /// Exit code of the failed child process, if this is a process exit failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self.root() {
            Self::CommandExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_wraps_once() {
        let err = ManagedSdkError::command_exit(3, "boom")
            .within(OperationKind::InstallScript)
            .within(OperationKind::SdkInstall);
        assert_eq!(err.operation(), Some(OperationKind::InstallScript));
        assert_eq!(err.exit_code(), Some(3));
        assert!(!err.is_interrupted());
    }

    #[test]
    fn test_interrupted_seen_through_wrapper() {
        let err = ManagedSdkError::interrupted("Download was interrupted").within(OperationKind::Download);
        assert!(err.is_interrupted());
        assert_eq!(err.to_string(), "Download failed: Interrupted: Download was interrupted");
    }
}
