//! Managed Cloud SDK - download, install, update and drive `gcloud`
//!
//! A managed SDK lives at `<managed root>/<version>/google-cloud-sdk` and is
//! owned entirely by this crate: [`ManagedCloudSdk`] answers whether it is
//! installed, up to date or has a component, and hands out the installer,
//! component installer and updater that change that state.

pub mod cli;
pub mod command;
pub mod component;
pub mod components;
pub mod config;
pub mod error;
pub mod install;
pub mod listener;
pub mod managed;
pub mod os_info;
pub mod process;
pub mod progress;
pub mod update;
pub mod utils;
pub mod version;

pub use component::SdkComponent;
pub use error::{ManagedSdkError, OperationKind, Result};
pub use managed::ManagedCloudSdk;
pub use os_info::{Arch, OsInfo, OsName};
pub use version::{Release, Version};
