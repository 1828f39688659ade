//! Single-archive downloader.

use crate::error::OperationKind;
use crate::listener::MessageListener;
use crate::progress::ProgressListener;
use crate::utils::format_file_size;
use crate::{ManagedSdkError, Result};
use reqwest::blocking::Client;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const BUFFER_SIZE: usize = 8 * 1024;

const HTTP_TIMEOUT: Duration = Duration::from_secs(600);

/// Downloads one remote archive to a local file. Never overwrites: an
/// existing destination fails the download.
pub struct Downloader {
    source: Url,
    destination: PathBuf,
    user_agent: Option<String>,
    listener: Arc<dyn MessageListener>,
}

impl Downloader {
    pub fn new(
        source: Url,
        destination: impl Into<PathBuf>,
        user_agent: Option<String>,
        listener: Arc<dyn MessageListener>,
    ) -> Self {
        Self {
            source,
            destination: destination.into(),
            user_agent,
            listener,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Fetch the archive, reporting bytes to `progress`. If `cancel` fires
    /// mid-transfer the partial file is removed before returning.
    pub fn download(&self, progress: &ProgressListener, cancel: &CancellationToken) -> Result<()> {
        self.try_download(progress, cancel)
            .map_err(|e| e.within(OperationKind::Download))
    }

    fn try_download(&self, progress: &ProgressListener, cancel: &CancellationToken) -> Result<()> {
        if let Some(parent) = self.destination.parent() {
            fs::create_dir_all(parent)?;
        }
        if self.destination.exists() {
            return Err(ManagedSdkError::file_already_exists(&self.destination));
        }

        let (mut body, content_length) = self.open_source()?;
        self.listener.message(&format!("Downloading {}\n", self.source));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.destination)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => ManagedSdkError::file_already_exists(&self.destination),
                _ => e.into(),
            })?;

        let message = match content_length {
            Some(len) => format!("Downloading SDK ({})", format_file_size(len)),
            None => "Downloading SDK".to_string(),
        };
        progress.start(&message, content_length);

        if let Err(e) = self.copy_to(&mut body, file, progress, cancel) {
            // partial archives are never left behind
            let _ = fs::remove_file(&self.destination);
            return Err(e);
        }
        progress.done();
        Ok(())
    }

    fn open_source(&self) -> Result<(Box<dyn Read + Send>, Option<u64>)> {
        if self.source.scheme() == "file" {
            let path = self.source.to_file_path().map_err(|_| {
                ManagedSdkError::installation(format!("Invalid file URL: {}", self.source))
            })?;
            let file = File::open(&path)?;
            let len = file.metadata()?.len();
            return Ok((Box::new(file), Some(len)));
        }

        let mut builder = Client::builder().timeout(HTTP_TIMEOUT);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build()?;
        let response = client.get(self.source.clone()).send()?;
        if !response.status().is_success() {
            return Err(ManagedSdkError::installation(format!(
                "Download failed: HTTP {}",
                response.status()
            )));
        }
        let len = response.content_length();
        Ok((Box::new(response), len))
    }

    fn copy_to(
        &self,
        body: &mut dyn Read,
        file: File,
        progress: &ProgressListener,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut out = BufWriter::new(file);
        let mut buffer = [0u8; BUFFER_SIZE];
        loop {
            if cancel.is_cancelled() {
                self.listener.message("Download was interrupted\n");
                self.listener.message("Cleaning up...\n");
                return Err(ManagedSdkError::interrupted("Download was interrupted"));
            }
            let read = match body.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            out.write_all(&buffer[..read])?;
            progress.update(read as u64);
        }
        out.flush()?;
        Ok(())
    }
}
