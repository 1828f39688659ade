use super::{check_cancelled, create_parent, entry_target, restore_mode};
use crate::listener::MessageListener;
use crate::{ManagedSdkError, Result};
use log::trace;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;

const S_IFMT: u32 = 0o170000;
const S_IFREG: u32 = 0o100000;

pub(super) fn extract(
    archive: &Path,
    destination: &Path,
    listener: &dyn MessageListener,
    cancel: &CancellationToken,
) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = ::zip::ZipArchive::new(BufReader::new(file))?;

    for index in 0..zip.len() {
        check_cancelled(cancel)?;
        let mut entry = zip.by_index(index)?;
        let entry_path = entry.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            ManagedSdkError::installation(format!(
                "Archive entry escapes the destination: {}",
                entry.name()
            ))
        })?;
        let target = entry_target(destination, &entry_path)?;
        listener.message(&target.to_string_lossy());

        let mode = entry.unix_mode();
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else if mode.map_or(true, |m| m & S_IFMT == 0 || m & S_IFMT == S_IFREG) {
            create_parent(&target)?;
            let mut out = BufWriter::new(File::create(&target)?);
            io::copy(&mut entry, &mut out)?;
            out.flush()?;
            drop(out);
            if let Some(mode) = mode {
                restore_mode(&target, mode);
            }
        } else {
            trace!("Skipping non-regular entry {}", entry_path.display());
        }
    }
    Ok(())
}
