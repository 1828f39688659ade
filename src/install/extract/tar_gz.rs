use super::{check_cancelled, create_parent, entry_target, restore_mode};
use crate::listener::MessageListener;
use crate::Result;
use flate2::read::GzDecoder;
use log::trace;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub(super) fn extract(
    archive: &Path,
    destination: &Path,
    listener: &dyn MessageListener,
    cancel: &CancellationToken,
) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    for entry in tar.entries()? {
        check_cancelled(cancel)?;
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        let target = entry_target(destination, &entry_path)?;
        listener.message(&target.to_string_lossy());

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry_type.is_file() {
            create_parent(&target)?;
            let mut out = BufWriter::new(File::create(&target)?);
            io::copy(&mut entry, &mut out)?;
            out.flush()?;
            drop(out);
            restore_mode(&target, entry.header().mode()?);
        } else {
            trace!("Skipping {:?} entry {}", entry_type, entry_path.display());
        }
    }
    Ok(())
}
