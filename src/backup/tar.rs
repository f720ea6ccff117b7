use crate::backup::archive::ArchiveEntryIterable;
use crate::backup::compress::{CompressorBuilder, CompressorConfig};
use crate::backup::finish::Finish;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::{AddFunctionName, AddMsg};

use function_name::named;
use getset::Getters;

use std::io::{BufWriter, IntoInnerError};
use std::path::{Path, PathBuf};

/// A member written into an archive and the size of its data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivedMember {
    pub name: PathBuf,
    pub size: u64,
}

#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct ArchiveSummary {
    members: Vec<ArchivedMember>,
    /// Entries that could not be read, the archive was written without them.
    skipped: Option<Error>,
}

/// Writes the entries of `source` as a compressed tar archive at `output_file`.
///
/// The archive is built in a hidden temp file next to `output_file` and only
/// renamed into place once complete, so a failed run never leaves a truncated
/// archive behind. Unreadable entries are skipped like `tar --ignore-failed-read`.
#[named]
pub fn write_tar_archive<S: ArchiveEntryIterable>(
    source: &S,
    compressor: &CompressorConfig,
    output_file: &Path,
) -> Result<ArchiveSummary> {
    let output_dir = output_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".dist-backup-")
        .suffix(".partial")
        .tempfile_in(output_dir)
        .map_err(Error::from)
        .add_msg(format!("Create temp file in {:?} failed", output_dir))?;

    let compressed = compressor
        .build_compressor(BufWriter::new(&mut temp))
        .map(BufWriter::new)?;
    let mut writer = tar::Builder::new(compressed);
    writer.follow_symlinks(false);

    let mut members = Vec::new();
    let mut errors = Vec::new();
    for entry in source.archive_entry_iterator()? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {e}");
                errors.push(e);
                continue;
            }
        };
        match writer.append_path_with_name(&entry.src, &entry.dst) {
            Ok(()) => {
                let size = std::fs::symlink_metadata(&entry.src)
                    .ok()
                    .filter(|md| md.is_file())
                    .map(|md| md.len())
                    .unwrap_or(0);
                members.push(ArchivedMember {
                    name: entry.dst.to_path_buf(),
                    size,
                });
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {e}", entry.src);
                errors.push(Error::from(e).add_msg(format!("Append {:?} failed", entry.src)));
            }
        }
    }
    tracing::info!("Processed {} archive entries", members.len());

    writer
        .into_inner()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .finish()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?;

    temp.persist(output_file)
        .map_err(|e| Error::from(e.error))
        .add_msg(format!("Rename archive onto {:?} failed", output_file))
        .add_fn_name(function_path!())?;

    Ok(ArchiveSummary {
        members,
        skipped: convert_error_vec(errors).err(),
    })
}
