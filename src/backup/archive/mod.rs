pub mod walkdir_globset;

use crate::backup::result_error::result::Result;

use dyn_iter::DynIter;

use std::path::Path;
use std::sync::Arc;

/// A single file or directory to be written into a tar archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path on the filesystem.
    pub src: Arc<Path>,
    /// Member name inside the archive.
    pub dst: Arc<Path>,
}

impl ArchiveEntry {
    pub fn new<A: Into<Arc<Path>>, B: Into<Arc<Path>>>(src: A, dst: B) -> ArchiveEntry {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }
}

/// Sources that can enumerate what goes into an archive.
///
/// The outer `Result` fails when the source cannot be read at all, the inner
/// ones carry per-entry problems that the writer may skip.
pub trait ArchiveEntryIterable {
    fn archive_entry_iterator<'a>(&self) -> Result<DynIter<'a, Result<ArchiveEntry>>>;
}
