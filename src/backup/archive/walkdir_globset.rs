use crate::backup::archive::{ArchiveEntry, ArchiveEntryIterable};
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};

use bon::Builder;
use dyn_iter::{DynIter, IntoDynIterator};
use function_name::named;
use getset::Getters;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use std::path::{Component, Path, PathBuf};

/// A folder (or a single file) to archive, minus anything matching the
/// exclude patterns.
///
/// Patterns follow `tar --exclude`: they are tried against the path relative
/// to the folder and against the bare file name, and `*` crosses `/`.
/// An excluded directory is pruned with everything below it.
#[derive(Clone, Debug, Builder, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct WalkdirAndGlobsetSource {
    #[builder(into)]
    src_dir: PathBuf,
    #[builder(default, into)]
    excludes: Vec<String>,
}

pub fn build_exclude_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern.as_ref())
                .literal_separator(false)
                .build()
                .map_err(Error::from)
                .add_msg(format!("Invalid exclude pattern {:?}", pattern.as_ref()))?,
        );
    }
    Ok(builder.build()?)
}

/// Archive member name for `path`: absolute, without root or prefix, the
/// layout `tar -C / <folder>` produces.
pub fn member_name(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

fn is_excluded(entry: &DirEntry, base: &Path, excludes: &GlobSet) -> bool {
    if entry.depth() == 0 || excludes.is_empty() {
        return false;
    }
    let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
    excludes.is_match(relative) || excludes.is_match(entry.file_name())
}

impl ArchiveEntryIterable for WalkdirAndGlobsetSource {
    #[named]
    fn archive_entry_iterator<'a>(&self) -> Result<DynIter<'a, Result<ArchiveEntry>>> {
        // A single file root yields just that file.
        std::fs::symlink_metadata(&self.src_dir)
            .map_err(Error::from)
            .add_msg(format!("Read archive source {:?} failed", self.src_dir))?;

        let base = std::path::absolute(&self.src_dir)?;
        let excludes = build_exclude_set(&self.excludes)?;
        tracing::info!(
            "Starting directory scan: {:?} with {} exclude patterns",
            base,
            self.excludes.len()
        );

        let walk_base = base.clone();
        let entries = WalkDir::new(&base)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |de| {
                let excluded = is_excluded(de, &walk_base, &excludes);
                if excluded {
                    tracing::debug!("Excluding {:?}", de.path());
                }
                !excluded
            })
            .map(|res| {
                res.map_err(Error::from).map(|de| {
                    let src = de.into_path();
                    let dst = member_name(&src);
                    tracing::trace!("Including {:?} -> {:?}", src, dst);
                    ArchiveEntry::new(src, dst)
                })
            })
            .map(|res| res.add_fn_name(function_path!()));

        Ok(entries.into_dyn_iter())
    }
}
