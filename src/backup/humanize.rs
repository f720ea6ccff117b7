//! Human readable sizes, durations and folder listings for reports.

use chrono::TimeDelta;
use itertools::Itertools;
use walkdir::{DirEntry, WalkDir};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

static SIZE_UNITS: &[&str] = &["", "K", "M", "G", "T", "P", "E", "Z"];

/// `1536` -> `1.5KB`, one decimal, binary multiples.
pub fn human_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in SIZE_UNITS {
        if num.abs() < 1024.0 {
            return format!("{num:3.1}{unit}B");
        }
        num /= 1024.0;
    }
    format!("{num:.1}YB")
}

/// Largest unit first down to seconds, leading zero units omitted: `1d2h3m4s`, `3m4s`, `4s`.
pub fn pretty_duration(delta: TimeDelta) -> String {
    let seconds = delta.num_seconds().unsigned_abs();
    let (days, seconds) = (seconds / 86_400, seconds % 86_400);
    let (hours, seconds) = (seconds / 3_600, seconds % 3_600);
    let (minutes, seconds) = (seconds / 60, seconds % 60);

    if days > 0 {
        format!("{days}d{hours}h{minutes}m{seconds}s")
    } else if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Regular files (symlinks followed) count, directories and links to them do not.
fn file_size(entry: &DirEntry) -> Option<u64> {
    if entry.file_type().is_dir() {
        return None;
    }
    std::fs::metadata(entry.path())
        .ok()
        .filter(|md| !md.is_dir())
        .map(|md| md.len())
}

pub fn folder_bytes<P: AsRef<Path>>(folder: P) -> u64 {
    WalkDir::new(folder)
        .into_iter()
        .filter_map(|res| res.ok())
        .filter_map(|entry| file_size(&entry))
        .sum()
}

/// Total size of every file below `folder`, human readable.
pub fn folder_size<P: AsRef<Path>>(folder: P) -> String {
    human_size(folder_bytes(folder))
}

struct DirTally {
    path: PathBuf,
    bytes: u64,
    files: usize,
}

/// One line per directory below `folder`, in walk order: the directory
/// (relative to `folder` after the first line), its own files' total size
/// in brackets when non zero, and its file count when non zero.
pub fn tree_size<P: AsRef<Path>>(folder: P) -> String {
    let folder = folder.as_ref();
    let mut tallies: Vec<DirTally> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    for entry in WalkDir::new(folder)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|res| res.ok())
    {
        if entry.file_type().is_dir() {
            index.insert(entry.path().to_path_buf(), tallies.len());
            tallies.push(DirTally {
                path: entry.path().to_path_buf(),
                bytes: 0,
                files: 0,
            });
            continue;
        }

        let Some(size) = file_size(&entry) else {
            continue;
        };
        if let Some(&i) = entry.path().parent().and_then(|p| index.get(p)) {
            tallies[i].bytes += size;
            tallies[i].files += 1;
        }
    }

    let root = folder.to_string_lossy();
    tallies
        .iter()
        .map(|tally| {
            let mut line = if tally.path == folder {
                root.to_string()
            } else {
                let path = tally.path.to_string_lossy();
                format!(" {}", path.strip_prefix(&*root).unwrap_or(&*path))
            };
            if tally.bytes > 0 {
                line.push_str(&format!(" [{}]", human_size(tally.bytes)));
            }
            if tally.files > 0 {
                line.push_str(&format!(" {} files", tally.files));
            }
            line
        })
        .join("\n")
}
