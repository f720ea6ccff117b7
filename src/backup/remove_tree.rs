//! Removal of read-only trees such as VCS hot copies.

use walkdir::WalkDir;

use std::io;
use std::path::Path;
use std::time::Duration;

/// Waits between failed attempts when retrying.
pub static RETRY_BACKOFF: [Duration; 4] = [
    Duration::from_millis(500),
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Removes `path` and everything below it, making it writable first.
///
/// With `retry`, a failed removal is retried after each delay of
/// [`RETRY_BACKOFF`]; when all of those fail, one last attempt is made and
/// its error returned. A missing `path` is not an error.
pub fn remove_tree<P: AsRef<Path>>(path: P, retry: bool) -> io::Result<()> {
    remove_tree_with(path.as_ref(), retry, remove_writable_tree, std::thread::sleep)
}

pub(crate) fn remove_tree_with<R, S>(
    path: &Path,
    retry: bool,
    mut remove: R,
    mut sleep: S,
) -> io::Result<()>
where
    R: FnMut(&Path) -> io::Result<()>,
    S: FnMut(Duration),
{
    if std::fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    if retry {
        for delay in RETRY_BACKOFF {
            match remove(path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!("Removing {:?} failed, retrying in {:?}: {}", path, delay, e);
                    sleep(delay);
                }
            }
        }
        tracing::warn!("Removing {:?} still failing, last attempt", path);
    }

    remove(path)
}

fn remove_writable_tree(path: &Path) -> io::Result<()> {
    make_tree_writable(path)?;
    if std::fs::symlink_metadata(path)?.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Grants read/write to every entry below `path`, symlinks excluded.
pub fn make_tree_writable(path: &Path) -> io::Result<()> {
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.path_is_symlink() {
            continue;
        }
        let mut permissions = entry.metadata().map_err(io::Error::from)?.permissions();
        grant_write(&mut permissions);
        std::fs::set_permissions(entry.path(), permissions)?;
    }
    Ok(())
}

#[cfg(unix)]
fn grant_write(permissions: &mut std::fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o666);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn grant_write(permissions: &mut std::fs::Permissions) {
    permissions.set_readonly(false);
}
