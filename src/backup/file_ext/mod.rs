//! Extensions of the files jobs write into `output`.

use itertools::Itertools;

use std::sync::Arc;

/// Inner format of directory and SVN archives.
pub static TAR_FILE_EXT: &str = "tar";
/// Inner format of database dumps.
pub static SQL_FILE_EXT: &str = "sql";

/// Stages of the write chain that leave a mark on the file name.
pub trait FileExtProvider {
    fn file_ext(&self) -> Option<Arc<str>>;

    /// `inner` followed by this stage's extension, `tar` -> `tar.xz`.
    fn wrap_ext(&self, inner: &str) -> Arc<str> {
        std::iter::once(inner)
            .chain(self.file_ext().as_deref())
            .join(".")
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gz;

    impl FileExtProvider for Gz {
        fn file_ext(&self) -> Option<Arc<str>> {
            Some("gz".into())
        }
    }

    struct Plain;

    impl FileExtProvider for Plain {
        fn file_ext(&self) -> Option<Arc<str>> {
            None
        }
    }

    #[test]
    fn test_wrap_ext() {
        assert_eq!(Gz.wrap_ext(TAR_FILE_EXT).as_ref(), "tar.gz");
        assert_eq!(Plain.wrap_ext(SQL_FILE_EXT).as_ref(), "sql");
    }
}
