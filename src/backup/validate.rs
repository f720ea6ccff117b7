//! Validation functions for configuration values.

use crate::backup::job::Job;

use itertools::Itertools;
use sanitize_filename::{is_sanitized, sanitize};
use validator::ValidationError;

use std::path::Path;

pub fn validate_valid_archive_base_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    if name.as_ref().is_empty() || !is_sanitized(name.as_ref()) {
        return Err(ValidationError::new("InvalidArchiveBaseName").with_message(
            format!(
                "Invalid file name {:?}, try sanitizing like {:?}",
                name.as_ref(),
                sanitize(name.as_ref())
            )
            .into(),
        ));
    }

    Ok(())
}

pub fn validate_dir_exist_or_created<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return std::fs::create_dir_all(dir).map_err(|e| {
            ValidationError::new("InvalidDirectory").with_message(
                format!("cannot create or access directory {:?}: {}", dir, e).into(),
            )
        });
    }

    Ok(())
}

pub fn validate_unique_job_names(jobs: &[Job]) -> Result<(), ValidationError> {
    let duplicates = jobs
        .iter()
        .map(|j| j.name().as_ref())
        .duplicates()
        .collect_vec();
    if !duplicates.is_empty() {
        return Err(ValidationError::new("DuplicateJobName")
            .with_message(format!("Duplicate job names: {}", duplicates.join(", ")).into()));
    }

    Ok(())
}

/// `output` of directory, database and vcs jobs becomes a file name inside `defaults.output`.
pub fn validate_job_output_names(jobs: &[Job]) -> Result<(), ValidationError> {
    jobs.iter()
        .filter(|j| j.kind().writes_into_output_dir())
        .filter_map(|j| j.option("output"))
        .try_for_each(validate_valid_archive_base_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::job::JobKind;
    use tempfile::TempDir;

    #[test]
    fn test_archive_base_name() {
        assert!(validate_valid_archive_base_name("etc").is_ok());
        assert!(validate_valid_archive_base_name("../etc").is_err());
        assert!(validate_valid_archive_base_name("a/b").is_err());
        assert!(validate_valid_archive_base_name("").is_err());
    }

    #[test]
    fn test_dir_created_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b/c");

        assert!(validate_dir_exist_or_created(&nested).is_ok());
        assert!(nested.is_dir());
    }

    #[test]
    fn test_dir_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, "x").unwrap();

        assert!(validate_dir_exist_or_created(&file).is_err());
    }

    #[test]
    fn test_unique_job_names() {
        let none = Vec::<(&str, &str)>::new();
        let jobs = vec![
            Job::new("etc", JobKind::Directory, none.clone()),
            Job::new("db", JobKind::Database, none.clone()),
        ];
        assert!(validate_unique_job_names(&jobs).is_ok());

        let jobs = vec![
            Job::new("etc", JobKind::Directory, none.clone()),
            Job::new("etc", JobKind::Sync, none),
        ];
        let err = validate_unique_job_names(&jobs).unwrap_err();
        assert!(err.to_string().contains("etc"));
    }

    #[test]
    fn test_job_output_names_only_checked_for_output_dir_kinds() {
        let jobs = vec![
            Job::new("etc", JobKind::Directory, [("output", "etc")]),
            Job::new("dpkg", JobKind::PackageList, [("output", "/var/backups/dpkg.txt")]),
        ];
        assert!(validate_job_output_names(&jobs).is_ok());

        let jobs = vec![Job::new("etc", JobKind::Directory, [("output", "../etc")])];
        assert!(validate_job_output_names(&jobs).is_err());
    }
}
