use crate::backup::compress::CompressorConfig;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::job::Job;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use crate::backup::validate::{
    validate_dir_exist_or_created, validate_job_output_names, validate_unique_job_names,
};

use bon::Builder;
use getset::Getters;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub static DEFAULT_CONFIG_PATH: &str = "/etc/dist-backup.yml";

/// Global settings shared read-only by every job of a run.
#[derive(Clone, Debug, Deserialize, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct Defaults {
    /// Folder receiving archives and dumps.
    #[validate(custom(function = validate_dir_exist_or_created))]
    #[builder(into)]
    output: PathBuf,
    /// Root of the dated copies made by `archive` sync jobs.
    #[validate(custom(function = validate_dir_exist_or_created))]
    #[builder(into)]
    archive: PathBuf,
    /// Used by directory jobs that declare no `exclude` of their own.
    #[serde(default)]
    #[builder(default, into)]
    exclude: Vec<String>,
    #[serde(default)]
    #[builder(default)]
    #[validate(nested)]
    compressor: CompressorConfig,
    /// Fail jobs whose external tools exit non-zero.
    #[serde(default)]
    #[builder(default)]
    strict_exit_codes: bool,
}

impl Defaults {
    /// `inner` followed by the compressor's extension, e.g. `tar.xz`.
    pub fn file_ext(&self, inner: &str) -> Arc<str> {
        self.compressor.wrap_ext(inner)
    }

    pub fn output_file(&self, base_name: &str, inner_ext: &str) -> PathBuf {
        self.output
            .join(format!("{}.{}", base_name, self.file_ext(inner_ext)))
    }

    /// Resolves the `output` and `archive` aliases, anything else is a path.
    pub fn resolve_folder(&self, folder: &str) -> PathBuf {
        match folder {
            "output" => self.output.clone(),
            "archive" => self.archive.clone(),
            other => PathBuf::from(other),
        }
    }
}

fn validate_config_jobs(config: &BackupConfig) -> std::result::Result<(), ValidationError> {
    validate_unique_job_names(&config.jobs)?;
    validate_job_output_names(&config.jobs)
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_config_jobs"))]
pub struct BackupConfig {
    #[validate(nested)]
    pub defaults: Defaults,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl BackupConfig {
    /// Reads and validates a YAML configuration.
    ///
    /// A missing file is reported as [`Error::ConfigNotFound`] so callers can
    /// tell it apart from a file that exists but does not parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound(path.to_path_buf()))
            }
            Err(e) => {
                return Err(Error::from(e).add_msg(format!("Open config failed: {:?}", path)))
            }
        };

        let config = serde_yml::from_reader::<_, BackupConfig>(file)
            .map_err(Error::from)
            .add_msg(format!("Parse YAML config failed: {:?}", path))?;
        config
            .validate()
            .map_err(Error::from)
            .add_msg(format!("Config validation failed: {:?}", path))?;

        Ok(config)
    }
}
