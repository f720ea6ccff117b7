//! Folder archives: `<output>.tar.xz`, plus an optional `<output>.info.txt`.

use crate::backup::archive::walkdir_globset::WalkdirAndGlobsetSource;
use crate::backup::artifact::{Artifact, Outcome};
use crate::backup::context::RunContext;
use crate::backup::file_ext::TAR_FILE_EXT;
use crate::backup::humanize::human_size;
use crate::backup::job::Job;
use crate::backup::result_error::AddMsg;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::tar::{write_tar_archive, ArchiveSummary};

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};

pub static INFO_FILE_SUFFIX: &str = "info.txt";

pub fn run(job: &Job, ctx: &RunContext) -> Result<Outcome> {
    let folder = PathBuf::from(job.required_option("folder")?);
    if !folder.exists() {
        tracing::info!("Skipping {:?}: folder {:?} does not exist", job.name(), folder);
        return Ok(Outcome::Skipped);
    }

    let excludes = match job.option_list("exclude") {
        own if own.is_empty() => ctx.defaults().exclude().clone(),
        own => own,
    };
    let base_name = job.required_option("output")?;
    let output_file = ctx.defaults().output_file(base_name, TAR_FILE_EXT);
    let info_file = job
        .option_flag("info")
        .then(|| ctx.defaults().output().join(format!("{base_name}.{INFO_FILE_SUFFIX}")));
    let paths = std::iter::once(output_file.clone())
        .chain(info_file.clone())
        .collect::<Vec<_>>();

    if ctx.dry_run() {
        tracing::info!(
            "Dry run: would archive {:?} -> {:?} (exclude: {})",
            folder,
            output_file,
            excludes.join(", ")
        );
        return Ok(Artifact::from_job(job, paths).into());
    }

    let started_at = ctx.clock().now();
    let source = WalkdirAndGlobsetSource::builder()
        .src_dir(&folder)
        .excludes(excludes)
        .build();
    let summary = write_tar_archive(&source, ctx.defaults().compressor(), &output_file)?;
    if let Some(skipped) = summary.skipped() {
        tracing::warn!("Archive {:?} is missing entries:\n{skipped}", output_file);
    }

    if let Some(info_file) = &info_file {
        write_info_file(info_file, started_at, &folder, &output_file, &summary)?;
    }

    Ok(Artifact::from_job(job, paths).into())
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    std::io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn write_info_file(
    info_file: &Path,
    started_at: NaiveDateTime,
    folder: &Path,
    archive: &Path,
    summary: &ArchiveSummary,
) -> Result<()> {
    let mut text = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(text, "Directory backup :");
    let _ = writeln!(text, " Date : {}", started_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(text, " Folder : {}", folder.display());
    let _ = writeln!(text, " SHA-256 : {}", sha256_file(archive)?);
    let _ = writeln!(text);
    let _ = writeln!(text, "File list :");
    for member in summary.members().iter().filter(|m| m.size > 0) {
        let _ = writeln!(text, " {} [{}]", member.name.display(), human_size(member.size));
    }

    std::fs::write(info_file, text)
        .map_err(Error::from)
        .add_msg(format!("Write info file {:?} failed", info_file))
}
