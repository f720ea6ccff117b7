//! Subversion repository snapshots, optionally taken from a hot copy.

use crate::backup::archive::walkdir_globset::WalkdirAndGlobsetSource;
use crate::backup::artifact::{Artifact, Outcome};
use crate::backup::command::CommandLine;
use crate::backup::context::RunContext;
use crate::backup::file_ext::TAR_FILE_EXT;
use crate::backup::job::Job;
use crate::backup::remove_tree::remove_tree;
use crate::backup::result_error::result::Result;
use crate::backup::tar::write_tar_archive;

use std::path::{Path, PathBuf};

pub static HOT_COPY_DIR: &str = "svn-hot-copy";

pub fn hotcopy_command(folder: &Path, dest: &Path) -> CommandLine {
    CommandLine::new("svnadmin")
        .arg("hotcopy")
        .path_args([folder, dest])
        .arg("--clean-logs")
}

/// Takes a hot copy under `output`, falling back to the live repository.
fn hot_copy(folder: &Path, ctx: &RunContext) -> Result<Option<PathBuf>> {
    let dest = ctx.defaults().output().join(HOT_COPY_DIR);
    let output = ctx.probe_tool(&hotcopy_command(folder, &dest))?;
    if output.success() {
        Ok(Some(dest))
    } else {
        tracing::warn!(
            "svnadmin hotcopy of {:?} exited with {:?}, archiving the live repository",
            folder,
            output.status
        );
        // A failed hot copy may leave a partial tree behind.
        if let Err(e) = remove_tree(&dest, true) {
            tracing::warn!("Could not remove partial hot copy {:?}: {e}", dest);
        }
        Ok(None)
    }
}

pub fn run(job: &Job, ctx: &RunContext) -> Result<Outcome> {
    let folder = PathBuf::from(job.required_option("folder")?);
    if !folder.exists() {
        tracing::info!("Skipping {:?}: repository {:?} does not exist", job.name(), folder);
        return Ok(Outcome::Skipped);
    }
    let output_file = ctx
        .defaults()
        .output_file(job.required_option("output")?, TAR_FILE_EXT);
    let hot = job.option_flag("hot");

    if ctx.dry_run() {
        tracing::info!(
            "Dry run: would archive{} SVN repository {:?} -> {:?}",
            if hot { " a hot copy of" } else { "" },
            folder,
            output_file
        );
        return Ok(Artifact::from_job(job, [output_file]).into());
    }

    let hot_copy_dir = if hot { hot_copy(&folder, ctx)? } else { None };
    let source = WalkdirAndGlobsetSource::builder()
        .src_dir(hot_copy_dir.as_deref().unwrap_or(folder.as_path()))
        .build();
    let archived = write_tar_archive(&source, ctx.defaults().compressor(), &output_file);

    if let Some(dir) = &hot_copy_dir {
        if let Err(e) = remove_tree(dir, true) {
            tracing::warn!("Could not remove hot copy {:?}: {e}", dir);
        }
    }

    let summary = archived?;
    if let Some(skipped) = summary.skipped() {
        tracing::warn!("Archive {:?} is missing entries:\n{skipped}", output_file);
    }
    Ok(Artifact::from_job(job, [output_file]).into())
}
