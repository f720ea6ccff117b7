//! Maps a job's kind to the code that runs it.

pub mod database;
pub mod directory;
pub mod package_list;
pub mod report;
pub mod vcs;

use crate::backup::artifact::{JobResult, Outcome};
use crate::backup::context::RunContext;
use crate::backup::job::{Job, JobKind};
use crate::backup::result_error::result::Result;
use crate::backup::router;

/// Runs one job and folds every way it can go wrong into its [`Outcome`].
///
/// Unknown kinds and jobs that break their kind's option table are skipped
/// before any handler runs. A handler error becomes [`Outcome::Failed`] so
/// the pipeline carries on.
pub fn dispatch(job: &Job, ctx: &RunContext, history: &[JobResult]) -> Outcome {
    if *job.kind() == JobKind::Unknown {
        tracing::debug!("Skipping {:?}: unknown job type", job.name());
        return Outcome::Skipped;
    }
    if let Err(e) = job.check_options() {
        tracing::debug!("Skipping {:?}: {e}", job.name());
        return Outcome::Skipped;
    }

    tracing::debug!("Running {} job {:?}", job.kind(), job.name());
    match run_handler(job, ctx, history) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Job {:?} failed: {e}", job.name());
            Outcome::Failed(e.to_string())
        }
    }
}

fn run_handler(job: &Job, ctx: &RunContext, history: &[JobResult]) -> Result<Outcome> {
    match job.kind() {
        JobKind::Directory => directory::run(job, ctx),
        JobKind::Database => database::run(job, ctx),
        JobKind::Vcs => vcs::run(job, ctx),
        JobKind::Sync => router::route(job, ctx, history),
        JobKind::Report => report::run(job, ctx),
        JobKind::PackageList => package_list::run(job, ctx),
        // Placeholder kind, accepted in configuration but never does anything.
        JobKind::Cleanup => Ok(Outcome::Skipped),
        JobKind::Unknown => Ok(Outcome::Skipped),
    }
}
