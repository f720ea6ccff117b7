use crate::backup::job::Job;

use chrono::{NaiveDateTime, TimeDelta};
use getset::Getters;

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Files produced by one job, tagged with the job's routing group.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Artifact {
    paths: Vec<PathBuf>,
    producing_job: Arc<str>,
    group: Arc<str>,
}

impl Artifact {
    pub fn from_job<I, P>(job: &Job, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            producing_job: job.name().clone(),
            group: job.group(),
        }
    }

    /// Paths that currently resolve to regular files.
    pub fn existing_paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path).filter(|p| p.is_file())
    }

    pub fn total_size(&self) -> u64 {
        self.existing_paths()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|md| md.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// What a handler reports back to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The job declined to run. Never recorded in the history.
    Skipped,
    /// The job wrote files that later sync jobs may route.
    Produced(Artifact),
    /// The job ran but left nothing to route.
    Ran,
    /// A report job's rendered text.
    Reported(String),
    /// The job ran and failed. Recorded, never routed.
    Failed(String),
}

impl Outcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped)
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Outcome::Produced(artifact) => Some(artifact),
            _ => None,
        }
    }
}

impl From<Artifact> for Outcome {
    fn from(value: Artifact) -> Self {
        Outcome::Produced(value)
    }
}

#[derive(Clone, Debug, Getters)]
#[getset(get = "pub")]
pub struct JobResult<'a> {
    job: &'a Job,
    started_at: NaiveDateTime,
    finished_at: NaiveDateTime,
    outcome: Outcome,
}

impl<'a> JobResult<'a> {
    /// A clock stepping backwards is clamped so `finished_at >= started_at`.
    pub fn new(
        job: &'a Job,
        started_at: NaiveDateTime,
        finished_at: NaiveDateTime,
        outcome: Outcome,
    ) -> Self {
        Self {
            job,
            started_at,
            finished_at: finished_at.max(started_at),
            outcome,
        }
    }

    pub fn elapsed(&self) -> TimeDelta {
        self.finished_at - self.started_at
    }
}
