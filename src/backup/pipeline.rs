//! One linear pass over the configured jobs.

use crate::backup::artifact::{Artifact, JobResult, Outcome};
use crate::backup::context::RunContext;
use crate::backup::handlers::dispatch;
use crate::backup::humanize::{human_size, pretty_duration};
use crate::backup::job::{Job, JobKind, RESERVED_DEFAULTS_NAME};

use getset::Getters;

/// Receives report lines as soon as each job finishes.
pub trait ReportSink {
    fn emit(&mut self, line: &str);
}

impl<F: FnMut(&str)> ReportSink for F {
    fn emit(&mut self, line: &str) {
        self(line)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// No job produced anything, or there were no jobs.
    NothingToDo,
    Completed(usize),
}

impl RunStatus {
    pub fn from_history(history: &[JobResult]) -> Self {
        match history.len() {
            0 => RunStatus::NothingToDo,
            n => RunStatus::Completed(n),
        }
    }
}

#[derive(Getters)]
#[getset(get = "pub")]
pub struct Pipeline {
    ctx: RunContext,
}

impl Pipeline {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    /// Runs `jobs` in order and returns the history of those that did not skip.
    ///
    /// Each job sees the results of the jobs before it. A failing job is
    /// recorded and reported, never fatal.
    pub fn run<'a, S: ReportSink + ?Sized>(
        &self,
        jobs: &'a [Job],
        sink: &mut S,
    ) -> Vec<JobResult<'a>> {
        let mut history: Vec<JobResult<'a>> = Vec::with_capacity(jobs.len());
        for job in jobs {
            if job.name().as_ref() == RESERVED_DEFAULTS_NAME {
                tracing::debug!("Ignoring job named {RESERVED_DEFAULTS_NAME:?}");
                continue;
            }

            let started_at = self.ctx.clock().now();
            let outcome = dispatch(job, &self.ctx, &history);
            let finished_at = self.ctx.clock().now();
            if outcome.is_skipped() {
                continue;
            }

            let result = JobResult::new(job, started_at, finished_at, outcome);
            if let Some(line) = report_line(&result) {
                sink.emit(&line);
            }
            history.push(result);
        }

        tracing::info!("{} of {} jobs ran", history.len(), jobs.len());
        history
    }
}

/// The line a finished job contributes to the run report, if any.
pub fn report_line(result: &JobResult) -> Option<String> {
    let job = result.job();
    let name = job.display_name();
    let verb = match result.outcome() {
        Outcome::Failed(msg) => return Some(format!("Job \"{}\" failed: {msg}", job.name())),
        Outcome::Reported(text) => return Some(text.clone()),
        _ => match job.kind() {
            JobKind::Directory => format!("Backup folder \"{name}\""),
            JobKind::Database => format!("Backup {name} database"),
            JobKind::Vcs => format!("Backup SVN repository \"{name}\""),
            _ => return None,
        },
    };

    let size = result
        .outcome()
        .artifact()
        .map(Artifact::total_size)
        .filter(|size| *size > 0)
        .map(|size| format!(" [{}]", human_size(size)))
        .unwrap_or_default();
    Some(format!("{verb} ({}){size}", pretty_duration(result.elapsed())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::testing::{at, test_context, test_defaults, RecordingRunner, SequenceClock};
    use tempfile::TempDir;

    fn run_collecting<'a>(pipeline: &Pipeline, jobs: &'a [Job]) -> (Vec<JobResult<'a>>, Vec<String>) {
        let mut lines = Vec::new();
        let history = pipeline.run(jobs, &mut |line: &str| lines.push(line.to_string()));
        (history, lines)
    }

    #[test]
    fn test_empty_registry_is_nothing_to_do() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_context(temp_dir.path(), &RecordingRunner::succeeding()));

        let (history, lines) = run_collecting(&pipeline, &[]);
        assert!(history.is_empty());
        assert!(lines.is_empty());
        assert_eq!(RunStatus::from_history(&history), RunStatus::NothingToDo);
    }

    #[test]
    fn test_directory_without_folder_leaves_no_trace() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_context(temp_dir.path(), &RecordingRunner::succeeding()));
        let jobs = vec![Job::new("etc", JobKind::Directory, [("output", "etc")])];

        let (history, lines) = run_collecting(&pipeline, &jobs);
        assert!(history.is_empty());
        assert!(lines.is_empty());
    }

    #[test]
    fn test_database_line_has_duration_and_size() {
        let temp_dir = TempDir::new().unwrap();
        let clock = SequenceClock::new([at(2024, 3, 1, 10, 0, 0), at(2024, 3, 1, 10, 3, 4)]);
        let ctx = RunContext::builder()
            .defaults(test_defaults(temp_dir.path()))
            .runner(Box::new(RecordingRunner::succeeding_with_stdout("-- dump\n")))
            .clock(Box::new(clock))
            .build();
        let pipeline = Pipeline::new(ctx);
        let jobs = vec![Job::new(
            "mysql",
            JobKind::Database,
            [("name", "MySQL"), ("driver", "mysql"), ("output", "mysql")],
        )];

        let (history, lines) = run_collecting(&pipeline, &jobs);
        assert_eq!(RunStatus::from_history(&history), RunStatus::Completed(1));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Backup MySQL database (3m4s) ["));
        assert!(lines[0].ends_with("B]"));
    }

    #[test]
    fn test_later_jobs_route_earlier_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::succeeding_with_stdout("-- dump\n");
        let pipeline = Pipeline::new(test_context(temp_dir.path(), &runner));
        let folder = temp_dir.path().join("etc");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("hosts"), "127.0.0.1 localhost\n").unwrap();
        let jobs = vec![
            Job::new("default", JobKind::Unknown, [("output", "/tmp")]),
            Job::new(
                "etc",
                JobKind::Directory,
                [("folder", folder.to_str().unwrap()), ("output", "etc")],
            ),
            Job::new(
                "mysql",
                JobKind::Database,
                [("driver", "mysql"), ("output", "mysql"), ("group", "db")],
            ),
            Job::new("archive", JobKind::Sync, [("protocol", "archive")]),
            Job::new("dpkg", JobKind::PackageList, [("output", temp_dir.path().join("dpkg.txt").to_str().unwrap())]),
            Job::new("footer", JobKind::Report, [("report", "text"), ("value", "Done {now}")]),
        ];

        let (history, lines) = run_collecting(&pipeline, &jobs);
        let names: Vec<_> = history.iter().map(|r| r.job().name().to_string()).collect();
        assert_eq!(names, vec!["etc", "mysql", "dpkg", "footer"]);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(&format!("Backup folder \"{}\" (0s) [", folder.display())));
        assert!(lines[1].starts_with("Backup  database (0s) ["));
        assert_eq!(lines[2], "Done 2024-03-01 10:00");

        let archive = pipeline.ctx().defaults().archive();
        assert!(archive.join("etc_2024-03-01.tar.xz").is_file());
        assert!(archive.join("db/mysql_2024-03-01.sql.xz").is_file());
    }

    #[test]
    fn test_failure_is_reported_and_run_continues() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_context(temp_dir.path(), &RecordingRunner::succeeding()));
        let jobs = vec![
            Job::new(
                "dpkg",
                JobKind::PackageList,
                [("output", temp_dir.path().join("no/such/dir/dpkg.txt").to_str().unwrap())],
            ),
            Job::new("footer", JobKind::Report, [("report", "text"), ("value", "still here")]),
        ];

        let (history, lines) = run_collecting(&pipeline, &jobs);
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0].outcome(), Outcome::Failed(_)));
        assert!(lines[0].starts_with("Job \"dpkg\" failed: "));
        assert_eq!(lines[1], "still here");
    }
}
