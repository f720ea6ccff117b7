use crate::backup::artifact::Outcome;
use crate::backup::command::CommandLine;
use crate::backup::context::RunContext;
use crate::backup::job::Job;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;

use std::path::PathBuf;

/// Saves `dpkg --get-selections` to the `output` path. Nothing is routed.
pub fn run(job: &Job, ctx: &RunContext) -> Result<Outcome> {
    let output = PathBuf::from(job.required_option("output")?);
    let command = CommandLine::new("dpkg").arg("--get-selections");

    if ctx.dry_run() {
        tracing::info!("Dry run: would run {command} -> {:?}", output);
        return Ok(Outcome::Ran);
    }

    let selections = ctx.run_tool(&command)?;
    std::fs::write(&output, &selections.stdout)
        .map_err(Error::from)
        .add_msg(format!("Write package list {:?} failed", output))?;
    Ok(Outcome::Ran)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::job::JobKind;
    use crate::backup::testing::{test_context, RecordingRunner};
    use tempfile::TempDir;

    #[test]
    fn test_writes_selections() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::succeeding_with_stdout("bash\t\t\tinstall\n");
        let ctx = test_context(temp_dir.path(), &runner);
        let output = temp_dir.path().join("dpkg.txt");
        let job = Job::new("dpkg", JobKind::PackageList, [("output", output.to_str().unwrap())]);

        assert_eq!(run(&job, &ctx).unwrap(), Outcome::Ran);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "bash\t\t\tinstall\n");
        assert_eq!(runner.calls(), vec!["dpkg --get-selections".to_string()]);
    }

    #[test]
    fn test_unwritable_output_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(temp_dir.path(), &RecordingRunner::succeeding());
        let output = temp_dir.path().join("missing/dir/dpkg.txt");
        let job = Job::new("dpkg", JobKind::PackageList, [("output", output.to_str().unwrap())]);

        assert!(run(&job, &ctx).is_err());
    }
}
