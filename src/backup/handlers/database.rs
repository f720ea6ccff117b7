//! Database dumps: the dump tool's stdout, compressed into `<output>.sql.xz`.

use crate::backup::artifact::{Artifact, Outcome};
use crate::backup::command::CommandLine;
use crate::backup::compress::compress_into_file;
use crate::backup::context::RunContext;
use crate::backup::file_ext::SQL_FILE_EXT;
use crate::backup::job::Job;
use crate::backup::result_error::result::Result;

use derive_more::Display;

use std::str::FromStr;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum DatabaseDriver {
    #[display("mysql")]
    Mysql,
    #[display("pgsql")]
    Pgsql,
    #[display("mongodb")]
    Mongodb,
}

impl FromStr for DatabaseDriver {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(DatabaseDriver::Mysql),
            "pgsql" => Ok(DatabaseDriver::Pgsql),
            "mongodb" => Ok(DatabaseDriver::Mongodb),
            other => Err(format!("unsupported database driver {other:?}")),
        }
    }
}

/// `database` absent or `all` means every database on the server.
fn selected_database(job: &Job) -> Option<&str> {
    job.option("database").filter(|db| *db != "all")
}

pub fn mysql_command(job: &Job) -> CommandLine {
    let command = match selected_database(job) {
        None => CommandLine::new("mysqldump").arg("-A"),
        Some(db) => CommandLine::new("mysqldump").arg("--databases").arg(db),
    };
    let command = match job.option("user") {
        Some(user) => command.arg(format!("--user={user}")),
        None => command,
    };
    match job.option("password") {
        Some(password) => command.secret_arg("--password=", password),
        None => command,
    }
}

pub fn pgsql_command(job: &Job) -> CommandLine {
    match selected_database(job) {
        None => CommandLine::new("pg_dumpall"),
        Some(db) => CommandLine::new("pg_dump").arg(db),
    }
}

pub fn run(job: &Job, ctx: &RunContext) -> Result<Outcome> {
    let driver = DatabaseDriver::from_str(job.required_option("driver")?)
        .map_err(std::io::Error::other)?;
    let command = match driver {
        DatabaseDriver::Mysql => mysql_command(job),
        DatabaseDriver::Pgsql => pgsql_command(job),
        DatabaseDriver::Mongodb => {
            tracing::warn!("MongoDB dumps are not implemented, skipping {:?}", job.name());
            return Ok(Outcome::Skipped);
        }
    };
    let output_file = ctx
        .defaults()
        .output_file(job.required_option("output")?, SQL_FILE_EXT);

    if ctx.dry_run() {
        tracing::info!("Dry run: would run {command} -> {:?}", output_file);
        return Ok(Artifact::from_job(job, [output_file]).into());
    }

    tracing::info!("Dumping {driver} database -> {:?}", output_file);
    let output = ctx.run_tool(&command)?;
    let written = compress_into_file(output.stdout.as_slice(), ctx.defaults().compressor(), &output_file)?;
    tracing::debug!("Compressed {written} bytes of dump into {:?}", output_file);

    Ok(Artifact::from_job(job, [output_file]).into())
}
