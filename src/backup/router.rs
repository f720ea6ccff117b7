//! Sync jobs: forward the files earlier jobs produced, bucketed by group.
//!
//! Groups keep the order in which they were first seen in the run history
//! and paths keep producing-job order, so routing is deterministic.

use crate::backup::artifact::{JobResult, Outcome};
use crate::backup::command::CommandLine;
use crate::backup::context::RunContext;
use crate::backup::job::Job;
use crate::backup::result_error::result::Result;

use derive_more::Display;
use getset::Getters;
use itertools::Itertools;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Extensions that stay in one piece when a date is spliced into a file name.
pub static COMPOUND_EXTENSIONS: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".sql.xz"];

pub static ARCHIVE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RoutingGroup {
    name: Arc<str>,
    paths: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum SyncProtocol {
    #[display("archive")]
    Archive,
    #[display("copy")]
    Copy,
    #[display("rsync")]
    Rsync,
    #[display("ftp")]
    Ftp,
}

impl FromStr for SyncProtocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "archive" => Ok(SyncProtocol::Archive),
            "copy" => Ok(SyncProtocol::Copy),
            "rsync" => Ok(SyncProtocol::Rsync),
            "ftp" => Ok(SyncProtocol::Ftp),
            other => Err(format!("unsupported sync protocol {other:?}")),
        }
    }
}

/// Buckets every produced path of `history` by artifact group.
pub fn collect_groups(history: &[JobResult]) -> Vec<RoutingGroup> {
    let mut groups: Vec<RoutingGroup> = Vec::new();
    let artifacts = history
        .iter()
        .filter_map(|r| r.outcome().artifact())
        .filter(|a| !a.is_empty());
    for artifact in artifacts {
        let index = match groups.iter().position(|g| g.name == *artifact.group()) {
            Some(index) => index,
            None => {
                groups.push(RoutingGroup {
                    name: artifact.group().clone(),
                    paths: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[index].paths.extend(artifact.paths().iter().cloned());
    }
    groups
}

/// All groups merged, in routing order.
pub fn flatten_groups(groups: &[RoutingGroup]) -> Vec<PathBuf> {
    groups.iter().flat_map(|g| g.paths.iter().cloned()).collect()
}

/// `("etc", ".tar.xz")` for `etc.tar.xz`, `("notes", ".txt")` for `notes.txt`.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    if let Some(ext) = COMPOUND_EXTENSIONS
        .iter()
        .find(|ext| file_name.len() > ext.len() && file_name.ends_with(*ext))
    {
        return file_name.split_at(file_name.len() - ext.len());
    }
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.split_at(dot),
        _ => (file_name, ""),
    }
}

/// `<archive>/<group>/<stem>_<date><ext>`, with `/` as the archive root.
pub fn archive_destination(archive: &Path, group: &str, source: &Path, date: &str) -> PathBuf {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = split_extension(&file_name);
    let group = group.trim_matches('/');
    let dir = if group.is_empty() {
        archive.to_path_buf()
    } else {
        archive.join(group)
    };
    dir.join(format!("{stem}_{date}{ext}"))
}

fn route_archive(ctx: &RunContext, groups: &[RoutingGroup]) -> Result<Outcome> {
    let date = ctx.clock().now().format(ARCHIVE_DATE_FORMAT).to_string();
    let archive = ctx.defaults().archive();

    for group in groups {
        for source in &group.paths {
            let dest = archive_destination(archive, &group.name, source, &date);
            if ctx.dry_run() {
                tracing::info!("Dry run: would copy {:?} -> {:?}", source, dest);
                continue;
            }
            if !source.is_file() {
                tracing::debug!("Not archiving {:?}: no such file", source);
                continue;
            }
            let copied = dest
                .parent()
                .map(std::fs::create_dir_all)
                .transpose()
                .and_then(|_| std::fs::copy(source, &dest));
            match copied {
                Ok(bytes) => tracing::info!("Archived {:?} -> {:?} ({bytes} bytes)", source, dest),
                Err(e) => tracing::warn!("Could not archive {:?} -> {:?}: {e}", source, dest),
            }
        }
    }
    Ok(Outcome::Skipped)
}

fn existing_files(ctx: &RunContext, files: Vec<PathBuf>) -> Vec<PathBuf> {
    if ctx.dry_run() {
        return files;
    }
    files.into_iter().filter(|f| f.is_file()).collect()
}

fn route_copy(job: &Job, ctx: &RunContext, files: Vec<PathBuf>) -> Result<Outcome> {
    let Some(dest) = job.option("dest").map(PathBuf::from) else {
        tracing::debug!("Skipping {:?}: no dest", job.name());
        return Ok(Outcome::Skipped);
    };
    if !dest.is_dir() {
        tracing::info!("Skipping {:?}: {:?} is not a directory", job.name(), dest);
        return Ok(Outcome::Skipped);
    }

    let files = existing_files(ctx, files);
    if files.is_empty() {
        return Ok(Outcome::Ran);
    }
    let command = CommandLine::new("cp").path_args(&files).arg(dest.as_os_str());
    if ctx.dry_run() {
        tracing::info!("Dry run: would run {command}");
    } else {
        ctx.run_tool(&command)?;
    }
    Ok(Outcome::Ran)
}

fn route_rsync(job: &Job, ctx: &RunContext, files: Vec<PathBuf>) -> Result<Outcome> {
    let Some(host) = job.option("host") else {
        tracing::debug!("Skipping {:?}: no host", job.name());
        return Ok(Outcome::Skipped);
    };

    let files = existing_files(ctx, files);
    if files.is_empty() {
        return Ok(Outcome::Ran);
    }
    let command = CommandLine::new("rsync")
        .arg("-qt")
        .path_args(&files)
        .arg(host);
    if ctx.dry_run() {
        tracing::info!("Dry run: would run {command}");
    } else {
        ctx.run_tool(&command)?;
    }
    Ok(Outcome::Ran)
}

/// Forwards everything `history` produced so far through the job's protocol.
pub fn route(job: &Job, ctx: &RunContext, history: &[JobResult]) -> Result<Outcome> {
    let protocol = SyncProtocol::from_str(job.required_option("protocol")?)
        .map_err(std::io::Error::other)?;
    let groups = collect_groups(history);
    tracing::debug!(
        "Routing {} files in groups [{}] via {protocol}",
        groups.iter().map(|g| g.paths.len()).sum::<usize>(),
        groups.iter().map(|g| g.name.as_ref()).join(", ")
    );

    match protocol {
        SyncProtocol::Archive => route_archive(ctx, &groups),
        SyncProtocol::Copy => route_copy(job, ctx, flatten_groups(&groups)),
        SyncProtocol::Rsync => route_rsync(job, ctx, flatten_groups(&groups)),
        SyncProtocol::Ftp => {
            tracing::warn!("FTP sync is not implemented, skipping {:?}", job.name());
            Ok(Outcome::Skipped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::artifact::Artifact;
    use crate::backup::job::JobKind;
    use crate::backup::testing::{at, test_context, test_defaults, RecordingRunner, SequenceClock};
    use tempfile::TempDir;

    fn producer(name: &str, group: Option<&str>) -> Job {
        let mut options = vec![("output", name)];
        if let Some(group) = group {
            options.push(("group", group));
        }
        Job::new(name, JobKind::Database, options)
    }

    fn produced<'a>(job: &'a Job, paths: &[PathBuf]) -> JobResult<'a> {
        let t = at(2024, 3, 1, 10, 0, 0);
        JobResult::new(job, t, t, Artifact::from_job(job, paths.to_vec()).into())
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("etc.tar.xz"), ("etc", ".tar.xz"));
        assert_eq!(split_extension("site.tar.gz"), ("site", ".tar.gz"));
        assert_eq!(split_extension("mysql.sql.xz"), ("mysql", ".sql.xz"));
        assert_eq!(split_extension("notes.txt"), ("notes", ".txt"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
    }

    #[test]
    fn test_archive_destination_root_group() {
        let dest = archive_destination(
            Path::new("/var/archive"),
            "/",
            Path::new("/out/etc.tar.xz"),
            "2024-03-01",
        );
        assert_eq!(dest, PathBuf::from("/var/archive/etc_2024-03-01.tar.xz"));

        let dest = archive_destination(
            Path::new("/var/archive"),
            "/db/",
            Path::new("/out/mysql.sql.xz"),
            "2024-03-01",
        );
        assert_eq!(dest, PathBuf::from("/var/archive/db/mysql_2024-03-01.sql.xz"));
    }

    #[test]
    fn test_collect_groups_keeps_order() {
        let a = producer("a", Some("db"));
        let b = producer("b", None);
        let c = producer("c", Some("db"));
        let report = Job::new("r", JobKind::Report, [("report", "text")]);
        let t = at(2024, 3, 1, 10, 0, 0);
        let history = vec![
            produced(&a, &[PathBuf::from("/o/a1"), PathBuf::from("/o/a2")]),
            JobResult::new(&report, t, t, Outcome::Reported("hi".into())),
            produced(&b, &[PathBuf::from("/o/b")]),
            produced(&c, &[PathBuf::from("/o/c")]),
        ];

        let groups = collect_groups(&history);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name().as_ref(), "db");
        assert_eq!(
            groups[0].paths(),
            &vec![PathBuf::from("/o/a1"), PathBuf::from("/o/a2"), PathBuf::from("/o/c")]
        );
        assert_eq!(groups[1].name().as_ref(), "/");
        assert_eq!(
            flatten_groups(&groups),
            vec![
                PathBuf::from("/o/a1"),
                PathBuf::from("/o/a2"),
                PathBuf::from("/o/c"),
                PathBuf::from("/o/b"),
            ]
        );
    }

    #[test]
    fn test_collect_groups_ignores_empty_artifacts() {
        let a = producer("a", Some("web"));
        let b = producer("b", Some("db"));
        let history = vec![produced(&a, &[]), produced(&b, &[PathBuf::from("/o/b")])];

        let groups = collect_groups(&history);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name().as_ref(), "db");
    }

    #[test]
    fn test_archive_uses_one_date_across_midnight() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        let mysql = producer("mysql", Some("db"));
        let pgsql = producer("pgsql", Some("db"));
        let history = vec![
            produced(&mysql, &[touch(&out, "mysql.sql.xz")]),
            produced(&pgsql, &[touch(&out, "pgsql.sql.xz"), out.join("vanished.sql.xz")]),
        ];

        let clock = SequenceClock::new([at(2024, 3, 1, 23, 59, 59), at(2024, 3, 2, 0, 0, 1)]);
        let ctx = RunContext::builder()
            .defaults(test_defaults(temp_dir.path()))
            .runner(Box::new(RecordingRunner::succeeding()))
            .clock(Box::new(clock.clone()))
            .build();
        let job = Job::new("archive", JobKind::Sync, [("protocol", "archive")]);

        assert_eq!(route(&job, &ctx, &history).unwrap(), Outcome::Skipped);
        assert_eq!(clock.reads(), 1);

        let db = ctx.defaults().archive().join("db");
        let mut archived: Vec<_> = std::fs::read_dir(&db)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        archived.sort();
        assert_eq!(
            archived,
            vec!["mysql_2024-03-01.sql.xz", "pgsql_2024-03-01.sql.xz"]
        );
    }

    #[test]
    fn test_copy_requires_existing_dest() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::succeeding();
        let ctx = test_context(temp_dir.path(), &runner);
        let job = Job::new(
            "usb",
            JobKind::Sync,
            [("protocol", "copy"), ("dest", "/definitely/not/mounted")],
        );

        assert_eq!(route(&job, &ctx, &[]).unwrap(), Outcome::Skipped);
        let no_dest = Job::new("usb", JobKind::Sync, [("protocol", "copy")]);
        assert_eq!(route(&no_dest, &ctx, &[]).unwrap(), Outcome::Skipped);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_copy_runs_cp_with_flattened_files() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::succeeding();
        let ctx = test_context(temp_dir.path(), &runner);
        let out = ctx.defaults().output().clone();
        let usb = temp_dir.path().join("usb");
        std::fs::create_dir_all(&usb).unwrap();
        let etc = producer("etc", Some("configs"));
        let db = producer("db", None);
        let history = vec![
            produced(&etc, &[touch(&out, "etc.tar.xz")]),
            produced(&db, &[touch(&out, "db.sql.xz")]),
        ];
        let job = Job::new(
            "usb",
            JobKind::Sync,
            [("protocol", "copy"), ("dest", usb.to_str().unwrap())],
        );

        assert_eq!(route(&job, &ctx, &history).unwrap(), Outcome::Ran);
        assert_eq!(
            runner.calls(),
            vec![format!(
                "cp {} {} {}",
                out.join("etc.tar.xz").display(),
                out.join("db.sql.xz").display(),
                usb.display()
            )]
        );
    }

    #[test]
    fn test_rsync_with_nothing_to_send_runs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::succeeding();
        let ctx = test_context(temp_dir.path(), &runner);
        let job = Job::new(
            "offsite",
            JobKind::Sync,
            [("protocol", "rsync"), ("host", "backup@remote:/srv")],
        );

        assert_eq!(route(&job, &ctx, &[]).unwrap(), Outcome::Ran);
        assert!(runner.calls().is_empty());

        let no_host = Job::new("offsite", JobKind::Sync, [("protocol", "rsync")]);
        assert_eq!(route(&no_host, &ctx, &[]).unwrap(), Outcome::Skipped);
    }

    #[test]
    fn test_rsync_sends_files_to_host() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::succeeding();
        let ctx = test_context(temp_dir.path(), &runner);
        let out = ctx.defaults().output().clone();
        let etc = producer("etc", None);
        let history = vec![produced(&etc, &[touch(&out, "etc.tar.xz")])];
        let job = Job::new(
            "offsite",
            JobKind::Sync,
            [("protocol", "rsync"), ("host", "backup@remote:/srv")],
        );

        assert_eq!(route(&job, &ctx, &history).unwrap(), Outcome::Ran);
        assert_eq!(
            runner.calls(),
            vec![format!(
                "rsync -qt {} backup@remote:/srv",
                out.join("etc.tar.xz").display()
            )]
        );
    }

    #[test]
    fn test_ftp_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(temp_dir.path(), &RecordingRunner::succeeding());
        let job = Job::new("ftp", JobKind::Sync, [("protocol", "ftp")]);

        assert_eq!(route(&job, &ctx, &[]).unwrap(), Outcome::Skipped);
    }
}
