//! # dist-backup
//!
//! Runs an ordered list of backup jobs in one pass and routes what they
//! produce to later distribution jobs.
//!
//! ## Features
//!
//! - **Directory archives**: `tar` + XZ, with glob excludes and optional info files
//! - **Database dumps**: MySQL and PostgreSQL, compressed on the fly
//! - **SVN snapshots**: optionally from an `svnadmin hotcopy`
//! - **Routing**: dated archive copies per group, `cp` and `rsync` distribution
//! - **Reports**: templated text and disk usage, streamed as jobs finish
//!
//! ## Quick Start
//!
//! ```no_run
//! use dist_backup::backup::config::BackupConfig;
//! use dist_backup::backup::context::RunContext;
//! use dist_backup::backup::pipeline::{Pipeline, RunStatus};
//!
//! let config = BackupConfig::load("/etc/dist-backup.yml")?;
//! let pipeline = Pipeline::new(RunContext::builder().defaults(config.defaults).build());
//! let history = pipeline.run(&config.jobs, &mut |line: &str| println!("{line}"));
//! assert_ne!(RunStatus::from_history(&history), RunStatus::NothingToDo);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
