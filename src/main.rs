use clap::Parser;
use dist_backup::backup::config::{BackupConfig, DEFAULT_CONFIG_PATH};
use dist_backup::backup::context::RunContext;
use dist_backup::backup::pipeline::{Pipeline, RunStatus};
use dist_backup::backup::result_error::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, info};

/// Runs the configured backup jobs once and prints a report
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log what each job would do without touching anything
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match BackupConfig::load(&args.config) {
        Ok(config) => config,
        Err(e @ Error::ConfigNotFound(_)) => {
            eprintln!("{e}");
            exit(2);
        }
        Err(e) => {
            error!("{e}");
            exit(2);
        }
    };

    let ctx = RunContext::builder()
        .defaults(config.defaults)
        .dry_run(args.dry_run)
        .build();
    let pipeline = Pipeline::new(ctx);

    let stdout = std::io::stdout();
    let history = pipeline.run(&config.jobs, &mut |line: &str| {
        let mut out = stdout.lock();
        // A closed stdout must not stop the remaining jobs.
        let _ = writeln!(out, "{line}").and_then(|_| out.flush());
    });

    match RunStatus::from_history(&history) {
        RunStatus::NothingToDo => {
            eprintln!("Nothing to do");
            exit(1);
        }
        RunStatus::Completed(n) => info!("Completed {n} jobs"),
    }
}
