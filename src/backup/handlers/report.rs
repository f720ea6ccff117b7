//! Report jobs: free text run through the template engine, and disk usage.

use crate::backup::artifact::Outcome;
use crate::backup::command::CommandLine;
use crate::backup::context::RunContext;
use crate::backup::job::{split_list, Job};
use crate::backup::result_error::result::Result;
use crate::backup::template::render_text;

use itertools::Itertools;

/// One entry of a job's `report` list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Renderer {
    /// `text` reads option `value`, `text:<key>` reads option `<key>`.
    Text(String),
    Disk,
    Unknown(String),
}

impl Renderer {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "text" => Renderer::Text("value".to_string()),
            "disk" => Renderer::Disk,
            other => match other.strip_prefix("text:") {
                Some(key) => Renderer::Text(key.to_string()),
                None => Renderer::Unknown(other.to_string()),
            },
        }
    }
}

pub fn disk_command(job: &Job) -> CommandLine {
    let disks = match job.option("disks").map(split_list) {
        Some(disks) if !disks.is_empty() => disks,
        _ => vec!["/".to_string()],
    };
    CommandLine::new("df").arg("-hP").args(disks)
}

fn render_part(renderer: &Renderer, job: &Job, ctx: &RunContext) -> Result<Option<String>> {
    match renderer {
        Renderer::Text(key) => Ok(job
            .option(key)
            .map(|value| render_text(value, ctx.defaults(), ctx.clock()))),
        Renderer::Disk => {
            let command = disk_command(job);
            if ctx.dry_run() {
                tracing::info!("Dry run: would run {command}");
                return Ok(None);
            }
            let output = ctx.run_tool(&command)?;
            Ok(Some(
                String::from_utf8_lossy(&output.stdout)
                    .trim_end()
                    .to_string(),
            ))
        }
        Renderer::Unknown(name) => {
            tracing::debug!("Ignoring unknown renderer {name:?} in {:?}", job.name());
            Ok(None)
        }
    }
}

pub fn run(job: &Job, ctx: &RunContext) -> Result<Outcome> {
    let renderers = job.option_list("report");
    let mut parts = Vec::with_capacity(renderers.len());
    for raw in &renderers {
        if let Some(part) = render_part(&Renderer::parse(raw), job, ctx)? {
            parts.push(part);
        }
    }

    let text = parts.into_iter().filter(|p| !p.is_empty()).join("\r\n");
    if text.is_empty() {
        return Ok(Outcome::Skipped);
    }
    Ok(Outcome::Reported(text))
}
