//! Fakes shared by the unit tests.

use crate::backup::clock::Clock;
use crate::backup::command::{CommandLine, CommandOutput, CommandRunner};
use crate::backup::config::Defaults;
use crate::backup::context::RunContext;
use crate::backup::result_error::result::Result;

use chrono::{NaiveDate, NaiveDateTime};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

/// Records every command line and answers with a canned output.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    calls: Rc<RefCell<Vec<String>>>,
    output: CommandOutput,
}

impl RecordingRunner {
    pub fn succeeding_with_stdout<B: Into<Vec<u8>>>(stdout: B) -> Self {
        Self {
            calls: Default::default(),
            output: CommandOutput {
                status: Some(0),
                stdout: stdout.into(),
                stderr: Vec::new(),
            },
        }
    }

    pub fn succeeding() -> Self {
        Self::succeeding_with_stdout(Vec::new())
    }

    pub fn failing_with(status: i32) -> Self {
        Self {
            calls: Default::default(),
            output: CommandOutput {
                status: Some(status),
                stdout: Vec::new(),
                stderr: b"boom".to_vec(),
            },
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn execute(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(command.to_string());
        Ok(self.output.clone())
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, s))
        .expect("valid test date")
}

#[derive(Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Hands out the given instants in order, then repeats the last one.
#[derive(Clone)]
pub struct SequenceClock {
    instants: Rc<RefCell<VecDeque<NaiveDateTime>>>,
    reads: Rc<RefCell<usize>>,
}

impl SequenceClock {
    pub fn new<I: IntoIterator<Item = NaiveDateTime>>(instants: I) -> Self {
        Self {
            instants: Rc::new(RefCell::new(instants.into_iter().collect())),
            reads: Default::default(),
        }
    }

    pub fn reads(&self) -> usize {
        *self.reads.borrow()
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> NaiveDateTime {
        *self.reads.borrow_mut() += 1;
        let mut instants = self.instants.borrow_mut();
        if instants.len() > 1 {
            instants.pop_front().expect("non-empty")
        } else {
            *instants.front().expect("SequenceClock needs at least one instant")
        }
    }
}

/// `output` and `archive` folders created under `root`.
pub fn test_defaults(root: &Path) -> Defaults {
    let output = root.join("output");
    let archive = root.join("archive");
    std::fs::create_dir_all(&output).expect("create output");
    std::fs::create_dir_all(&archive).expect("create archive");
    Defaults::builder().output(output).archive(archive).build()
}

pub fn test_context(root: &Path, runner: &RecordingRunner) -> RunContext {
    RunContext::builder()
        .defaults(test_defaults(root))
        .runner(Box::new(runner.clone()))
        .clock(Box::new(FixedClock(at(2024, 3, 1, 10, 0, 0))))
        .build()
}
