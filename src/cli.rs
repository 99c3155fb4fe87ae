// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch for the demo host binary (spec.md §6 external
//! interfaces: "a minimal CLI front-end exists to run tests and print
//! their resolved status").

use crate::options::ExecutionOptions;
use crate::registry::{Registry, TestQuery};
use crate::reporter::{Color, Reporter};
use crate::results::Status;
use crate::summary::summarize;
use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Opts {
    #[structopt(long, default_value)]
    /// Coloring: always, auto, never
    color: Color,

    #[structopt(long, default_value, possible_values = &OutputFormat::variants(), case_insensitive = true)]
    /// Output format: plain, json
    format: OutputFormat,

    #[structopt(subcommand)]
    command: Command,
}

/// Mirrors `testrunner`'s own `OutputFormat`/`SerializableFormat` split,
/// minus the TOML variants this crate has no use for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OutputFormat {
    /// One colored line per leaf (the [`Reporter`]).
    Plain,
    /// A [`crate::summary::RunSummary`] rendered as pretty-printed JSON.
    Json,
}

impl OutputFormat {
    pub fn variants() -> [&'static str; 2] {
        ["plain", "json"]
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Plain
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(anyhow!("unrecognized output format: {other}")),
        }
    }
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Run every registered test
    RunAll {
        #[structopt(flatten)]
        run_opts: RunOpts,
    },
    /// Run every test under a `::`-separated category path
    Run {
        path: String,
        #[structopt(flatten)]
        run_opts: RunOpts,
    },
    /// List tests matching a name substring and/or status
    Query {
        #[structopt(long)]
        name_contains: Option<String>,
        #[structopt(long)]
        status: Vec<StatusArg>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct RunOpts {
    /// Worker pool size for the Any cohort; 0 runs everything on this thread
    #[structopt(long)]
    max_workers: Option<usize>,
    /// Per-test timeout in milliseconds, used when a test declares none
    #[structopt(long)]
    default_timeout_ms: Option<u64>,
}

impl RunOpts {
    fn build(self) -> ExecutionOptions {
        let mut options = ExecutionOptions::new();
        if let Some(max_workers) = self.max_workers {
            options = options.with_max_workers(max_workers);
        }
        if let Some(ms) = self.default_timeout_ms {
            options = options.with_default_timeout(Duration::from_millis(ms));
        }
        options
    }
}

/// Thin CLI-facing wrapper over [`Status`] so `--status` can be repeated on
/// the command line.
#[derive(Debug, Copy, Clone)]
pub struct StatusArg(pub Status);

impl FromStr for StatusArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let status = match s.to_ascii_lowercase().as_str() {
            "passed" => Status::Passed,
            "not-run" | "notrun" => Status::NotRun,
            "waiting-to-run" | "waitingtorun" => Status::WaitingToRun,
            "running" => Status::Running,
            "failed" => Status::Failed,
            other => return Err(anyhow!("unrecognized status: {other}")),
        };
        Ok(StatusArg(status))
    }
}

impl Opts {
    pub fn exec(self) -> Result<()> {
        let registry = Registry::global();
        let reporter = Reporter::new(self.color);
        let format = self.format;

        let leaves = match self.command {
            Command::RunAll { run_opts } => {
                registry.run_all(run_opts.build())?;
                registry.join();
                registry.graph().leaf_ids(
                    registry
                        .graph()
                        .roots()
                        .next()
                        .ok_or_else(|| anyhow!("registry graph has no root"))?,
                )
            }
            Command::Run { path, run_opts } => {
                let node = registry
                    .find(&path)
                    .ok_or_else(|| anyhow!("no such test or category: {path}"))?;
                registry.run_path(&path, run_opts.build())?;
                registry.join();
                registry.graph().leaf_ids(node)
            }
            Command::Query { name_contains, status } => {
                let mut query = TestQuery::new();
                if let Some(needle) = name_contains {
                    query = query.with_name_contains(needle);
                }
                for StatusArg(status) in status {
                    query = query.with_status(status);
                }
                registry.query(&query).into_iter().map(|(id, _)| id).collect()
            }
        };

        match format {
            OutputFormat::Plain => reporter.report(registry, &leaves)?,
            OutputFormat::Json => {
                let summary = summarize(registry, &leaves);
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Ok(())
    }
}
