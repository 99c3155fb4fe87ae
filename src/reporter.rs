// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints resolved test statuses to a colored terminal stream.

use crate::graph::{NodeId, TestGraph};
use crate::registry::Registry;
use crate::results::Status;
use std::io::Write;
use structopt::clap::arg_enum;
use termcolor::{BufferWriter, Color as TermColor, ColorChoice, ColorSpec, WriteColor};

arg_enum! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub enum Color {
        Always,
        Auto,
        Never,
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::Auto
    }
}

impl Color {
    fn color_choice(self, stream: atty::Stream) -> ColorChoice {
        match self {
            Color::Always => ColorChoice::Always,
            Color::Auto => {
                if atty::is(stream) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                }
            }
            Color::Never => ColorChoice::Never,
        }
    }
}

fn status_color(status: Status) -> Option<TermColor> {
    match status {
        Status::Passed => Some(TermColor::Green),
        Status::Failed => Some(TermColor::Red),
        Status::Running | Status::WaitingToRun => Some(TermColor::Yellow),
        Status::NotRun => None,
    }
}

fn status_label(status: Status) -> &'static str {
    match status {
        Status::Passed => "PASS",
        Status::Failed => "FAIL",
        Status::Running => "RUN ",
        Status::WaitingToRun => "WAIT",
        Status::NotRun => "SKIP",
    }
}

/// Writes one colored line per leaf to stdout, in registration order.
pub struct Reporter {
    stdout: BufferWriter,
}

impl Reporter {
    pub fn new(color: Color) -> Self {
        Self {
            stdout: BufferWriter::stdout(color.color_choice(atty::Stream::Stdout)),
        }
    }

    pub fn report(&self, registry: &Registry, leaves: &[NodeId]) -> std::io::Result<()> {
        let mut buffer = self.stdout.buffer();
        for &id in leaves {
            let status = registry.determine_status(id);
            let node = registry.graph().node(id);
            self.write_line(&mut buffer, registry.graph(), node.id(), status)?;
        }
        self.stdout.print(&buffer)
    }

    fn write_line(
        &self,
        buffer: &mut termcolor::Buffer,
        _graph: &TestGraph,
        id: &str,
        status: Status,
    ) -> std::io::Result<()> {
        let mut spec = ColorSpec::new();
        if let Some(color) = status_color(status) {
            spec.set_fg(Some(color)).set_bold(true);
        }
        buffer.set_color(&spec)?;
        write!(buffer, "[{}]", status_label(status))?;
        buffer.reset()?;
        writeln!(buffer, " {id}")
    }
}
