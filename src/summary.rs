// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-demand JSON snapshot of the result store (spec.md §6 "Persisted
//! state": "Implementations may serialise the result map, keyed by node
//! Id"). Nothing here is read back by the scheduler -- this is purely an
//! export format for a host that wants to archive or diff a run, the same
//! role `nextest-metadata`'s `TestListSummary` plays for `cargo nextest
//! list --message-format=json`.

use crate::graph::{NodeId, TestGraph};
use crate::registry::Registry;
use crate::results::{Status, TestResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// One leaf's resolved outcome, serialised by its path-unique Id.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TestResultSummary {
    pub status: StatusSummary,
    /// Wall-clock duration of the run, if the test has finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,
}

/// Wire form of [`crate::results::Status`]; kept distinct from the enum
/// itself so adding a variant there doesn't silently change the JSON
/// encoding (`nextest-metadata` draws the same line between its internal
/// enums and their `*Summary` counterparts).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusSummary {
    Passed,
    NotRun,
    WaitingToRun,
    Running,
    Failed,
}

impl From<Status> for StatusSummary {
    fn from(status: Status) -> Self {
        match status {
            Status::Passed => StatusSummary::Passed,
            Status::NotRun => StatusSummary::NotRun,
            Status::WaitingToRun => StatusSummary::WaitingToRun,
            Status::Running => StatusSummary::Running,
            Status::Failed => StatusSummary::Failed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FailureSummary {
    pub message: String,
    pub file: String,
    pub line: u32,
}

impl From<&crate::results::TestFailure> for FailureSummary {
    fn from(failure: &crate::results::TestFailure) -> Self {
        Self {
            message: failure.message().to_string(),
            file: failure.file().to_string(),
            line: failure.line(),
        }
    }
}

/// The whole-run snapshot: every leaf under the queried subtree, keyed by
/// its full `::`-joined Id, in no particular order (callers that want
/// registration order should walk [`TestGraph::leaf_ids`] directly and
/// look results up by Id).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RunSummary {
    pub tests: BTreeMap<String, TestResultSummary>,
}

fn result_summary(result: Option<TestResult>, status: Status) -> TestResultSummary {
    let duration_millis = result
        .as_ref()
        .and_then(TestResult::duration)
        .map(Duration::as_millis);
    let failure = result.as_ref().and_then(TestResult::failure).map(FailureSummary::from);
    TestResultSummary {
        status: status.into(),
        duration_millis,
        failure,
    }
}

/// Builds a [`RunSummary`] for every leaf in `leaves`, resolving each
/// one's status against `registry`'s current scheduled set exactly as
/// [`Registry::determine_status`] would.
pub fn summarize(registry: &Registry, leaves: &[NodeId]) -> RunSummary {
    let graph: &TestGraph = registry.graph();
    let mut tests = BTreeMap::new();
    for &id in leaves {
        let status = registry.determine_status(id);
        let result = registry.store().fetch(graph.node(id).id());
        tests.insert(graph.node(id).id().to_string(), result_summary(result, status));
    }
    RunSummary { tests }
}
