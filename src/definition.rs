// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The executable payload attached to a leaf [`crate::graph::TestNode`].

use crate::graph::NodeId;
use std::{sync::Arc, time::Duration};

/// A test's concurrency class, per spec.md §3/§4.4.3.
///
/// Ordered `Exclusive < Privileged < Any` so that clamping to a
/// `MaximumConcurrency` is a plain `min()` against the declared class, and
/// partitioning can bucket by `match` without a separate ranking table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Concurrency {
    /// Must not run concurrently with any other test.
    Exclusive,
    /// At most one Privileged test runs at a time; may overlap with Any.
    Privileged,
    /// May run concurrently with any other Any test.
    Any,
}

impl Default for Concurrency {
    fn default() -> Self {
        Concurrency::Any
    }
}

/// A zero-argument callable already closed over any bound argument tuple.
///
/// The body is expected to assert via [`crate::assert_that`], which panics
/// with a [`crate::results::TestFailure`] payload on failure; any other
/// panic is caught and classified by the watchdog (see
/// `crate::scheduler::watchdog`).
pub type TestBody = Arc<dyn Fn() + Send + Sync + 'static>;

/// The executable payload attached to a leaf node.
///
/// Owned by exactly one [`crate::graph::TestNode`] for the process
/// lifetime (spec.md §3). `node` is a plain index, not a pointer, so it is
/// inherently a "weak" back-reference: dropping the owning graph drops this
/// along with it, there's nothing to dangle.
pub struct TestDefinition {
    pub(crate) body: TestBody,
    /// Back-reference to the owning node, used to recover File/LineNumber
    /// when reporting a failure.
    pub(crate) node: NodeId,
    pub concurrency: Concurrency,
    /// Zero means "use `ExecutionOptions::default_timeout`".
    pub timeout: Duration,
}

impl TestDefinition {
    pub(crate) fn new(body: TestBody, node: NodeId) -> Self {
        Self {
            body,
            node,
            concurrency: Concurrency::default(),
            timeout: Duration::ZERO,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}
