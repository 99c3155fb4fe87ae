// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cohort partitioning (spec.md §4.4.3-§4.4.4).
//!
//! Turns a flat list of leaf [`NodeId`]s into the three ordered cohorts the
//! scheduler consumes, applying the clamp/override/cap rules to each test's
//! declared concurrency class and timeout along the way.

use crate::definition::Concurrency;
use crate::graph::{NodeId, TestGraph};
use crate::options::ExecutionOptions;
use std::time::Duration;

/// `min(declared, MaximumConcurrency)` then `EnforcedConcurrency` outright,
/// matching the original `TestCoordinator::DetermineConcurrency` (spec.md
/// §4.4.3 step 1).
pub fn effective_concurrency(declared: Concurrency, options: &ExecutionOptions) -> Concurrency {
    let clamped = match options.maximum_concurrency {
        Some(max) => declared.min(max),
        None => declared,
    };
    options.enforced_concurrency.unwrap_or(clamped)
}

/// `declared` (or `default_timeout` if zero) then clamped into
/// `1ms..=MaximumTimeout` (spec.md §4.4.5: "clamp(definition.timeout,
/// 1ms..options.MaximumTimeout) with zero replaced by
/// options.DefaultTimeout").
pub fn effective_timeout(declared: Duration, options: &ExecutionOptions) -> Duration {
    let base = if declared.is_zero() {
        options.default_timeout
    } else {
        declared
    };
    let capped = match options.maximum_timeout {
        Some(max) => base.min(max),
        None => base,
    };
    capped.max(Duration::from_millis(1))
}

/// The three concurrency-class buckets, in the fixed run order the
/// coordinator thread uses: `exclusive` always runs serially first,
/// `privileged` runs serially on the coordinator while `any` runs on the
/// worker pool, and `any` runs on however many workers the pool size allows
/// (spec.md §4.4.4).
#[derive(Debug, Default)]
pub struct Cohorts {
    pub exclusive: Vec<NodeId>,
    pub privileged: Vec<NodeId>,
    pub any: Vec<NodeId>,
}

impl Cohorts {
    pub fn len(&self) -> usize {
        self.exclusive.len() + self.privileged.len() + self.any.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Buckets `leaves` into [`Cohorts`] by each leaf's effective concurrency
/// class, in the order they were handed in (registration order, spec.md
/// §4.1).
pub fn partition(graph: &TestGraph, options: &ExecutionOptions, leaves: &[NodeId]) -> Cohorts {
    let mut cohorts = Cohorts::default();
    for &id in leaves {
        let declared = graph
            .definition(id)
            .map(|def| def.concurrency)
            .unwrap_or_default();
        match effective_concurrency(declared, options) {
            Concurrency::Exclusive => cohorts.exclusive.push(id),
            Concurrency::Privileged => cohorts.privileged.push(id),
            Concurrency::Any => cohorts.any.push(id),
        }
    }
    cohorts
}

/// Total number of threads (coordinator included) that will end up
/// draining the Any cohort, given `any_count`, `privileged_count`,
/// `max_workers` and `min_tests_per_thread` -- spec.md §4.4.4 step 2:
/// `preferred = (|Any| + |Privileged|) / max(MinTestsPerThread, 1)`,
/// `extra = min(preferred, MaxWorkers - 1)`. The coordinator itself joins
/// the pool-worker loop after Privileged drains, so the caller spawns
/// `worker_count(..) - 1` dedicated pool threads.
pub fn worker_count(any_count: usize, privileged_count: usize, options: &ExecutionOptions) -> usize {
    if any_count == 0 || options.max_workers == 0 {
        return 0;
    }
    let min_tests_per_thread = options.min_tests_per_thread.max(1);
    let preferred = (any_count + privileged_count) / min_tests_per_thread;
    let extra = preferred.min(options.max_workers.saturating_sub(1));
    extra + 1
}
