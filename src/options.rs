// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler configuration (spec.md §3 `ExecutionOptions`).

use crate::definition::Concurrency;
use std::time::Duration;

/// Tunables the scheduler consumes when partitioning and running a set of
/// tests. Mirrors the original `ExecutionOptions` struct field-for-field.
#[derive(Clone, Debug)]
pub struct ExecutionOptions {
    /// 0 means "run everything on the caller's thread" (spec.md §4.4.4).
    pub max_workers: usize,
    /// Used to size the worker pool from the Any/Privileged workload.
    pub min_tests_per_thread: usize,
    /// Used when a test's own timeout is zero.
    pub default_timeout: Duration,
    /// Clamps each test's declared class downward (toward `Exclusive`)
    /// before scheduling.
    pub maximum_concurrency: Option<Concurrency>,
    /// Overrides every test's effective class outright, after clamping.
    pub enforced_concurrency: Option<Concurrency>,
    /// Clamps each test's effective timeout downward.
    pub maximum_timeout: Option<Duration>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_workers: 4,
            min_tests_per_thread: 100,
            default_timeout: Duration::from_millis(5000),
            maximum_concurrency: None,
            enforced_concurrency: None,
            maximum_timeout: None,
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces every test onto the caller's thread; no worker pool or
    /// coordinator thread is spawned (spec.md §4.4.4).
    pub fn force_onto_main_thread(mut self) -> Self {
        self.max_workers = 0;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_min_tests_per_thread(mut self, min_tests_per_thread: usize) -> Self {
        self.min_tests_per_thread = min_tests_per_thread;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_maximum_concurrency(mut self, max: Concurrency) -> Self {
        self.maximum_concurrency = Some(max);
        self
    }

    pub fn with_enforced_concurrency(mut self, enforced: Concurrency) -> Self {
        self.enforced_concurrency = Some(enforced);
        self
    }

    pub fn with_maximum_timeout(mut self, max: Duration) -> Self {
        self.maximum_timeout = Some(max);
        self
    }
}
