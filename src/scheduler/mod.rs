// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component D: the scheduler (spec.md §4.4).

mod executor;
pub(crate) mod kill;
mod watchdog;

use crate::graph::{NodeId, TestGraph};
use crate::options::ExecutionOptions;
use crate::results::ResultStore;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Coordinates one run of a set of tests: spawns the coordinator thread,
/// tracks which nodes are currently scheduled (for [`crate::results::Status`]
/// resolution), and exposes cooperative cancellation (spec.md §4.4.1-§4.4.2).
///
/// A `Scheduler` runs at most one batch at a time; calling `run` while
/// already running returns [`crate::errors::SchedulerError::StillRunning`].
pub struct Scheduler {
    graph: Arc<TestGraph>,
    store: Arc<ResultStore>,
    scheduled: Arc<Mutex<HashSet<NodeId>>>,
    stop: Arc<AtomicBool>,
    coordinator: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(graph: Arc<TestGraph>, store: Arc<ResultStore>) -> Self {
        Self {
            graph,
            store,
            scheduled: Arc::new(Mutex::new(HashSet::new())),
            stop: Arc::new(AtomicBool::new(false)),
            coordinator: Mutex::new(None),
        }
    }

    /// Begins running `leaves` under `options`, returning immediately.
    /// Errors if a previous run hasn't been [`Scheduler::join`]ed yet.
    pub fn run(
        &self,
        options: ExecutionOptions,
        leaves: Vec<NodeId>,
    ) -> Result<(), crate::errors::SchedulerError> {
        let mut coordinator = self.coordinator.lock().expect("coordinator mutex poisoned");
        if coordinator.is_some() {
            // spec.md §4.4.2: `Run` first invokes `Cancel` and aborts if
            // that couldn't restore `Idle`. `Cancel` only signals -- it
            // never blocks -- so a prior run that hasn't drained yet still
            // leaves us rejecting this call; the signal just gives it a
            // head start toward `Idle` for the caller's next attempt.
            self.stop.store(true, Ordering::SeqCst);
            return Err(crate::errors::SchedulerError::StillRunning);
        }

        info!(count = leaves.len(), "starting test run");
        self.stop.store(false, Ordering::SeqCst);
        {
            let mut scheduled = self.scheduled.lock().expect("scheduled set mutex poisoned");
            scheduled.clear();
            scheduled.extend(leaves.iter().copied());
        }

        let graph = self.graph.clone();
        let store = self.store.clone();
        let options = Arc::new(options);
        let stop = self.stop.clone();
        let scheduled = self.scheduled.clone();

        // spec.md §4.4.4/§8 property 1: with `MaxWorkers == 0` every test
        // runs on the caller's thread and `Run` completes synchronously --
        // no coordinator thread, no worker pool. Spawning a background
        // thread even in this mode would make `Run` return before the
        // tests it was asked to run have executed.
        if options.max_workers == 0 {
            executor::run_coordinator(graph, store, options, leaves, stop);
            scheduled.lock().expect("scheduled set mutex poisoned").clear();
            debug!("synchronous test run finished");
            return Ok(());
        }

        let handle = std::thread::Builder::new()
            .name("paramtest-coordinator".to_string())
            .spawn(move || {
                executor::run_coordinator(graph, store, options, leaves, stop);
                scheduled.lock().expect("scheduled set mutex poisoned").clear();
                debug!("test run finished");
            })
            .expect("failed to spawn coordinator thread");

        *coordinator = Some(handle);
        Ok(())
    }

    /// Requests cooperative cancellation: in-flight tests are given a
    /// chance to observe the stop flag (spec.md §4.4.2); tests already
    /// mid-body when cancellation is requested run to completion or are
    /// forcibly killed as a last resort, never blocking the caller.
    pub fn cancel(&self) {
        warn!("cancelling test run");
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Blocks until the current run's coordinator thread has finished.
    /// A no-op if nothing is running.
    pub fn join(&self) {
        let handle = self.coordinator.lock().expect("coordinator mutex poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.coordinator.lock().expect("coordinator mutex poisoned").is_some()
    }

    pub fn is_scheduled(&self, id: NodeId) -> bool {
        self.scheduled.lock().expect("scheduled set mutex poisoned").contains(&id)
    }

    pub(crate) fn scheduled_snapshot(&self) -> HashSet<NodeId> {
        self.scheduled.lock().expect("scheduled set mutex poisoned").clone()
    }
}
