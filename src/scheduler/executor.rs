// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coordinator-thread and pool-worker-loop logic (spec.md §4.4.4).
//!
//! Run order is fixed: Exclusive cohort serially on the coordinator, then
//! Privileged serially on the coordinator *while* a worker pool drains Any
//! concurrently, then the coordinator itself joins the Any pool-worker loop
//! once Privileged is done, then every spawned thread is joined before
//! `Run` returns control to `Join`.

use crate::graph::{NodeId, TestGraph};
use crate::options::ExecutionOptions;
use crate::partition::{partition, worker_count};
use crate::results::ResultStore;
use crate::scheduler::watchdog::run_watched;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Runs every leaf in `leaves` to completion (or timeout/cancellation)
/// according to `options`, blocking the calling thread until done.
///
/// This is the coordinator's own body: called either directly on the
/// caller's thread (`max_workers == 0`, or no Any tests to pool out) or
/// from a dedicated coordinator thread spawned by
/// [`crate::scheduler::Scheduler::run`].
pub fn run_coordinator(
    graph: Arc<TestGraph>,
    store: Arc<ResultStore>,
    options: Arc<ExecutionOptions>,
    leaves: Vec<NodeId>,
    stop: Arc<AtomicBool>,
) {
    let cohorts = partition(&graph, &options, &leaves);

    for &id in &cohorts.exclusive {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        run_one(&graph, &store, &options, id, &stop);
    }

    let pool_workers = worker_count(cohorts.any.len(), cohorts.privileged.len(), &options);
    let any_cursor = Arc::new(AtomicUsize::new(0));
    let any = Arc::new(cohorts.any);

    let mut pool_handles = Vec::new();
    for _ in 0..pool_workers.saturating_sub(1) {
        let graph = graph.clone();
        let store = store.clone();
        let options = options.clone();
        let any = any.clone();
        let cursor = any_cursor.clone();
        let stop = stop.clone();
        pool_handles.push(std::thread::spawn(move || {
            pool_worker_loop(&graph, &store, &options, &any, &cursor, &stop);
        }));
    }

    for &id in &cohorts.privileged {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        run_one(&graph, &store, &options, id, &stop);
    }

    // The coordinator itself drains the Any cohort's remaining work once
    // Privileged is clear, rather than sitting idle waiting for the pool.
    // When `max_workers == 0` this is the only place Any tests ever run.
    pool_worker_loop(&graph, &store, &options, &any, &any_cursor, &stop);

    for handle in pool_handles {
        let _ = handle.join();
    }
}

/// Claims and runs one Any-cohort test at a time via an atomic cursor
/// (work-stealing across however many threads call this), until the
/// cohort is exhausted or cancellation is observed.
fn pool_worker_loop(
    graph: &TestGraph,
    store: &ResultStore,
    options: &ExecutionOptions,
    any: &[NodeId],
    cursor: &AtomicUsize,
    stop: &Arc<AtomicBool>,
) {
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let index = cursor.fetch_add(1, Ordering::SeqCst);
        let Some(&id) = any.get(index) else {
            return;
        };
        run_one(graph, store, options, id, stop);
    }
}

fn run_one(
    graph: &TestGraph,
    store: &ResultStore,
    options: &ExecutionOptions,
    id: NodeId,
    stop: &Arc<AtomicBool>,
) {
    let Some(definition) = graph.definition(id) else {
        return;
    };
    let timeout = crate::partition::effective_timeout(definition.timeout, options);
    run_watched(graph, store, definition, timeout, stop);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Concurrency, TestDefinition};
    use std::sync::Mutex;

    fn build_graph(order: Arc<Mutex<Vec<String>>>) -> (TestGraph, Vec<NodeId>) {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), file!(), line!());
        let mut leaves = Vec::new();

        let mut add = |graph: &mut TestGraph, name: &str, concurrency: Concurrency| {
            let id = graph.add_child(root, format!("root::{name}"), name.to_string(), file!(), line!());
            let order = order.clone();
            let tag = name.to_string();
            let mut def = TestDefinition::new(
                Arc::new(move || {
                    order.lock().unwrap().push(tag.clone());
                }),
                id,
            );
            def.concurrency = concurrency;
            graph.set_definition(id, def);
            id
        };

        leaves.push(add(&mut graph, "excl", Concurrency::Exclusive));
        leaves.push(add(&mut graph, "priv", Concurrency::Privileged));
        leaves.push(add(&mut graph, "any1", Concurrency::Any));
        leaves.push(add(&mut graph, "any2", Concurrency::Any));

        (graph, leaves)
    }

    #[test]
    fn exclusive_cohort_runs_before_everything_else() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (graph, leaves) = build_graph(order.clone());
        let graph = Arc::new(graph);
        let store = Arc::new(ResultStore::new());
        let options = Arc::new(ExecutionOptions::new().with_max_workers(2));
        let stop = Arc::new(AtomicBool::new(false));

        run_coordinator(graph.clone(), store.clone(), options, leaves, stop);

        let order = order.lock().unwrap();
        assert_eq!(order.first(), Some(&"excl".to_string()));
        assert!(order.contains(&"priv".to_string()));
        assert!(order.contains(&"any1".to_string()));
        assert!(order.contains(&"any2".to_string()));
    }

    #[test]
    fn main_thread_only_mode_still_runs_every_test() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (graph, leaves) = build_graph(order.clone());
        let graph = Arc::new(graph);
        let store = Arc::new(ResultStore::new());
        let options = Arc::new(ExecutionOptions::new().force_onto_main_thread());
        let stop = Arc::new(AtomicBool::new(false));

        run_coordinator(graph, store, options, leaves, stop);

        assert_eq!(order.lock().unwrap().len(), 4);
    }

    #[test]
    fn cancellation_stops_remaining_work() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (graph, leaves) = build_graph(order.clone());
        let graph = Arc::new(graph);
        let store = Arc::new(ResultStore::new());
        let options = Arc::new(ExecutionOptions::new().force_onto_main_thread());
        let stop = Arc::new(AtomicBool::new(true));

        run_coordinator(graph, store, options, leaves, stop);

        assert!(order.lock().unwrap().is_empty());
    }
}
