// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The process-wide test registry (spec.md §4.1 `TestManager`/§9 registration
//! design note). Built once, lazily, from everything collected via
//! [`inventory`] plus whatever [`crate::macros`] submitted; tests that want
//! isolation from global state can instead build a private [`Registry`] with
//! [`Registry::from_graph`].

use crate::definition::Concurrency;
use crate::errors::RegistrationError;
use crate::graph::{NodeId, TestGraph};
use crate::results::{determine_status, ResultStore, Status};
use crate::scheduler::Scheduler;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// One declared category, collected from [`crate::declare_test_category`].
pub struct CategoryRegistration {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub file: &'static str,
    pub line: u32,
}
inventory::collect!(CategoryRegistration);

/// One declared test (zero-arg or parametric), collected from
/// [`crate::declare_test`]/[`crate::declare_parametric_test`].
///
/// `build` is deliberately a bare function pointer rather than a closure
/// capturing anything: it is constructed once at the macro call site and
/// must be safe to invoke at any later point, against any [`TestGraph`],
/// with no captured state to go stale.
pub struct TestRegistration {
    pub category: &'static str,
    pub build: fn(&mut TestGraph, NodeId) -> Result<NodeId, RegistrationError>,
}
inventory::collect!(TestRegistration);

/// A substring-and-status filter over the registry (spec.md §9 supplemented
/// feature, grounded in the original's `TestQuery`): a test matches if its
/// full id contains `name_contains` (when present) and its resolved
/// [`Status`] is in `statuses` (when non-empty).
#[derive(Clone, Debug, Default)]
pub struct TestQuery {
    pub name_contains: Option<String>,
    pub statuses: Vec<Status>,
}

impl TestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_contains(mut self, substring: impl Into<String>) -> Self {
        self.name_contains = Some(substring.into());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.statuses.push(status);
        self
    }

    fn matches(&self, id: &str, status: Status) -> bool {
        let name_ok = self
            .name_contains
            .as_deref()
            .map_or(true, |needle| id.contains(needle));
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&status);
        name_ok && status_ok
    }
}

/// Builds the test entity graph from every [`CategoryRegistration`] and
/// [`TestRegistration`] collected via `inventory`, attaching categories in
/// a fixed-point pass so declaration order across translation units doesn't
/// matter (a category may be declared after tests that nest under it).
fn build_graph_from_inventory() -> TestGraph {
    let mut graph = TestGraph::new();
    let root = graph.add_root("root".to_string(), "root".to_string(), "<registry>", 0);

    let mut pending: Vec<&CategoryRegistration> = inventory::iter::<CategoryRegistration>().collect();
    let mut placed: std::collections::HashMap<&str, NodeId> = std::collections::HashMap::new();
    placed.insert("root", root);

    // Categories may reference a parent category declared later in
    // iteration order (inventory order is unspecified); keep sweeping
    // until a full pass places nothing new.
    loop {
        let before = placed.len();
        pending.retain(|category| {
            let parent_name = category.parent.unwrap_or("root");
            match placed.get(parent_name) {
                Some(&parent_id) => {
                    let id = format!("{parent_name}::{}", category.name);
                    let node = graph.add_child(parent_id, id, category.name.to_string(), category.file, category.line);
                    placed.insert(category.name, node);
                    false
                }
                None => true,
            }
        });
        if placed.len() == before {
            break;
        }
    }

    for category in &pending {
        error!(
            category = category.name,
            parent = category.parent.unwrap_or("root"),
            "category declared under an unknown parent; dropping"
        );
    }

    for test in inventory::iter::<TestRegistration>() {
        let parent_id = match placed.get(test.category) {
            Some(&id) => id,
            None => {
                warn!(category = test.category, "test declared under an unknown category; dropping");
                continue;
            }
        };
        if let Err(err) = (test.build)(&mut graph, parent_id) {
            // spec.md §4.2/§7: a registration-time error is a programmer
            // error and "abort[s] at initialisation" -- never logged and
            // carried on past, the way a scheduler-state error would be.
            panic!("test registration failed: {err}");
        }
    }

    graph
}

static GLOBAL: Lazy<Registry> = Lazy::new(|| Registry::from_graph(build_graph_from_inventory()));

/// Entry point mirroring the original's `TestManager` singleton: owns the
/// frozen test graph, the result store, and the scheduler that runs
/// against them.
pub struct Registry {
    graph: Arc<TestGraph>,
    store: Arc<ResultStore>,
    scheduler: Scheduler,
}

impl Registry {
    /// The process-wide registry, built once from everything collected via
    /// `inventory` on first access.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Builds a registry over an already-constructed graph, bypassing
    /// `inventory` entirely. Used by tests that want an isolated registry
    /// instead of the shared global one.
    pub fn from_graph(graph: TestGraph) -> Self {
        let graph = Arc::new(graph);
        let store = Arc::new(ResultStore::new());
        let scheduler = Scheduler::new(graph.clone(), store.clone());
        Self { graph, store, scheduler }
    }

    pub fn graph(&self) -> &TestGraph {
        &self.graph
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    fn root(&self) -> NodeId {
        self.graph.roots().next().expect("registry graph always has a root")
    }

    /// Runs every leaf in the graph (spec.md §4.1 `RunAll`).
    pub fn run_all(&self, options: crate::options::ExecutionOptions) -> Result<(), crate::errors::SchedulerError> {
        let leaves = self.graph.leaf_ids(self.root());
        self.scheduler.run(options, leaves)
    }

    /// Runs every leaf under the named category, or a single leaf if `path`
    /// names one directly (spec.md §4.1 `Run(category)`/`Run(definition)`).
    pub fn run_path(
        &self,
        path: &str,
        options: crate::options::ExecutionOptions,
    ) -> Result<(), crate::errors::SchedulerError> {
        let leaves = match self.find(path) {
            Some(id) => self.graph.leaf_ids(id),
            None => Vec::new(),
        };
        self.scheduler.run(options, leaves)
    }

    pub fn cancel(&self) {
        self.scheduler.cancel();
    }

    pub fn join(&self) {
        self.scheduler.join();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn is_scheduled(&self, id: NodeId) -> bool {
        self.scheduler.is_scheduled(id)
    }

    pub fn determine_status(&self, id: NodeId) -> Status {
        let scheduled = self.scheduler.scheduled_snapshot();
        determine_status(&self.graph, &self.store, &scheduled, id)
    }

    /// Finds a node by its full, `::`-separated path from the root (e.g.
    /// `"math::addition"`), walking one path segment at a time.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root();
        for segment in path.split("::") {
            current = self.graph.find_by_name(current, segment)?;
        }
        Some(current)
    }

    /// Returns every leaf id matching `query` together with its currently
    /// resolved status (spec.md §9 supplemented feature).
    pub fn query(&self, query: &TestQuery) -> Vec<(NodeId, Status)> {
        let scheduled = self.scheduler.scheduled_snapshot();
        self.graph
            .leaf_ids(self.root())
            .into_iter()
            .map(|id| {
                let status = determine_status(&self.graph, &self.store, &scheduled, id);
                (id, status)
            })
            .filter(|(id, status)| query.matches(self.graph.node(*id).id(), *status))
            .collect()
    }
}

#[allow(dead_code)]
fn _concurrency_hint(_: Concurrency) {}
#[allow(dead_code)]
fn _timeout_hint(_: Duration) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TestDefinition;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_graph() -> TestGraph {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), "f", 1);
        let math = graph.add_child(root, "root::math".into(), "math".into(), "f", 1);
        let add = graph.add_child(math, "root::math::add".into(), "add".into(), "f", 2);
        graph.set_definition(add, TestDefinition::new(Arc::new(|| {}), add));
        let sub = graph.add_child(math, "root::math::sub".into(), "sub".into(), "f", 3);
        graph.set_definition(
            sub,
            TestDefinition::new(Arc::new(|| panic!("nope")), sub),
        );
        graph
    }

    #[test]
    fn run_all_executes_every_leaf_and_resolves_status() {
        let registry = Registry::from_graph(sample_graph());
        registry.run_all(crate::options::ExecutionOptions::new()).unwrap();
        registry.join();

        let add = registry.find("math::add").unwrap();
        let sub = registry.find("math::sub").unwrap();
        assert_eq!(registry.determine_status(add), Status::Passed);
        assert_eq!(registry.determine_status(sub), Status::Failed);

        let math = registry.find("math").unwrap();
        assert_eq!(registry.determine_status(math), Status::Failed);
    }

    #[test]
    fn run_path_runs_only_the_requested_subtree() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), "f", 1);
        let cat = graph.add_child(root, "root::cat".into(), "cat".into(), "f", 1);
        let a_calls = calls.clone();
        let a = graph.add_child(cat, "root::cat::a".into(), "a".into(), "f", 2);
        graph.set_definition(a, TestDefinition::new(Arc::new(move || { a_calls.fetch_add(1, Ordering::SeqCst); }), a));
        let other = graph.add_child(root, "root::other".into(), "other".into(), "f", 3);
        let o_calls = calls.clone();
        graph.set_definition(other, TestDefinition::new(Arc::new(move || { o_calls.fetch_add(100, Ordering::SeqCst); }), other));

        let registry = Registry::from_graph(graph);
        registry.run_path("cat", crate::options::ExecutionOptions::new()).unwrap();
        registry.join();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn query_filters_by_name_and_status() {
        let registry = Registry::from_graph(sample_graph());
        registry.run_all(crate::options::ExecutionOptions::new()).unwrap();
        registry.join();

        let failed = registry.query(&TestQuery::new().with_status(Status::Failed));
        assert_eq!(failed.len(), 1);
        assert_eq!(registry.graph().node(failed[0].0).id(), "root::math::sub");

        let math_only = registry.query(&TestQuery::new().with_name_contains("math"));
        assert_eq!(math_only.len(), 2);
    }
}
