// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component B: generator / registration (spec.md §4.2).
//!
//! Rather than the original's template-specialised `TestGenerator<R(Args...)>`
//! hierarchy (one C++ partial specialisation per arity), this is a single
//! generic type parameterised by a closure that accepts one `Arg` and a
//! `Vec<Arg>` of argument tuples -- exactly the "zero-arg case is a
//! degenerate list of one empty tuple" realisation spec.md §9 prescribes.

use crate::definition::{Concurrency, TestDefinition};
use crate::errors::RegistrationError;
use crate::graph::{NodeId, TestGraph};
use std::{fmt::Write as _, sync::Arc, time::Duration};

/// Anything that can be rendered into the deterministic, comma-separated,
/// positional argument-tuple suffix the generator appends to a
/// parameterised leaf's name (spec.md §4.2 step 3).
pub trait ArgTuple: Send + Sync + 'static {
    fn describe(&self) -> String;
}

macro_rules! impl_arg_tuple_for_single {
    ($($t:ty),* $(,)?) => {
        $(
            impl ArgTuple for $t {
                fn describe(&self) -> String {
                    format!("{}", self)
                }
            }
        )*
    };
}

impl_arg_tuple_for_single!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, bool, char, String);

impl ArgTuple for &'static str {
    fn describe(&self) -> String {
        self.to_string()
    }
}

impl ArgTuple for () {
    fn describe(&self) -> String {
        String::new()
    }
}

macro_rules! impl_arg_tuple_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: ArgTuple),+> ArgTuple for ($($name,)+) {
            fn describe(&self) -> String {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                let mut out = String::new();
                let mut first = true;
                $(
                    if !first { out.push_str(", "); }
                    first = false;
                    let _ = write!(out, "{}", $name.describe());
                )+
                out
            }
        }
    };
}

impl_arg_tuple_for_tuple!(A);
impl_arg_tuple_for_tuple!(A, B);
impl_arg_tuple_for_tuple!(A, B, C);
impl_arg_tuple_for_tuple!(A, B, C, D);

/// Builds one declared test (body + name/file/line + value sources/cases +
/// decorators) into a subtree grafted under a category node.
pub struct Generator<Arg: ArgTuple> {
    name: String,
    file: &'static str,
    line: u32,
    concurrency: Concurrency,
    timeout: Duration,
    arguments: Vec<Arg>,
    body: Option<Arc<dyn Fn() + Send + Sync + 'static>>,
    parameterised_body: Option<Arc<dyn Fn(&Arg) + Send + Sync + 'static>>,
}

impl<Arg: ArgTuple> Generator<Arg> {
    pub fn new(name: impl Into<String>, file: &'static str, line: u32) -> Self {
        Self {
            name: name.into(),
            file,
            line,
            concurrency: Concurrency::default(),
            timeout: Duration::ZERO,
            arguments: Vec::new(),
            body: None,
            parameterised_body: None,
        }
    }

    /// A zero-argument test body. Mutually exclusive with
    /// [`Generator::with_parameterised_body`].
    pub fn with_body(mut self, body: impl Fn() + Send + Sync + 'static) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    /// A test body taking one argument tuple, applied once per entry
    /// gathered from value cases / value sources.
    pub fn with_parameterised_body(mut self, body: impl Fn(&Arg) + Send + Sync + 'static) -> Self {
        self.parameterised_body = Some(Arc::new(body));
        self
    }

    /// `ValueCase(v1, ..., vN)` -- one literal argument tuple.
    pub fn value_case(mut self, value: Arg) -> Self {
        self.arguments.push(value);
        self
    }

    /// `ValueSource(nullary-fn)` -- a function producing a sequence of
    /// argument tuples, evaluated eagerly and concatenated (spec.md §4.2
    /// step 1a).
    pub fn value_source(mut self, source: impl FnOnce() -> Vec<Arg>) -> Self {
        self.arguments.extend(source());
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Expands this declaration into a subtree and grafts it under
    /// `parent` in `graph`, returning the root of the new subtree.
    ///
    /// If a zero-argument body was supplied, produces a single leaf node.
    /// Otherwise, for each gathered argument tuple, synthesises a
    /// closed-over callable and a leaf named `"<name>(v1, v2, ...)"`,
    /// attached under a root node named `<name>` (spec.md §4.2 steps 2-4).
    pub fn generate(self, graph: &mut TestGraph, parent: NodeId) -> Result<NodeId, RegistrationError> {
        if graph.find_by_name(parent, &self.name).is_some() {
            return Err(RegistrationError::DuplicateId {
                id: format!("{}::{}", graph.node(parent).id(), self.name),
                category: graph.node(parent).id().to_string(),
            });
        }
        match self.body {
            Some(body) => {
                let id = format!("{}::{}", graph.node(parent).id(), self.name);
                let node = graph.add_child(parent, id, self.name.clone(), self.file, self.line);
                let mut def = TestDefinition::new(body, node);
                def.concurrency = self.concurrency;
                def.timeout = self.timeout;
                graph.set_definition(node, def);
                Ok(node)
            }
            None => {
                if self.arguments.is_empty() {
                    return Err(RegistrationError::EmptyParameterization {
                        name: self.name,
                        file: self.file,
                        line: self.line,
                    });
                }
                let parameterised_body = self
                    .parameterised_body
                    .expect("generator must have a body or a parameterised body");

                let root_id = format!("{}::{}", graph.node(parent).id(), self.name);
                let root = graph.add_child(parent, root_id, self.name.clone(), self.file, self.line);

                for argument in self.arguments {
                    let leaf_name = format!("{}({})", self.name, argument.describe());
                    let leaf_id = format!("{}({})", graph.node(root).id(), argument.describe());
                    let leaf = graph.add_child(root, leaf_id, leaf_name, self.file, self.line);

                    let body = parameterised_body.clone();
                    let argument = Arc::new(argument);
                    let instance: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                        (body)(&argument);
                    });

                    let mut def = TestDefinition::new(instance, leaf);
                    def.concurrency = self.concurrency;
                    def.timeout = self.timeout;
                    graph.set_definition(leaf, def);
                }

                Ok(root)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn zero_arg_body_produces_single_leaf() {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), file!(), line!());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let leaf = Generator::<()>::new("simple", file!(), line!())
            .with_body(move || {
                calls2.fetch_add(1, Ordering::SeqCst);
            })
            .generate(&mut graph, root)
            .unwrap();

        assert!(graph.node(leaf).is_leaf());
        (graph.definition(leaf).unwrap().body)();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parameterised_body_produces_one_leaf_per_tuple() {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), file!(), line!());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen2 = seen.clone();

        let subtree = Generator::<i32>::new("parametric", file!(), line!())
            .with_parameterised_body(move |v: &i32| {
                seen2.lock().unwrap().push(*v);
            })
            .value_case(1)
            .value_source(|| vec![2, 3])
            .generate(&mut graph, root)
            .unwrap();

        let leaves = graph.leaf_ids(subtree);
        assert_eq!(leaves.len(), 3);

        let names: Vec<_> = leaves.iter().map(|&id| graph.node(id).name().to_string()).collect();
        assert!(names.contains(&"parametric(1)".to_string()));
        assert!(names.contains(&"parametric(2)".to_string()));
        assert!(names.contains(&"parametric(3)".to_string()));

        for leaf in leaves {
            (graph.definition(leaf).unwrap().body)();
        }
        let mut observed = seen.lock().unwrap().clone();
        observed.sort();
        assert_eq!(observed, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_name_under_the_same_parent_is_an_error() {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), file!(), line!());

        Generator::<()>::new("dup", file!(), line!())
            .with_body(|| {})
            .generate(&mut graph, root)
            .unwrap();

        let result = Generator::<()>::new("dup", file!(), line!())
            .with_body(|| {})
            .generate(&mut graph, root);

        assert!(matches!(
            result,
            Err(RegistrationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn empty_parameterization_is_an_error() {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), file!(), line!());

        let result = Generator::<i32>::new("broken", file!(), line!())
            .with_parameterised_body(|_: &i32| {})
            .generate(&mut graph, root);

        assert!(matches!(
            result,
            Err(RegistrationError::EmptyParameterization { .. })
        ));
    }

    #[test]
    fn registration_is_idempotent_across_two_independent_graphs() {
        fn register(graph: &mut TestGraph, root: NodeId) -> NodeId {
            Generator::<i32>::new("idempotent", file!(), line!())
                .with_parameterised_body(|_: &i32| {})
                .value_case(1)
                .value_source(|| vec![2, 3])
                .generate(graph, root)
                .unwrap()
        }

        let mut graph_a = TestGraph::new();
        let root_a = graph_a.add_root("root".into(), "root".into(), file!(), line!());
        let subtree_a = register(&mut graph_a, root_a);

        let mut graph_b = TestGraph::new();
        let root_b = graph_b.add_root("root".into(), "root".into(), file!(), line!());
        let subtree_b = register(&mut graph_b, root_b);

        let mut names_a: Vec<_> = graph_a
            .leaf_ids(subtree_a)
            .into_iter()
            .map(|id| graph_a.node(id).id().to_string())
            .collect();
        let mut names_b: Vec<_> = graph_b
            .leaf_ids(subtree_b)
            .into_iter()
            .map(|id| graph_b.node(id).id().to_string())
            .collect();
        names_a.sort();
        names_b.sort();
        assert_eq!(names_a, names_b);
    }

    proptest! {
        /// Every value case and every value-source entry becomes exactly
        /// one leaf, in order -- spec.md §4.2 step 1 describes gathering
        /// as concatenation, never deduplication or reordering.
        #[test]
        fn leaf_count_matches_gathered_tuple_count(cases in prop::collection::vec(any::<i32>(), 0..12), sourced in prop::collection::vec(any::<i32>(), 0..12)) {
            let mut graph = TestGraph::new();
            let root = graph.add_root("root".into(), "root".into(), file!(), line!());

            let mut generator = Generator::<i32>::new("prop", file!(), line!())
                .with_parameterised_body(|_: &i32| {});
            for case in &cases {
                generator = generator.value_case(*case);
            }
            let sourced_clone = sourced.clone();
            generator = generator.value_source(move || sourced_clone);

            let total = cases.len() + sourced.len();
            if total == 0 {
                prop_assert!(generator.generate(&mut graph, root).is_err());
            } else {
                let subtree = generator.generate(&mut graph, root).unwrap();
                prop_assert_eq!(graph.leaf_ids(subtree).len(), total);
            }
        }

        /// Registering the same declaration into two independent graphs
        /// produces identical sorted Id sets (spec.md §8 property 6:
        /// "generator idempotence").
        #[test]
        fn generation_is_deterministic_for_a_fixed_input(values in prop::collection::vec(any::<i32>(), 1..8)) {
            fn register(graph: &mut TestGraph, root: NodeId, values: Vec<i32>) -> Vec<String> {
                let subtree = Generator::<i32>::new("prop", file!(), line!())
                    .with_parameterised_body(|_: &i32| {})
                    .value_source(move || values)
                    .generate(graph, root)
                    .unwrap();
                let mut ids: Vec<_> = graph
                    .leaf_ids(subtree)
                    .into_iter()
                    .map(|id| graph.node(id).id().to_string())
                    .collect();
                ids.sort();
                ids
            }

            let mut graph_a = TestGraph::new();
            let root_a = graph_a.add_root("root".into(), "root".into(), file!(), line!());
            let ids_a = register(&mut graph_a, root_a, values.clone());

            let mut graph_b = TestGraph::new();
            let root_b = graph_b.add_root("root".into(), "root".into(), file!(), line!());
            let ids_b = register(&mut graph_b, root_b, values);

            prop_assert_eq!(ids_a, ids_b);
        }
    }
}
