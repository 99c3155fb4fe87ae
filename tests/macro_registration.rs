// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end coverage of the registration macros (spec.md §6
//! "Registration API"): `declare_test_category!`/`declare_test!`/
//! `declare_parametric_test!` submit into `inventory`, and
//! `Registry::global()` assembles them into the process-wide graph on
//! first access. Every other integration test builds a private
//! [`paramtest::Registry`] over a hand-built graph instead; this file is
//! the one place the macro call sites themselves are exercised, since
//! they can only target the one process-wide registry a test binary gets.

use paramtest::{Concurrency, Registry, Status};
use std::time::Duration;

paramtest::declare_test_category!(arithmetic);

paramtest::declare_test!(arithmetic, addition_holds, Concurrency::Any, || {
    paramtest::assert_that!(2 + 2 == 4);
});

paramtest::declare_test!(arithmetic, always_fails, Concurrency::Any, || {
    paramtest::assert_that!(1 == 2, "expected {} to equal {}", 1, 2);
});

paramtest::declare_parametric_test!(
    arithmetic,
    doubling,
    Concurrency::Any,
    vec![1, 2, 3],
    |n: &i32| {
        paramtest::assert_that!(n * 2 == n + n);
    }
);

#[test]
fn macro_declared_tests_run_through_the_global_registry() {
    let registry = Registry::global();
    registry
        .run_path("arithmetic", paramtest::ExecutionOptions::new().with_default_timeout(Duration::from_secs(5)))
        .unwrap();
    registry.join();

    let addition = registry.find("arithmetic::addition_holds").unwrap();
    assert_eq!(registry.determine_status(addition), Status::Passed);

    let failing = registry.find("arithmetic::always_fails").unwrap();
    assert_eq!(registry.determine_status(failing), Status::Failed);
    let result = registry
        .store()
        .fetch(registry.graph().node(failing).id())
        .unwrap();
    assert!(result.failure().unwrap().message().contains("expected 1 to equal 2"));

    for value in [1, 2, 3] {
        let leaf = registry
            .find(&format!("arithmetic::doubling::doubling({value})"))
            .unwrap_or_else(|| panic!("missing generated leaf for {value}"));
        assert_eq!(registry.determine_status(leaf), Status::Passed);
    }

    let arithmetic = registry.find("arithmetic").unwrap();
    assert_eq!(registry.determine_status(arithmetic), Status::Failed);
}
