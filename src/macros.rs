// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `assert_that!` and the declarative registration macros (spec.md §7:
//! "Declaring a test must not require more than a single macro invocation
//! plus a function body").
//!
//! Registration itself happens via [`inventory::submit!`], collected at
//! process start into [`crate::registry::Registry::global`] -- the
//! "static-initialisation-order-safe registration... compiled across many
//! translation units" spec.md §9 calls for, realised with the same crate
//! `cargo-nextest` uses for its own plugin-style discovery.

/// Panics with a [`crate::results::TestFailure`] payload carrying the
/// stringified expression and call site, mirroring the original's
/// `AssertThat` macro throwing `test_failure` with `#expr` as the message.
#[macro_export]
macro_rules! assert_that {
    ($cond:expr) => {
        if !($cond) {
            std::panic::panic_any($crate::results::TestFailure::new(
                concat!("assertion failed: ", stringify!($cond)),
                file!(),
                line!(),
            ));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !($cond) {
            std::panic::panic_any($crate::results::TestFailure::new(
                format!($($arg)+),
                file!(),
                line!(),
            ));
        }
    };
}

/// Registers a single zero-argument test under `category` (spec.md §4.2,
/// `DeclareTest`). `category` must name a path previously declared with
/// [`declare_test_category`].
#[macro_export]
macro_rules! declare_test {
    ($category:path, $name:ident, $concurrency:expr, $body:expr) => {
        $crate::inventory::submit! {
            $crate::registry::TestRegistration {
                category: stringify!($category),
                build: |graph, parent| {
                    $crate::generator::Generator::<()>::new(stringify!($name), file!(), line!())
                        .with_concurrency($concurrency)
                        .with_body($body)
                        .generate(graph, parent)
                },
            }
        }
    };
}

/// Registers a parametric test under `category`, one leaf per entry
/// `$cases` (an expression evaluating to `Vec<Arg>`) yields, named
/// `"name(v1, v2, ...)"` (spec.md §4.2, `DeclareTest` with value cases).
/// `Arg` is inferred from `$cases` and `$body`; it never appears in
/// [`crate::registry::TestRegistration`]'s own type, so tests over any
/// number of distinct `Arg` types can coexist in one inventory registry.
#[macro_export]
macro_rules! declare_parametric_test {
    ($category:path, $name:ident, $concurrency:expr, $cases:expr, $body:expr) => {
        $crate::inventory::submit! {
            $crate::registry::TestRegistration {
                category: stringify!($category),
                build: |graph, parent| {
                    $crate::generator::Generator::new(stringify!($name), file!(), line!())
                        .with_concurrency($concurrency)
                        .with_parameterised_body($body)
                        .value_source(|| $cases)
                        .generate(graph, parent)
                },
            }
        }
    };
}

/// Declares a category (a node with no body of its own that other tests
/// nest under), mirroring `DeclareTestCategory`.
#[macro_export]
macro_rules! declare_test_category {
    ($name:ident) => {
        $crate::inventory::submit! {
            $crate::registry::CategoryRegistration {
                name: stringify!($name),
                parent: None,
                file: file!(),
                line: line!(),
            }
        }
    };
    ($parent:path, $name:ident) => {
        $crate::inventory::submit! {
            $crate::registry::CategoryRegistration {
                name: stringify!($name),
                parent: Some(stringify!($parent)),
                file: file!(),
                line: line!(),
            }
        }
    };
}
