// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for registration and scheduling.
//!
//! Per-test failures (assertions, panics, timeouts, cancellation) are not
//! modeled here -- those are recorded as [`crate::results::TestFailure`]
//! values attached to a [`crate::results::TestResult`] and never propagate
//! past the scheduler. The errors in this module are the ones spec.md §7
//! calls out as aborting initialization or being rejected outright.

use thiserror::Error;

/// Raised when the generator expands a parameterised declaration into zero
/// argument tuples. Per spec.md §4.2, this is a programmer error and
/// registration must abort rather than silently produce an empty subtree.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(
        "test `{name}` ({file}:{line}) declares arguments but no value cases or value sources \
         were provided"
    )]
    EmptyParameterization {
        name: String,
        file: &'static str,
        line: u32,
    },

    #[error("duplicate test id `{id}` registered under category `{category}`")]
    DuplicateId { id: String, category: String },
}

/// Raised when the scheduler's public contract is violated.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `Run` was called while a previous run was still active and `Cancel`
    /// could not restore the scheduler to `Idle` before returning. Per
    /// spec.md §4.4.2, the caller should `Join` the prior run first.
    #[error("scheduler is still draining a previous run; call Join() before Run() again")]
    StillRunning,
}
