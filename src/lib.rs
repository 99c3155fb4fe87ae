// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A parametric unit-test registry, scheduler, and watchdog-supervised
//! runner: tests declare themselves via macros from anywhere in the crate
//! graph, are expanded into concrete cases, and run under one of three
//! concurrency classes with per-test timeouts and forced termination of
//! anything that overruns.

pub mod cli;
pub mod definition;
pub mod errors;
pub mod generator;
pub mod graph;
mod macros;
pub mod options;
pub mod partition;
pub mod registry;
pub mod reporter;
pub mod results;
pub mod scheduler;
pub mod summary;

pub use definition::{Concurrency, TestDefinition};
pub use errors::{RegistrationError, SchedulerError};
pub use generator::Generator;
pub use graph::{NodeId, TestGraph};
pub use options::ExecutionOptions;
pub use registry::{Registry, TestQuery};
pub use results::{ResultStore, Status, TestFailure, TestResult};
pub use scheduler::Scheduler;
pub use summary::RunSummary;

#[doc(hidden)]
pub use inventory;
