// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test supervision: runs a test body on its own thread, polls it for
//! completion against a timeout and a cooperative stop signal, and forces
//! termination of the supervisor thread if it overruns (spec.md §4.4.5).

use crate::definition::TestDefinition;
use crate::graph::TestGraph;
use crate::results::{ResultStore, TestFailure};
use crate::scheduler::kill::{kill, Killable};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often the caller thread polls the supervisor for completion while
/// waiting out the timeout (spec.md §4.4.5 step 3: "poll at a short,
/// implementation-defined interval").
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Runs a single test's body under watch, recording its outcome into
/// `store` before returning.
///
/// `stop` is checked on every poll tick; if it flips to `true` before the
/// body finishes, the test is recorded as cancelled and the supervisor
/// thread's handle is dropped without joining (the body may still be
/// running in the background; this is the same "never block the scheduler
/// on a straggler" tradeoff the timeout path makes).
pub fn run_watched(
    graph: &TestGraph,
    store: &ResultStore,
    definition: &TestDefinition,
    timeout: Duration,
    stop: &Arc<AtomicBool>,
) {
    let node = graph.node(definition.node());
    let id = node.id().to_string();
    let file = node.file();
    let line = node.line();

    store.edit(&id, |result| {
        result.reset();
        result.begin();
    });

    let body = definition.body.clone();
    let outcome: Arc<std::sync::Mutex<Option<Option<TestFailure>>>> =
        Arc::new(std::sync::Mutex::new(None));
    let outcome_writer = outcome.clone();
    let file_for_panic = file;

    let handle = std::thread::Builder::new()
        .name(format!("paramtest-supervisor-{id}"))
        .spawn(move || {
            #[cfg(unix)]
            unsafe {
                libc::pthread_setcanceltype(libc::PTHREAD_CANCEL_ASYNCHRONOUS, std::ptr::null_mut());
            }

            let result = std::panic::catch_unwind(AssertUnwindSafe(|| (body)()));
            let failure = match result {
                Ok(()) => None,
                Err(payload) => Some(classify_panic(payload, file_for_panic, line)),
            };
            *outcome_writer.lock().expect("outcome mutex poisoned") = Some(failure);
        })
        .expect("failed to spawn test supervisor thread");

    let deadline = Instant::now() + timeout;
    let final_failure = loop {
        if let Some(failure) = outcome.lock().expect("outcome mutex poisoned").take() {
            break WatchOutcome::Finished(failure);
        }
        if stop.load(Ordering::SeqCst) {
            break WatchOutcome::Cancelled;
        }
        if Instant::now() >= deadline {
            break WatchOutcome::TimedOut;
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    match final_failure {
        WatchOutcome::Finished(failure) => {
            // The body already returned; joining is instantaneous and
            // releases the thread's resources properly.
            let _ = handle.join();
            store.edit(&id, |result| result.finish(failure));
        }
        WatchOutcome::TimedOut => {
            kill(&handle.kill_handle());
            drop(handle);
            store.edit(&id, |result| {
                result.finish(Some(TestFailure::new(
                    format!("test exceeded its {:?} timeout and was forcibly terminated", timeout),
                    file,
                    line,
                )))
            });
        }
        WatchOutcome::Cancelled => {
            // The body may have finished in the gap between the last poll
            // and observing the stop flag; only join if it has. Per
            // spec.md §4.4.5/§5, cancellation never forcibly kills -- a
            // still-running body is left to finish on its own, and the
            // handle is simply dropped ("detaches further interest")
            // rather than joined, so cancellation never blocks the
            // scheduler on a straggler. Only a timeout kills outright.
            if outcome.lock().expect("outcome mutex poisoned").is_some() {
                let _ = handle.join();
            } else {
                drop(handle);
            }
            store.edit(&id, |result| {
                result.finish(Some(TestFailure::new("run was cancelled", file, line)))
            });
        }
    }
}

enum WatchOutcome {
    Finished(Option<TestFailure>),
    TimedOut,
    Cancelled,
}

/// Turns a caught panic payload into a [`TestFailure`].
///
/// [`crate::assert_that`] panics with a `TestFailure` payload directly, so
/// the common case is a downcast; any other panic (a bare `panic!`, an
/// `unwrap()` on `None`, a third-party assertion macro) gets a
/// best-effort message extracted from the usual `&str`/`String` payloads.
fn classify_panic(payload: Box<dyn std::any::Any + Send>, file: &'static str, line: u32) -> TestFailure {
    if let Some(failure) = payload.downcast_ref::<TestFailure>() {
        return failure.clone();
    }
    if let Some(message) = payload.downcast_ref::<&str>() {
        return TestFailure::new(*message, file, line);
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return TestFailure::new(message.clone(), file, line);
    }
    TestFailure::new("test panicked with a non-string payload", file, line)
}
