// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forced, non-cooperative termination of a runaway supervisor thread
//! (spec.md §4.4.5 step 3b). Platform split mirrors `ThreadUtils::KillThread`
//! in the original: Unix uses `pthread_cancel`, Windows uses
//! `TerminateThread`.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{Killable, KillHandle};
#[cfg(windows)]
pub use windows::{Killable, KillHandle};

/// Forcibly terminates the OS thread identified by `handle`.
///
/// This is never a graceful request: the target thread's stack is not
/// unwound, destructors do not run, and any lock it held stays held
/// forever. Callers must never join a thread after killing it (spec.md
/// §4.4.5 design notes: "forced termination releases the detached thread
/// handle and does not join it") and must treat anything that thread
/// touched (besides the `Arc`s handed to it) as permanently poisoned.
pub fn kill(handle: &KillHandle) {
    handle.kill();
}
