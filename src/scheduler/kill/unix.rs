// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pthread_cancel`-based forced termination.
//!
//! Cancellation type is set to asynchronous so the kill takes effect even
//! if the target is spinning in a tight loop with no cancellation point --
//! the common runaway-test case. Note: this relies on POSIX thread
//! cancellation support, which macOS/Darwin implements only partially;
//! `pthread_cancel` there may not interrupt a thread that never reaches a
//! cancellation point.

use std::os::unix::thread::JoinHandleExt;

/// Captures what's needed to forcibly kill a spawned thread later,
/// independent of the `JoinHandle` (which [`crate::scheduler::watchdog`]
/// intentionally drops without joining on the forced-kill path).
pub struct KillHandle {
    pthread: libc::pthread_t,
}

/// Implemented for whatever thread-spawning API surface yields a raw
/// platform thread id; currently just `std::thread::JoinHandle`.
pub trait Killable {
    fn kill_handle(&self) -> KillHandle;
}

impl<T> Killable for std::thread::JoinHandle<T> {
    fn kill_handle(&self) -> KillHandle {
        KillHandle {
            pthread: self.as_pthread_t(),
        }
    }
}

impl KillHandle {
    pub(super) fn kill(&self) {
        unsafe {
            libc::pthread_cancel(self.pthread);
        }
    }
}
