// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `TerminateThread`-based forced termination, matching the original
//! `ThreadUtils::KillThread`'s Windows branch.

use std::os::windows::io::{AsRawHandle, RawHandle};
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::System::Threading::TerminateThread;

pub struct KillHandle {
    raw: RawHandle,
}

pub trait Killable {
    fn kill_handle(&self) -> KillHandle;
}

impl<T> Killable for std::thread::JoinHandle<T> {
    fn kill_handle(&self) -> KillHandle {
        KillHandle {
            raw: self.as_raw_handle(),
        }
    }
}

impl KillHandle {
    pub(super) fn kill(&self) {
        unsafe {
            TerminateThread(self.raw as HANDLE, 1);
        }
    }
}
