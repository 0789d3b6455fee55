// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Memory scrubbing that the optimizer cannot elide.

use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

/// Overwrites `buf` with zeros through volatile writes, then fences so the
/// stores cannot be reordered past later reads or dropped as dead.
pub fn explicit_bzero(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, writable location inside the slice.
        unsafe { ptr::write_volatile(byte, 0) };
    }
    compiler_fence(Ordering::SeqCst);
}
