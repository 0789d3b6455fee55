// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! # winposix
//!
//! > POSIX-compatibility routines for Windows hosts.
//!
//! This crate lets code written against Unix system-call conventions run atop
//! the Windows native API. It exposes a [`WinPosix`] aggregate "above" when it
//! is provided a [`host::Provider`] interface "below": blocking sleeps,
//! wall-clock retrieval, secure memory clearing, filesystem statistics,
//! dynamic library loading, UTF-8/UTF-16 bridging, BOM-aware file opening,
//! program-directory resolution, terminal geometry, and child-process
//! spawning with redirected standard streams.
//!
//! On Windows, [`host::windows::WindowsHost`] is the real provider. Child
//! tracking and descriptor translation live outside this crate and are
//! consumed through the [`ChildTracker`] and [`DescriptorTable`] traits.

pub mod dlfcn;
pub mod encoding;
pub mod host;
pub mod ioctl;
pub mod mem;
pub mod process;
pub mod progdir;
pub mod statvfs;
pub mod stdio;
pub mod time;
mod winposix;

pub use winposix::{ChildTracker, DescriptorTable, RawFd, WinPosix};
