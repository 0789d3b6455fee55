// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The underlying host upon which the shim resides.
//!
//! The top-level trait that denotes something is a valid host is
//! [`Provider`]. It is merely a collection of subtraits, one per host
//! concern, so that each shim module depends only on the capabilities it
//! actually uses. The real Windows implementation lives in [`windows`];
//! tests run against the deterministic mock in `mock`.

#[cfg(windows)]
pub mod windows;

#[cfg(test)]
pub(crate) mod mock;

use std::io;

use thiserror::Error;

use crate::encoding::WideString;

/// A provider of a host upon which the shim can execute.
///
/// Ideally, a [`Provider`] is zero-sized, and only exists to provide access
/// to functionality provided by it.
pub trait Provider:
    ClockProvider
    + TimerProvider
    + VolumeProvider
    + ModuleProvider
    + FileProvider
    + ConsoleProvider
    + ProcessProvider
    + InvocationProvider
{
}

/// A raw host error code (a `GetLastError` value on Windows).
///
/// These are preserved verbatim inside taxonomy errors so that callers can
/// still see what the host reported, without the raw representation becoming
/// the caller-visible contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostError(pub u32);

impl core::fmt::Display for HostError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "host error code {}", self.0)
    }
}

/// 100-nanosecond ticks since the host epoch (1601-01-01, a Windows
/// `FILETIME`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileTime(pub u64);

/// An interface to the host's wall clock.
pub trait ClockProvider {
    /// The current system time in host epoch ticks.
    fn current_time(&self) -> FileTime;
}

/// Possible faults from the host's waitable-timer machinery.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimerError {
    #[error("host could not allocate a waitable timer")]
    CreateFailed,
    #[error("host rejected the timer due time")]
    ArmFailed,
    #[error("wait on the timer did not complete")]
    WaitFailed,
}

/// Blocking sleep primitives.
pub trait TimerProvider {
    type WaitableTimer;

    /// Allocate a one-shot waitable timer.
    fn create_waitable_timer(&self) -> Result<Self::WaitableTimer, TimerError>;

    /// Arm `timer` to fire after `delay_100ns` ticks.
    fn arm(&self, timer: &Self::WaitableTimer, delay_100ns: i64) -> Result<(), TimerError>;

    /// Block the calling thread until `timer` fires.
    ///
    /// The wait is uninterruptible; there is no cancellation hook.
    fn wait(&self, timer: &Self::WaitableTimer) -> Result<(), TimerError>;

    /// Block the calling thread for `milliseconds` at scheduler granularity.
    fn sleep_ms(&self, milliseconds: u64);
}

/// Cluster geometry of the volume containing some path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    pub sectors_per_cluster: u32,
    pub bytes_per_sector: u32,
    pub free_clusters: u32,
    pub total_clusters: u32,
}

/// An interface to volume metadata.
pub trait VolumeProvider {
    /// The host's path-length limit (`MAX_PATH` on Windows).
    const MAX_PATH: u64;

    /// Query the geometry of the volume containing `path`.
    fn disk_free_space(&self, path: &str) -> Result<DiskGeometry, HostError>;
}

/// Shared-module (dynamic library) loading.
pub trait ModuleProvider {
    /// An opaque handle to a loaded module.
    type Module;

    /// Load a module by path. `None` on failure; the host does not report a
    /// standardized error code here.
    fn load_module(&self, path: &str) -> Option<Self::Module>;

    /// Release a loaded module.
    fn unload_module(&self, module: Self::Module);

    /// Look up an exported symbol. `None` if absent.
    fn resolve_symbol(
        &self,
        module: &Self::Module,
        symbol: &str,
    ) -> Option<core::ptr::NonNull<core::ffi::c_void>>;
}

/// The open disposition for [`FileProvider::open_wide`], parsed from a
/// single-character POSIX mode string by the shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

/// Wide-character file opening.
pub trait FileProvider {
    /// A seekable byte stream backed by the host.
    type File: io::Read + io::Write + io::Seek;

    /// Open `path` with the given disposition.
    fn open_wide(&self, path: &WideString, mode: OpenMode) -> Result<Self::File, HostError>;
}

/// The console screen-buffer extent, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleSize {
    pub width: i16,
    pub height: i16,
}

/// An interface to the attached console, if any.
pub trait ConsoleProvider {
    /// The screen-buffer size of the standard output device, or `None` when
    /// no console is attached.
    fn screen_buffer_size(&self) -> Option<ConsoleSize>;

    /// Detach the process from its console. Never fails.
    fn detach_console(&self);
}

/// The three standard-stream handles wired into a spawned child.
#[derive(Debug, Clone, Copy)]
pub struct StdStreams<Handle> {
    pub stdin: Handle,
    pub stdout: Handle,
    pub stderr: Handle,
}

/// A freshly created child process.
///
/// The `handle` owns the host process object; dropping it releases the
/// handle without affecting the process itself.
#[derive(Debug)]
pub struct SpawnedChild<Handle> {
    pub handle: Handle,
    pub pid: u32,
}

/// Child-process creation.
pub trait ProcessProvider {
    /// An owned handle to a child process; released on drop.
    type ProcessHandle;

    /// A host-native stream handle, as produced by the descriptor-translation
    /// collaborator.
    type StreamHandle: Copy;

    /// Create a child running `command_line` with the given standard streams
    /// wired in (handles inherited) and caller-supplied creation flags.
    ///
    /// The child's primary thread handle is released before returning; only
    /// the process handle is surfaced.
    fn create_process(
        &self,
        command_line: &WideString,
        stdio: StdStreams<Self::StreamHandle>,
        flags: u32,
    ) -> Result<SpawnedChild<Self::ProcessHandle>, HostError>;

    /// Forcibly terminate a child. Used only to tear down a child that could
    /// not be handed over for tracking.
    fn terminate_process(&self, handle: &Self::ProcessHandle);
}

/// Process-invocation metadata.
pub trait InvocationProvider {
    /// The wide path of the running program's image.
    fn invocation_path(&self) -> WideString;
}
