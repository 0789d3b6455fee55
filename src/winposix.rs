// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! A module to house all the code for the top-level [`WinPosix`] object.

use std::sync::OnceLock;

use crate::host::{ProcessProvider, Provider};

/// A POSIX descriptor, as seen by callers of this shim.
///
/// Translation to a host-native handle is the descriptor-translation
/// collaborator's job, not ours.
pub type RawFd = i32;

/// The child-tracking collaborator.
///
/// The tracker records spawned children so the surrounding application can
/// reap them later. This crate only registers; it never reaps.
pub trait ChildTracker<Host: ProcessProvider> {
    /// Take ownership of a child's process handle for later lifecycle
    /// tracking.
    ///
    /// On refusal, the handle is handed back by value so the caller can tear
    /// the child down; there is no state in which the child is alive but
    /// owned by nobody.
    fn register_child(
        &self,
        handle: Host::ProcessHandle,
        pid: u32,
    ) -> Result<(), Host::ProcessHandle>;
}

/// The descriptor-translation collaborator.
///
/// Maps a POSIX-style descriptor to the host-native stream handle backing it.
pub trait DescriptorTable<Host: ProcessProvider> {
    fn native_handle(&self, fd: RawFd) -> Host::StreamHandle;
}

/// The full POSIX-compatibility shim.
///
/// This holds the only process-wide state the shim has (the cached program
/// directory) along with the host provider and the external collaborators.
/// The embedding application is expected to create exactly one instance for
/// the lifetime of the process; the directory cache is deliberately never
/// invalidated, since the program's own install path cannot change while it
/// runs.
pub struct WinPosix<Host: Provider + 'static, Children, Descriptors> {
    pub(crate) host: &'static Host,
    pub(crate) children: Children,
    pub(crate) descriptors: Descriptors,
    /// Computed at most once; see [`WinPosix::program_directory`].
    pub(crate) program_dir: OnceLock<String>,
}

impl<Host, Children, Descriptors> WinPosix<Host, Children, Descriptors>
where
    Host: Provider,
    Children: ChildTracker<Host>,
    Descriptors: DescriptorTable<Host>,
{
    /// Create a new shim instance for the given host and collaborators.
    pub fn new(host: &'static Host, children: Children, descriptors: Descriptors) -> Self {
        Self {
            host,
            children,
            descriptors,
            program_dir: OnceLock::new(),
        }
    }
}
