// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Child-process creation and daemonization.

use tracing::{debug, trace};

use crate::encoding::WideString;
use crate::host::{
    ConsoleProvider as _, HostError, ProcessProvider as _, Provider, StdStreams,
};
use crate::winposix::{ChildTracker, DescriptorTable, RawFd, WinPosix};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("could not re-encode the command line for the host")]
    CommandEncoding,
    #[error("host process creation failed: {0}")]
    CreationFailed(HostError),
    /// The tracker refused the child. The child has already been terminated
    /// by the time this is returned; it never runs untracked.
    #[error("spawned child could not be registered for tracking")]
    RegistrationFailed,
}

impl<Host, Children, Descriptors> WinPosix<Host, Children, Descriptors>
where
    Host: Provider,
    Children: ChildTracker<Host>,
    Descriptors: DescriptorTable<Host>,
{
    /// Spawns a child running `command_line` with its standard streams wired
    /// to the given descriptors, and returns the child's pid.
    pub fn spawn_child(
        &self,
        command_line: &str,
        stdin: RawFd,
        stdout: RawFd,
        stderr: RawFd,
        flags: u32,
    ) -> Result<u32, SpawnError> {
        debug!(command_line, stdin, stdout, stderr, flags, "spawning child");
        let wide = WideString::from_utf8(command_line.as_bytes())
            .or(Err(SpawnError::CommandEncoding))?;
        let stdio = StdStreams {
            stdin: self.descriptors.native_handle(stdin),
            stdout: self.descriptors.native_handle(stdout),
            stderr: self.descriptors.native_handle(stderr),
        };
        let child = self
            .host
            .create_process(&wide, stdio, flags)
            .map_err(SpawnError::CreationFailed)?;
        let pid = child.pid;
        if let Err(handle) = self.children.register_child(child.handle, pid) {
            self.host.terminate_process(&handle);
            drop(handle);
            return Err(SpawnError::RegistrationFailed);
        }
        trace!(pid, "child registered");
        Ok(pid)
    }

    /// Detaches the process from its console, the closest host analogue of
    /// forking into the background. Never fails.
    pub fn daemon(&self, _nochdir: bool, _noclose: bool) {
        self.host.detach_console();
    }
}
