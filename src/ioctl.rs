// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Terminal device control, limited to window-size queries.

use crate::host::{ConsoleProvider as _, Provider};
use crate::winposix::WinPosix;

/// Terminal window geometry, as in `struct winsize`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Winsize {
    pub ws_row: u16,
    pub ws_col: u16,
    pub ws_xpixel: u16,
    pub ws_ypixel: u16,
}

/// The device requests this host understands.
#[derive(Debug)]
pub enum DeviceRequest<'req> {
    /// `TIOCGWINSZ`: read the terminal window size.
    GetWindowSize(&'req mut Winsize),
    /// `TIOCSWINSZ`: resize the terminal window.
    SetWindowSize(&'req Winsize),
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum IoctlError {
    /// No console is attached, as for `EINVAL`.
    #[error("no console is attached")]
    InvalidArgument,
    /// The request has no host equivalent, as for `ENOTSUP`.
    #[error("device request not supported")]
    Unsupported,
}

/// Columns held back from the reported width so cursor movement near the
/// right edge does not wrap.
const RESERVED_COLUMNS: i16 = 5;

impl<Host: Provider, Children, Descriptors> WinPosix<Host, Children, Descriptors> {
    /// Performs a terminal device request.
    ///
    /// Pixel dimensions are not tracked by the console, so a fixed 640x480
    /// placeholder is reported.
    pub fn ioctl(&self, request: DeviceRequest<'_>) -> Result<(), IoctlError> {
        match request {
            DeviceRequest::GetWindowSize(winsize) => {
                let size = self
                    .host
                    .screen_buffer_size()
                    .ok_or(IoctlError::InvalidArgument)?;
                winsize.ws_col = (size.width - RESERVED_COLUMNS) as u16;
                winsize.ws_row = size.height as u16;
                winsize.ws_xpixel = 640;
                winsize.ws_ypixel = 480;
                Ok(())
            }
            DeviceRequest::SetWindowSize(_) => Err(IoctlError::Unsupported),
        }
    }
}
