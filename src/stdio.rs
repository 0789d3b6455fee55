// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! `fopen`-style file opening with transparent UTF-8 BOM handling.

use std::io::{Read as _, Seek as _, SeekFrom};

use tracing::debug;

use crate::encoding::{ConversionError, WideString};
use crate::host::{FileProvider as _, HostError, OpenMode, Provider};
use crate::winposix::WinPosix;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum OpenError {
    /// Only the plain single-character modes "r", "w", and "a" are accepted.
    #[error("unsupported open mode")]
    UnsupportedMode,
    #[error(transparent)]
    Encoding(#[from] ConversionError),
    #[error("host open failed: {0}")]
    Host(HostError),
}

fn parse_mode(mode: &str) -> Option<OpenMode> {
    match mode {
        "r" => Some(OpenMode::Read),
        "w" => Some(OpenMode::Write),
        "a" => Some(OpenMode::Append),
        _ => None,
    }
}

impl<Host: Provider, Children, Descriptors> WinPosix<Host, Children, Descriptors> {
    /// Opens `path` in the given stdio mode.
    ///
    /// A UTF-8 BOM at the start of a file opened for reading is consumed, so
    /// the first read starts past it. Nothing is ever written in its place;
    /// files this crate creates carry no BOM.
    pub fn fopen(&self, path: &str, mode: &str) -> Result<Host::File, OpenError> {
        let mode = parse_mode(mode).ok_or(OpenError::UnsupportedMode)?;
        let wide = WideString::from_utf8(path.as_bytes())?;
        let mut file = self.host.open_wide(&wide, mode).map_err(|code| {
            debug!(path, %code, "host open failed");
            OpenError::Host(code)
        })?;
        match mode {
            OpenMode::Read => {
                let mut head = [0u8; 3];
                let bom = file.read_exact(&mut head).is_ok() && head == UTF8_BOM;
                if !bom {
                    // Short or BOM-less file; hand back the whole stream.
                    let _ = file.seek(SeekFrom::Start(0));
                }
            }
            OpenMode::Write => {
                let _ = file.seek(SeekFrom::Start(0));
            }
            OpenMode::Append => {}
        }
        Ok(file)
    }
}
