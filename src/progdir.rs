// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Directory holding the running executable.

use crate::encoding::{self, ConversionError};
use crate::host::{InvocationProvider as _, Provider};
use crate::winposix::WinPosix;

impl<Host: Provider, Children, Descriptors> WinPosix<Host, Children, Descriptors> {
    /// Returns the directory component of the running executable's path,
    /// cached after the first successful call.
    ///
    /// A path with no directory separator, including the empty path, maps to
    /// the current directory `"."`. Conversion failures are not cached, so a
    /// later call retries.
    pub fn program_directory(&self) -> Result<&str, ConversionError> {
        if let Some(cached) = self.program_dir.get() {
            return Ok(cached);
        }
        let full = encoding::utf16_to_utf8(self.host.invocation_path().as_units())?;
        let dir = match full.rfind(['\\', '/']) {
            Some(pos) if pos > 0 => full[..pos].to_string(),
            _ => ".".to_string(),
        };
        // Concurrent first calls compute the same value, so whichever
        // initializer wins is fine.
        Ok(self.program_dir.get_or_init(|| dir))
    }
}
