// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The bridge between UTF-8 and the host's native wide-character encoding.
//!
//! Every path- and command-line-handling routine in this crate funnels
//! through here. Conversions are all-or-nothing: a failure yields an error
//! and no buffer, never a partially populated one.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConversionError {
    #[error("input is not valid UTF-8")]
    InvalidUtf8,
    #[error("input is not valid UTF-16")]
    InvalidUtf16,
}

/// An owned, NUL-terminated UTF-16 string, sized exactly to its content plus
/// the terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideString {
    /// Code units, including the trailing NUL.
    units: Vec<u16>,
}

impl WideString {
    /// Convert a UTF-8 byte string to the host's wide representation.
    ///
    /// Malformed UTF-8 is rejected outright; nothing is allocated on failure.
    pub fn from_utf8(bytes: &[u8]) -> Result<Self, ConversionError> {
        let text = core::str::from_utf8(bytes).or(Err(ConversionError::InvalidUtf8))?;
        Ok(Self::from(text))
    }

    /// Wrap raw UTF-16 code units handed back by a host API.
    ///
    /// The units are not validated; [`utf16_to_utf8`] is where validation
    /// happens on the way back out.
    pub fn from_units(mut units: Vec<u16>) -> Self {
        units.push(0);
        WideString { units }
    }

    /// The code units without the trailing NUL.
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.units.len() - 1]
    }

    /// The code units including the trailing NUL, for handing to host APIs
    /// that expect a NUL-terminated wide string.
    pub fn as_units_with_nul(&self) -> &[u16] {
        &self.units
    }
}

impl From<&str> for WideString {
    fn from(text: &str) -> Self {
        let mut units: Vec<u16> = text.encode_utf16().collect();
        units.push(0);
        WideString { units }
    }
}

/// Convert host wide code units back to an owned UTF-8 string.
///
/// Unpaired surrogates are rejected; nothing is allocated on failure beyond
/// what is immediately dropped.
pub fn utf16_to_utf8(units: &[u16]) -> Result<String, ConversionError> {
    char::decode_utf16(units.iter().copied())
        .collect::<Result<String, _>>()
        .or(Err(ConversionError::InvalidUtf16))
}
