// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

#[cfg(feature = "skrifa")]
use skrifa::raw::ReadError;

/// An error returned when creating a scaler.
#[derive(Clone, Debug)]
pub enum Error {
    /// The requested size was negative or not finite.
    InvalidSize(f32),
    /// The font data could not be parsed.
    #[cfg(feature = "skrifa")]
    Read(ReadError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize(size) => write!(f, "invalid font size {size}"),
            #[cfg(feature = "skrifa")]
            Self::Read(err) => write!(f, "failed to read font: {err}"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::InvalidSize(_) => None,
            #[cfg(feature = "skrifa")]
            Self::Read(err) => Some(err),
        }
    }
}

#[cfg(feature = "skrifa")]
impl From<ReadError> for Error {
    fn from(err: ReadError) -> Self {
        Self::Read(err)
    }
}
