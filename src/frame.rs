// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Command frame encoding
//!
//! ```text
//!   2    1     1      len    1
//! +----+----+------+------+------+
//! |5a5a|type|length| data |chksum|
//! +----+----+------+------+------+
//! ```

use thiserror::Error;
use crate::protocol::*;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("filename is {0} bytes, at most 24 allowed")]
    InvalidFilename(usize),

    #[error("invalid search form {0:#04x}")]
    InvalidSearchForm(u8),

    #[error("response truncated ({0} bytes)")]
    Truncated(usize),

    #[error("response declares {declared} data bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    ChecksumMismatch { expected: u8, found: u8 },
}

// ============================================================================
// Checksum
// ============================================================================

/// One's complement of the low byte of the sum of `bytes`
///
/// Covers request type, length and data; never the preamble or the checksum
/// byte itself.
pub fn checksum(bytes: &[u8]) -> u8 {
    // Wrapping at 8 bits is the same as taking the sum mod 256
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) ^ 0xFF
}

// ============================================================================
// Frame
// ============================================================================

/// An outbound command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    request: u8,
    data: Vec<u8>,
}

impl Frame {
    fn new(request: u8, data: Vec<u8>) -> Self {
        debug_assert!(data.len() <= u8::MAX as usize);
        Frame { request, data }
    }

    pub fn request(&self) -> u8 {
        self.request
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn checksum(&self) -> u8 {
        let mut body = Vec::with_capacity(self.data.len() + 2);
        body.push(self.request);
        body.push(self.data.len() as u8);
        body.extend_from_slice(&self.data);
        checksum(&body)
    }

    /// Wire bytes, preamble through checksum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 5);
        out.extend_from_slice(&PREAMBLE);
        out.push(self.request);
        out.push(self.data.len() as u8);
        out.extend_from_slice(&self.data);
        out.push(self.checksum());
        out
    }

    /// Wire bytes followed by a carriage return, as the BASIC drivers sent them
    pub fn to_bytes_cr(&self) -> Vec<u8> {
        let mut out = self.to_bytes();
        out.push(CR);
        out
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Frame with no data field
pub fn simple_command(request: RequestType) -> Frame {
    Frame::new(request.code(), Vec::new())
}

pub fn drive_status() -> Frame {
    simple_command(RequestType::DriveStatus)
}

pub fn drive_condition() -> Frame {
    simple_command(RequestType::DriveCondition)
}

pub fn close() -> Frame {
    simple_command(RequestType::CloseFile)
}

pub fn format() -> Frame {
    simple_command(RequestType::FormatDisk)
}

pub fn erase() -> Frame {
    simple_command(RequestType::DeleteFile)
}

/// Directory search request
///
/// ```text
///   2    1  1      24          1           1         1
/// +----+--+--+------------+---------+-----------+------+
/// |5a5a|00|1a|  filename  |attribute|search form|chksum|
/// +----+--+--+------------+---------+-----------+------+
/// ```
pub fn directory(form: SearchForm, filename: &str) -> Result<Frame, FrameError> {
    let name = filename.as_bytes();
    if name.len() > FILENAME_LEN {
        return Err(FrameError::InvalidFilename(name.len()));
    }

    let mut data = Vec::with_capacity(FILENAME_LEN + 2);
    data.extend_from_slice(name);
    data.resize(FILENAME_LEN, b' ');
    data.push(ATTRIBUTE);
    data.push(form as u8);

    Ok(Frame::new(RequestType::Directory.code(), data))
}

/// Directory search request from a raw search form byte
pub fn directory_raw(form: u8, filename: &str) -> Result<Frame, FrameError> {
    let form = SearchForm::try_from(form).map_err(FrameError::InvalidSearchForm)?;
    directory(form, filename)
}

/// Open the file last referenced with `SearchForm::Reference`
pub fn open(mode: OpenMode) -> Frame {
    Frame::new(RequestType::OpenFile.code(), vec![mode as u8])
}

// ============================================================================
// Tests
// ============================================================================
