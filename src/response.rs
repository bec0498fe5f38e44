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

//! Response classification and validation
//!
//! ```text
//!   1     1      len    1
//! +----+------+------+------+
//! |type|length| data |chksum|
//! +----+------+------+------+
//! ```

use std::fmt;
use crate::frame::{checksum, FrameError};
use crate::protocol::{return_type, ErrorCode};

// ============================================================================
// Classification
// ============================================================================

/// Known reply kinds, keyed by the first byte of the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    ReadFileMore,
    DirectoryMore,
    /// Shared by open, close, read, write, delete, format, drive status,
    /// rename and the final directory reply
    Generic,
    DriveCondition,
}

const DISPATCH: [(u8, ResponseKind); 4] = [
    (return_type::READ_FILE_MORE, ResponseKind::ReadFileMore),
    (return_type::DIRECTORY_MORE, ResponseKind::DirectoryMore),
    (return_type::GENERIC, ResponseKind::Generic),
    (return_type::DRIVE_CONDITION, ResponseKind::DriveCondition),
];

impl ResponseKind {
    pub fn from_code(code: u8) -> Option<Self> {
        DISPATCH
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, kind)| *kind)
    }

    pub fn code(self) -> u8 {
        match self {
            ResponseKind::ReadFileMore => return_type::READ_FILE_MORE,
            ResponseKind::DirectoryMore => return_type::DIRECTORY_MORE,
            ResponseKind::Generic => return_type::GENERIC,
            ResponseKind::DriveCondition => return_type::DRIVE_CONDITION,
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseKind::ReadFileMore => "READ_FILE_MORE",
            ResponseKind::DirectoryMore => "DIRECTORY_MORE",
            ResponseKind::Generic => "GENERIC",
            ResponseKind::DriveCondition => "DRIVE_CONDITION",
        };
        write!(f, "{} ({:02X})", name, self.code())
    }
}

/// What a received buffer turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Nothing received yet
    Empty,
    Known(ResponseKind),
    /// Leading byte outside the dispatch table
    Unrecognized(u8),
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Empty => write!(f, "empty"),
            Classification::Known(kind) => write!(f, "{}", kind),
            Classification::Unrecognized(code) => write!(f, "unrecognized ({:02X})", code),
        }
    }
}

/// Identify a reply by its leading byte
///
/// Does not look at the length or checksum; see [`ResponseFrame::parse`].
pub fn classify(buffer: &[u8]) -> Classification {
    match buffer.first() {
        None => Classification::Empty,
        Some(&code) => match ResponseKind::from_code(code) {
            Some(kind) => Classification::Known(kind),
            None => Classification::Unrecognized(code),
        },
    }
}

// ============================================================================
// Validated Frame
// ============================================================================

/// A reply whose length and checksum have been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    code: u8,
    data: Vec<u8>,
}

impl ResponseFrame {
    /// Validate `buffer` as one complete reply
    ///
    /// Bytes past the checksum are rejected as a length mismatch; the
    /// transport hands over one reply per burst.
    pub fn parse(buffer: &[u8]) -> Result<Self, FrameError> {
        if buffer.len() < 3 {
            return Err(FrameError::Truncated(buffer.len()));
        }

        let declared = buffer[1] as usize;
        let actual = buffer.len() - 3;
        if declared != actual {
            return Err(FrameError::LengthMismatch { declared, actual });
        }

        let (body, trailer) = buffer.split_at(buffer.len() - 1);
        let expected = checksum(body);
        let found = trailer[0];
        if expected != found {
            return Err(FrameError::ChecksumMismatch { expected, found });
        }

        Ok(ResponseFrame {
            code: buffer[0],
            data: body[2..].to_vec(),
        })
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn classification(&self) -> Classification {
        classify(&[self.code])
    }

    /// Error byte of a one-byte generic reply
    ///
    /// `Err` carries a byte outside the documented table.
    pub fn error_code(&self) -> Option<Result<ErrorCode, u8>> {
        if self.code != return_type::GENERIC || self.data.len() != 1 {
            return None;
        }
        let byte = self.data[0];
        Some(ErrorCode::from_byte(byte).ok_or(byte))
    }
}

/// Error byte of a buffer shaped like `12 01 xx ..`, without validation
///
/// For replies that failed [`ResponseFrame::parse`] but still carry a
/// readable error byte.
pub fn unverified_error_code(buffer: &[u8]) -> Option<Result<ErrorCode, u8>> {
    match buffer {
        [return_type::GENERIC, 0x01, byte, ..] => Some(ErrorCode::from_byte(*byte).ok_or(*byte)),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
