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

//! TPDD Base Protocol constants (operation mode)

use std::fmt;

/// Preamble - opens every command frame ("ZZ")
pub const PREAMBLE: [u8; 2] = [0x5A, 0x5A];

/// Carriage return appended by the legacy BASIC command strings
pub const CR: u8 = 0x0D;

/// Width of the filename field in a directory command
pub const FILENAME_LEN: usize = 24;

/// Attribute byte sent with directory commands ('F')
pub const ATTRIBUTE: u8 = b'F';

/// Longest possible reply: type, length, 255 data bytes, checksum
pub const MAX_REPLY_LEN: usize = 1 + 1 + 255 + 1;

// ============================================================================
// Request Types
// ============================================================================

/// Request block format codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestType {
    Directory = 0x00,
    OpenFile = 0x01,
    CloseFile = 0x02,
    ReadFile = 0x03,
    WriteFile = 0x04,
    /// Also sent as the standalone "erase" command
    DeleteFile = 0x05,
    FormatDisk = 0x06,
    DriveStatus = 0x07,
    DriveCondition = 0x0C,
    RenameFile = 0x0D,
}

impl RequestType {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Return type the drive answers this request with when it succeeds
    pub fn success_code(self) -> u8 {
        match self {
            RequestType::DriveCondition => return_type::DRIVE_CONDITION,
            RequestType::Directory => return_type::DIRECTORY_MORE,
            _ => return_type::GENERIC,
        }
    }
}

// ============================================================================
// Return Types
// ============================================================================

/// Return block format codes (first byte of every reply)
pub mod return_type {
    /// More read data follows; 0x12 once reading is finished
    pub const READ_FILE_MORE: u8 = 0x10;

    /// Directory entry; more may follow
    pub const DIRECTORY_MORE: u8 = 0x11;

    /// Open, close, read, write, delete, format, status, rename and the final
    /// directory reply all share this code
    pub const GENERIC: u8 = 0x12;

    /// Drive condition
    pub const DRIVE_CONDITION: u8 = 0x15;
}

// ============================================================================
// Search Forms
// ============================================================================

/// Directory search form byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SearchForm {
    /// Reference a file for open or delete
    Reference = 0x00,
    First = 0x01,
    Next = 0x02,
    Previous = 0x03,
    /// End directory reference
    End = 0x04,
}

impl TryFrom<u8> for SearchForm {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(SearchForm::Reference),
            0x01 => Ok(SearchForm::First),
            0x02 => Ok(SearchForm::Next),
            0x03 => Ok(SearchForm::Previous),
            0x04 => Ok(SearchForm::End),
            other => Err(other),
        }
    }
}

// ============================================================================
// Open Modes
// ============================================================================

/// Access mode byte of an open request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpenMode {
    WriteNew = 0x01,
    WriteAppend = 0x02,
    Read = 0x03,
}

// ============================================================================
// Error Codes
// ============================================================================

macro_rules! error_codes {
    ($($name:ident = $code:literal => $text:literal,)*) => {
        /// Error byte carried in a 0x12 reply
        ///
        /// ```text
        ///  1  1  1     1
        /// +--+--+-----+-----+
        /// |12|01|error|cksum|
        /// +--+--+-----+-----+
        /// ```
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum ErrorCode {
            $($name = $code,)*
        }

        impl ErrorCode {
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($code => Some(ErrorCode::$name),)*
                    _ => None,
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $(ErrorCode::$name => $text,)*
                }
            }
        }
    };
}

error_codes! {
    NoError = 0x00 => "no error",
    FileNotFound = 0x10 => "file not found",
    FileExists = 0x11 => "file exists",
    NoFilename = 0x30 => "no filename",
    DirectorySearchError = 0x31 => "directory search error",
    BankError = 0x35 => "bank error",
    ParameterError = 0x36 => "parameter error",
    OpenFormatMismatch = 0x37 => "open format mismatch",
    EndOfFile = 0x3F => "end of file",
    NoStartMark = 0x40 => "no start mark",
    CrcCheckErrorInId = 0x41 => "CRC check error in ID",
    SectorLengthError = 0x42 => "sector length error",
    FormatVerifyError = 0x44 => "format verify error",
    FormatInterruption = 0x46 => "format interruption",
    EraseOffsetError = 0x47 => "erase offset error",
    CrcCheckErrorInData = 0x49 => "CRC check error in data",
    SectorNumberError = 0x4A => "sector number error",
    ReadDataTimeout = 0x4B => "read data timeout",
    SectorNumberError2 = 0x4D => "sector number error",
    DiskWriteProtect = 0x50 => "disk write protected",
    UninitializedDisk = 0x5E => "uninitialized disk",
    DirectoryFull = 0x60 => "directory full",
    DiskFull = 0x61 => "disk full",
    FileTooLong = 0x6E => "file too long",
    NoDisk = 0x70 => "no disk",
    DiskChangeError = 0x71 => "disk change error",
}

impl ErrorCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:02X})", self.description(), self.code())
    }
}
