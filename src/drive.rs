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

use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use crate::frame::{self, Frame, FrameError};
use crate::protocol::{ErrorCode, OpenMode, SearchForm};
use crate::response::{classify, unverified_error_code, Classification, ResponseFrame};
use crate::serial::{read_burst, SerialPort};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("no response to {0}")]
    NoResponse(&'static str),

    #[error("drive reported {0}")]
    Drive(ErrorCode),

    #[error("drive reported undocumented error {0:#04x}")]
    UnknownError(u8),
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// How long to wait for the first byte of a reply
    pub timeout: Duration,
    /// Quiet time that ends a reply
    pub gap: Duration,
    /// Reject replies with a bad length or checksum
    pub strict: bool,
    /// Terminate every command with a carriage return
    pub legacy_cr: bool,
    /// Drive status commands sent before giving up on a sleeping drive
    pub wake_attempts: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            timeout: Duration::from_millis(1000),
            gap: Duration::from_millis(30),
            strict: false,
            legacy_cr: false,
            wake_attempts: 3,
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

#[derive(Debug, Clone)]
pub struct Reply {
    pub classification: Classification,
    pub raw: Vec<u8>,
    /// Present when the reply passed length and checksum validation
    pub frame: Option<ResponseFrame>,
}

// ============================================================================
// States
// ============================================================================

pub struct Asleep;
pub struct Ready;

// ============================================================================
// Session Structure
// ============================================================================

pub struct Drive<State> {
    state: PhantomData<State>,
    serial: Box<dyn SerialPort>,
    config: DriveConfig,
}

impl<S> Drive<S> {
    fn transition<T>(self) -> Drive<T> {
        Drive {
            state: PhantomData,
            serial: self.serial,
            config: self.config,
        }
    }

    fn io_error(&self, e: std::io::Error) -> DriveError {
        let type_name = std::any::type_name::<S>();
        let state_name = type_name.split("::").last().unwrap_or(type_name);
        DriveError::Io(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {})", e, state_name)
        ))
    }

    fn send(&mut self, frame: &Frame) -> Result<(), DriveError> {
        let bytes = if self.config.legacy_cr { frame.to_bytes_cr() } else { frame.to_bytes() };
        debug!("Sent: {:02X?}", bytes);
        self.serial.write_all(&bytes).map_err(|e| self.io_error(e))
    }

    fn receive(&mut self) -> Result<Vec<u8>, DriveError> {
        let burst = read_burst(self.serial.as_mut(), self.config.timeout, self.config.gap)
            .map_err(|e| self.io_error(e))?;
        if !burst.is_empty() {
            debug!("Received: {:02X?} ({})", burst, classify(&burst));
        }
        Ok(burst)
    }
}

// ============================================================================
// Asleep
// ============================================================================

impl Drive<Asleep> {
    pub fn new(serial: Box<dyn SerialPort>, config: DriveConfig) -> Self {
        Drive {
            state: PhantomData::<Asleep>,
            serial,
            config,
        }
    }

    /// Send drive status until the drive answers
    ///
    /// The drive dozes off when idle and ignores commands until it is woken.
    pub fn wake(mut self) -> Result<Drive<Ready>, DriveError> {
        let status = frame::drive_status();
        for attempt in 1..=self.config.wake_attempts {
            self.send(&status)?;
            let burst = self.receive()?;
            if !burst.is_empty() {
                info!(attempt, "drive awake");
                return Ok(self.transition());
            }
            debug!(attempt, "no answer to wake-up");
        }
        Err(DriveError::NoResponse("wake-up"))
    }
}

// ============================================================================
// Ready
// ============================================================================

impl Drive<Ready> {
    /// Write one command and collect its reply
    fn transact(&mut self, frame: &Frame, name: &'static str) -> Result<Reply, DriveError> {
        self.send(frame)?;
        let raw = self.receive()?;
        if raw.is_empty() {
            return Err(DriveError::NoResponse(name));
        }

        let classification = classify(&raw);
        let frame = match ResponseFrame::parse(&raw) {
            Ok(frame) => Some(frame),
            Err(e) if self.config.strict => return Err(e.into()),
            Err(e) => {
                warn!("{} reply failed validation: {}", name, e);
                match unverified_error_code(&raw) {
                    Some(Ok(ErrorCode::NoError)) | None => {}
                    Some(Ok(code)) => warn!("{} reply carries error {}", name, code),
                    Some(Err(byte)) => warn!("{} reply carries undocumented error {:#04x}", name, byte),
                }
                None
            }
        };

        match frame.as_ref().and_then(ResponseFrame::error_code) {
            Some(Ok(ErrorCode::NoError)) | None => {}
            Some(Ok(code)) => return Err(DriveError::Drive(code)),
            Some(Err(byte)) => return Err(DriveError::UnknownError(byte)),
        }

        Ok(Reply { classification, raw, frame })
    }

    pub fn status(&mut self) -> Result<Reply, DriveError> {
        self.transact(&frame::drive_status(), "drive status")
    }

    pub fn condition(&mut self) -> Result<Reply, DriveError> {
        self.transact(&frame::drive_condition(), "drive condition")
    }

    pub fn directory(&mut self, form: SearchForm, filename: &str) -> Result<Reply, DriveError> {
        let command = frame::directory(form, filename)?;
        self.transact(&command, "directory")
    }

    /// Reference `filename`, then open it
    pub fn open(&mut self, filename: &str, mode: OpenMode) -> Result<Reply, DriveError> {
        self.directory(SearchForm::Reference, filename)?;
        self.transact(&frame::open(mode), "open")
    }

    pub fn close(&mut self) -> Result<Reply, DriveError> {
        self.transact(&frame::close(), "close")
    }

    pub fn format(&mut self) -> Result<Reply, DriveError> {
        self.transact(&frame::format(), "format")
    }

    /// Reference `filename`, then delete it
    pub fn erase(&mut self, filename: &str) -> Result<Reply, DriveError> {
        self.directory(SearchForm::Reference, filename)?;
        self.transact(&frame::erase(), "erase")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::checksum;
    use crate::response::ResponseKind;
    use crate::serial::MockSerialPort;

    const STATUS: [u8; 5] = [0x5A, 0x5A, 0x07, 0x00, 0xF8];
    const OK: [u8; 4] = [0x12, 0x01, 0x00, 0xEC];

    fn reply(code: u8, data: &[u8]) -> Vec<u8> {
        let mut v = vec![code, data.len() as u8];
        v.extend_from_slice(data);
        v.push(checksum(&v));
        v
    }

    fn dir_entry(name: &str) -> Vec<u8> {
        let mut data = name.as_bytes().to_vec();
        data.resize(24, b' ');
        data.push(b'F');
        data.extend_from_slice(&[0x00, 0x40, 0x50]);
        reply(0x11, &data)
    }

    fn concat(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    fn ready(mock: MockSerialPort, config: DriveConfig) -> Drive<Ready> {
        Drive::new(Box::new(mock), config).wake().expect("drive should wake")
    }

    #[test]
    fn test_wake_first_try() {
        let mock = MockSerialPort::with_replies(&[&OK], STATUS.to_vec());
        let _drive = ready(mock, DriveConfig::default());
    }

    #[test]
    fn test_wake_retry() {
        let mut responses = vec![None];
        responses.extend(OK.iter().map(|&b| Some(b)));
        responses.push(None);
        let mock = MockSerialPort::new(responses, concat(&[&STATUS, &STATUS]));
        let _drive = ready(mock, DriveConfig::default());
    }

    #[test]
    fn test_wake_gives_up() {
        let mock = MockSerialPort::new(vec![None, None], concat(&[&STATUS, &STATUS]));
        let config = DriveConfig { wake_attempts: 2, ..DriveConfig::default() };
        let result = Drive::new(Box::new(mock), config).wake();
        assert!(matches!(result, Err(DriveError::NoResponse("wake-up"))));
    }

    #[test]
    fn test_condition() {
        let condition = reply(0x15, &[0x00]);
        let mock = MockSerialPort::with_replies(
            &[&OK, &condition],
            concat(&[&STATUS, &[0x5A, 0x5A, 0x0C, 0x00, 0xF3]]),
        );
        let mut drive = ready(mock, DriveConfig::default());

        let reply = drive.condition().unwrap();
        assert_eq!(reply.classification, Classification::Known(ResponseKind::DriveCondition));
        assert_eq!(reply.raw, condition);
        assert_eq!(reply.frame.unwrap().data(), &[0x00]);
    }

    #[test]
    fn test_status_drive_error() {
        let no_disk = reply(0x12, &[0x70]);
        let mock = MockSerialPort::with_replies(&[&OK, &no_disk], concat(&[&STATUS, &STATUS]));
        let mut drive = ready(mock, DriveConfig::default());

        let result = drive.status();
        assert!(matches!(result, Err(DriveError::Drive(ErrorCode::NoDisk))));
    }

    #[test]
    fn test_undocumented_error_byte() {
        let odd = reply(0x12, &[0x99]);
        let mock = MockSerialPort::with_replies(&[&OK, &odd], concat(&[&STATUS, &STATUS]));
        let mut drive = ready(mock, DriveConfig::default());

        assert!(matches!(drive.status(), Err(DriveError::UnknownError(0x99))));
    }

    #[test]
    fn test_no_response() {
        let mut responses: Vec<Option<u8>> = OK.iter().map(|&b| Some(b)).collect();
        responses.push(None);
        responses.push(None);
        let mock = MockSerialPort::new(responses, concat(&[&STATUS, &frame::close().to_bytes()]));
        let mut drive = ready(mock, DriveConfig::default());

        assert!(matches!(drive.close(), Err(DriveError::NoResponse("close"))));
    }

    #[test]
    fn test_tolerant_checksum_mismatch() {
        let bad: [u8; 4] = [0x12, 0x01, 0x00, 0x00];
        let mock = MockSerialPort::with_replies(&[&OK, &bad], concat(&[&STATUS, &STATUS]));
        let mut drive = ready(mock, DriveConfig::default());

        let reply = drive.status().unwrap();
        assert_eq!(reply.classification, Classification::Known(ResponseKind::Generic));
        assert!(reply.frame.is_none());
    }

    #[test]
    fn test_tolerant_mismatch_keeps_raw_error_byte() {
        let bad: [u8; 4] = [0x12, 0x01, 0x70, 0x00];
        let mock = MockSerialPort::with_replies(&[&OK, &bad], concat(&[&STATUS, &STATUS]));
        let mut drive = ready(mock, DriveConfig::default());

        // Returned unvalidated; the error byte is only logged
        let reply = drive.status().unwrap();
        assert!(reply.frame.is_none());
        assert_eq!(unverified_error_code(&reply.raw), Some(Ok(ErrorCode::NoDisk)));
    }

    #[test]
    fn test_serial_error_converts() {
        let err: DriveError = serialport::Error::new(serialport::ErrorKind::NoDevice, "no such port").into();
        assert!(matches!(err, DriveError::Serial(_)));
        assert_eq!(err.to_string(), "serial port error: no such port");
    }

    #[test]
    fn test_strict_checksum_mismatch() {
        let bad: [u8; 4] = [0x12, 0x01, 0x00, 0x00];
        let mock = MockSerialPort::with_replies(&[&OK, &bad], concat(&[&STATUS, &STATUS]));
        let config = DriveConfig { strict: true, ..DriveConfig::default() };
        let mut drive = ready(mock, config);

        let result = drive.status();
        assert!(matches!(
            result,
            Err(DriveError::Frame(FrameError::ChecksumMismatch { expected: 0xEC, found: 0x00 }))
        ));
    }

    #[test]
    fn test_unrecognized_reply_is_data() {
        let odd = reply(0x99, &[]);
        let mock = MockSerialPort::with_replies(&[&OK, &odd], concat(&[&STATUS, &STATUS]));
        let mut drive = ready(mock, DriveConfig::default());

        let reply = drive.status().unwrap();
        assert_eq!(reply.classification, Classification::Unrecognized(0x99));
    }

    #[test]
    fn test_directory_first() {
        let entry = dir_entry("HELLO.BA");
        let dir1 = frame::directory(SearchForm::First, "").unwrap().to_bytes();
        let mock = MockSerialPort::with_replies(&[&OK, &entry], concat(&[&STATUS, &dir1]));
        let mut drive = ready(mock, DriveConfig::default());

        let reply = drive.directory(SearchForm::First, "").unwrap();
        assert_eq!(reply.classification, Classification::Known(ResponseKind::DirectoryMore));
        assert_eq!(&reply.frame.unwrap().data()[..8], b"HELLO.BA");
    }

    #[test]
    fn test_directory_filename_too_long() {
        let mock = MockSerialPort::with_replies(&[&OK], STATUS.to_vec());
        let mut drive = ready(mock, DriveConfig::default());

        let result = drive.directory(SearchForm::Reference, &"X".repeat(25));
        assert!(matches!(result, Err(DriveError::Frame(FrameError::InvalidFilename(25)))));
    }

    #[test]
    fn test_open_references_then_opens() {
        let entry = dir_entry("DATA.DO");
        let reference = frame::directory(SearchForm::Reference, "DATA.DO").unwrap().to_bytes();
        let open = frame::open(OpenMode::Read).to_bytes();
        let mock = MockSerialPort::with_replies(
            &[&OK, &entry, &OK],
            concat(&[&STATUS, &reference, &open]),
        );
        let mut drive = ready(mock, DriveConfig::default());

        let reply = drive.open("DATA.DO", OpenMode::Read).unwrap();
        assert_eq!(reply.classification, Classification::Known(ResponseKind::Generic));
    }

    #[test]
    fn test_erase_missing_file() {
        let entry = dir_entry("");
        let reference = frame::directory(SearchForm::Reference, "GONE.DO").unwrap().to_bytes();
        let not_found = reply(0x12, &[0x10]);
        let mock = MockSerialPort::with_replies(
            &[&OK, &entry, &not_found],
            concat(&[&STATUS, &reference, &[0x5A, 0x5A, 0x05, 0x00, 0xFA]]),
        );
        let mut drive = ready(mock, DriveConfig::default());

        assert!(matches!(drive.erase("GONE.DO"), Err(DriveError::Drive(ErrorCode::FileNotFound))));
    }

    #[test]
    fn test_legacy_cr() {
        let mock = MockSerialPort::with_replies(
            &[&OK, &OK],
            concat(&[&[0x5A, 0x5A, 0x07, 0x00, 0xF8, 0x0D], &[0x5A, 0x5A, 0x06, 0x00, 0xF9, 0x0D]]),
        );
        let config = DriveConfig { legacy_cr: true, ..DriveConfig::default() };
        let mut drive = ready(mock, config);

        let reply = drive.format().unwrap();
        assert_eq!(reply.raw, OK.to_vec());
    }

    #[test]
    fn test_io_error_names_state() {
        let mock = MockSerialPort::new(vec![], vec![]);
        let drive = Drive::new(Box::new(mock), DriveConfig::default());
        let err = drive.io_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(err.to_string(), "I/O error: gone (in state: Asleep)");
    }
}
