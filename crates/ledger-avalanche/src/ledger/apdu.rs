//! APDU command and response types.
//!
//! This module provides the frame codec used for every exchange with the
//! Avalanche app.
//!
//! # Command Structure
//!
//! ```text
//! | CLA | INS | P1 | P2 | LEN | Data |
//! |-----|-----|----|----|-----|------|
//! | 1B  | 1B  | 1B | 1B | 1B  | LEN  |
//! ```
//!
//! The length byte is always present, also for commands without data.
//! Payloads longer than 255 bytes are never framed; the signing session
//! splits them into chunks first.
//!
//! # Response Structure
//!
//! ```text
//! | Data | SW1 | SW2 |
//! |------|-----|-----|
//! | Var  | 1B  | 1B  |
//! ```
//!
//! # Example
//!
//! ```
//! use ledger_avalanche::ledger::{Command, Response};
//!
//! let command = Command::new(0x80, 0x00, 0x00, 0x00, vec![]).unwrap();
//! assert_eq!(command.to_bytes(), vec![0x80, 0x00, 0x00, 0x00, 0x00]);
//!
//! let response = Response::from_bytes(vec![0x00, 0x00, 0x06, 0x05, 0x90, 0x00]).unwrap();
//! assert!(response.is_success());
//! assert_eq!(response.data(), &[0x00, 0x00, 0x06, 0x05]);
//! ```

use super::status::StatusWord;
use crate::error::{Error, Result};

/// An APDU command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Class byte.
    cla: u8,

    /// Instruction byte.
    ins: u8,

    /// Parameter 1.
    p1: u8,

    /// Parameter 2.
    p2: u8,

    /// Command data, at most [`Self::MAX_DATA`] bytes.
    data: Vec<u8>,
}

impl Command {
    /// Maximum data length expressible in the length byte.
    pub const MAX_DATA: usize = 255;

    /// Length of the fixed header, length byte included.
    pub const HEADER_LEN: usize = 5;

    /// Creates a new command.
    ///
    /// # Arguments
    ///
    /// * `cla` - Class byte
    /// * `ins` - Instruction byte
    /// * `p1` - Parameter 1
    /// * `p2` - Parameter 2
    /// * `data` - Command data, at most 255 bytes
    ///
    /// # Returns
    ///
    /// A [`Command`] whose length byte is derived from `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLong`] if `data` is longer than 255 bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use ledger_avalanche::ledger::Command;
    ///
    /// let command = Command::new(0x80, 0x02, 0x01, 0x00, vec![0x04]).unwrap();
    /// assert_eq!(command.to_bytes(), vec![0x80, 0x02, 0x01, 0x00, 0x01, 0x04]);
    ///
    /// assert!(Command::new(0x80, 0x05, 0x01, 0x00, vec![0; 256]).is_err());
    /// ```
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Result<Self> {
        if data.len() > Self::MAX_DATA {
            return Err(Error::PayloadTooLong(data.len()));
        }
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
        })
    }

    /// Returns the class byte.
    #[must_use]
    pub const fn cla(&self) -> u8 {
        self.cla
    }

    /// Returns the instruction byte.
    #[must_use]
    pub const fn ins(&self) -> u8 {
        self.ins
    }

    /// Returns parameter 1.
    #[must_use]
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Returns parameter 2.
    #[must_use]
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Returns the command data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serializes the command to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::HEADER_LEN + self.data.len());
        bytes.push(self.cla);
        bytes.push(self.ins);
        bytes.push(self.p1);
        bytes.push(self.p2);
        // `new` guarantees the length fits.
        #[expect(clippy::cast_possible_truncation, reason = "length checked in new")]
        bytes.push(self.data.len() as u8);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

/// Frames a payload into command bytes.
///
/// # Errors
///
/// Returns [`Error::PayloadTooLong`] if `payload` is longer than 255 bytes.
pub fn build_frame(cla: u8, ins: u8, p1: u8, p2: u8, payload: &[u8]) -> Result<Vec<u8>> {
    Command::new(cla, ins, p1, p2, payload.to_vec()).map(|command| command.to_bytes())
}

/// An APDU response from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response data.
    data: Vec<u8>,

    /// Raw status word.
    status: u16,
}

impl Response {
    /// Parses a raw response (data followed by a big-endian status word).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if `bytes` is shorter than the
    /// status word.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self> {
        let len = bytes.len();
        if len < 2 {
            return Err(Error::MalformedResponse(format!(
                "response of {len} bytes has no status word"
            )));
        }

        let status = u16::from_be_bytes([bytes[len - 2], bytes[len - 1]]);
        bytes.truncate(len - 2);

        Ok(Self {
            data: bytes,
            status,
        })
    }

    /// Returns the response data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the response and returns the data.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the raw status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the classified status word.
    #[must_use]
    pub const fn status_word(&self) -> StatusWord {
        StatusWord::from_u16(self.status)
    }

    /// Checks if the response indicates success (`SW = 0x9000`).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_word().is_success()
    }

    /// Returns the data interpreted as text, for display only.
    #[must_use]
    pub fn diagnostic_text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Checks the response status and returns an error if not successful.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] carrying the status word.
    pub const fn check(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Error::Device(self.status_word()))
        }
    }
}

/// Splits raw response bytes into body and status code.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] if `bytes` is shorter than 2 bytes.
pub fn parse_status(bytes: &[u8]) -> Result<(&[u8], u16)> {
    match bytes {
        [body @ .., sw1, sw2] => Ok((body, u16::from_be_bytes([*sw1, *sw2]))),
        _ => Err(Error::MalformedResponse(format!(
            "response of {} bytes has no status word",
            bytes.len()
        ))),
    }
}
