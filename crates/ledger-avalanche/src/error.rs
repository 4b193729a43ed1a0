//! Error types for the Avalanche Ledger driver.
//!
//! This module provides a single error type [`enum@Error`] covering every
//! failure mode of talking to the Avalanche app, plus an [`ErrorKind`]
//! classification that groups the variants into the categories callers
//! usually branch on.
//!
//! # Error Categories
//!
//! - **Transport errors**: the exchange with the device itself failed
//! - **Input errors**: a path, prefix or chain id was rejected before any
//!   frame was sent
//! - **Device errors**: the app answered with a non-success status word
//! - **Version errors**: the running app is older than the configured minimum
//!
//! # Example
//!
//! ```
//! use ledger_avalanche::{Error, ErrorKind};
//!
//! let err = Error::PrefixTooLong(90);
//! assert_eq!(err.kind(), ErrorKind::InvalidInput);
//! ```

use core::result::Result as CoreResult;
use std::io::Error as IoError;

use hex::FromHexError;
use thiserror::Error;
use toml::de::Error as TomlError;

use crate::ledger::status::StatusWord;
use crate::version::VersionInfo;

/// The main error type for the Avalanche Ledger driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// No device was found at the requested index.
    #[error("no Ledger device found")]
    DeviceNotFound,

    /// The underlying exchange with the device failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The device rejected the class byte, which means the app is not running.
    #[error("are you sure the Avalanche app is open?")]
    AppNotOpen,

    // =========================================================================
    // Framing Errors
    // =========================================================================
    /// A command payload does not fit the one-byte length field.
    #[error("command payload of {0} bytes exceeds 255 bytes")]
    PayloadTooLong(usize),

    /// The response from the device was shorter than the operation requires.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// A derivation path or path suffix is malformed.
    #[error("invalid path: {0}")]
    InvalidPathFormat(String),

    /// The human-readable prefix is longer than 83 bytes.
    #[error("hrp len should be < 83 chars, got {0}")]
    PrefixTooLong(usize),

    /// The chain identifier is malformed.
    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    /// More distinct paths than fit in the one-byte path count.
    #[error("too many paths: {0} (at most 255)")]
    TooManyPaths(usize),

    /// A hash handed to the hash signing flow is not 32 bytes.
    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    // =========================================================================
    // Device Errors
    // =========================================================================
    /// The device answered with a non-success status word.
    #[error("device returned {0}")]
    Device(StatusWord),

    /// The device rejected the transaction and explained why.
    #[error("{0}")]
    DeviceMessage(String),

    /// The device refused to start a signing session.
    #[error("command rejected")]
    CommandRejected,

    /// The device refused to sign one of the requested paths.
    #[error("signing hash failed")]
    SigningFailed,

    // =========================================================================
    // Version Errors
    // =========================================================================
    /// The running app is older than the minimum supported version.
    #[error("app version {actual} is not supported, {required} or newer is required")]
    UnsupportedVersion {
        /// The version reported by the device.
        actual: VersionInfo,
        /// The minimum supported version.
        required: VersionInfo,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`enum@Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The exchange with the device failed.
    Transport,
    /// The Avalanche app is not open on the device.
    AppNotOpen,
    /// The device answered with fewer bytes than expected.
    MalformedResponse,
    /// Caller input was rejected before any frame was sent.
    InvalidInput,
    /// The device refused a command.
    DeviceRejected,
    /// The app version is below the supported minimum.
    UnsupportedVersion,
    /// Configuration problem.
    Config,
}

impl Error {
    /// Returns the category this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceNotFound | Self::Transport(_) => ErrorKind::Transport,
            Self::AppNotOpen => ErrorKind::AppNotOpen,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::PayloadTooLong(_)
            | Self::InvalidPathFormat(_)
            | Self::PrefixTooLong(_)
            | Self::InvalidChainId(_)
            | Self::TooManyPaths(_)
            | Self::InvalidHashLength(_) => ErrorKind::InvalidInput,
            Self::Device(_)
            | Self::DeviceMessage(_)
            | Self::CommandRejected
            | Self::SigningFailed => ErrorKind::DeviceRejected,
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns the status word if this error came from a device status.
    #[must_use]
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Device(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<FromHexError> for Error {
    fn from(err: FromHexError) -> Self {
        Self::InvalidChainId(err.to_string())
    }
}

impl From<TomlError> for Error {
    fn from(err: TomlError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Config(err.to_string())
    }
}

/// A specialized [`Result`] type for driver operations.
pub type Result<T> = CoreResult<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::AppNotOpen;
        assert_eq!(err.to_string(), "are you sure the Avalanche app is open?");

        let err = Error::Device(StatusWord::ClaNotSupported);
        assert_eq!(
            err.to_string(),
            "device returned [APDU_CODE_CLA_NOT_SUPPORTED] CLA not supported"
        );

        let err = Error::DeviceMessage("Invalid fee".to_string());
        assert_eq!(err.to_string(), "Invalid fee");
    }

    #[test]
    fn unsupported_version_display() {
        let err = Error::UnsupportedVersion {
            actual: VersionInfo::new(0, 0, 6, 4),
            required: VersionInfo::new(0, 0, 6, 5),
        };
        assert_eq!(
            err.to_string(),
            "app version 0.6.4 is not supported, 0.6.5 or newer is required"
        );
    }

    #[test]
    fn error_kinds() {
        assert_eq!(Error::Transport("usb".into()).kind(), ErrorKind::Transport);
        assert_eq!(Error::InvalidChainId("x".into()).kind(), ErrorKind::InvalidInput);
        assert_eq!(Error::SigningFailed.kind(), ErrorKind::DeviceRejected);
        assert_eq!(Error::CommandRejected.kind(), ErrorKind::DeviceRejected);
        assert_eq!(
            Error::MalformedResponse("short".into()).kind(),
            ErrorKind::MalformedResponse
        );
    }

    #[test]
    fn status_word_accessor() {
        let err = Error::Device(StatusWord::BadKeyHandle);
        assert_eq!(err.status_word(), Some(StatusWord::BadKeyHandle));
        assert_eq!(Error::SigningFailed.status_word(), None);
    }

    #[test]
    fn from_hex_error() {
        let hex_err = FromHexError::InvalidHexCharacter { c: 'g', index: 0 };
        let err: Error = hex_err.into();
        assert!(matches!(err, Error::InvalidChainId(_)));
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Table>("not = [valid").unwrap_err();
        let err: Error = toml_err.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
