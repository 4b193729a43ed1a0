//! Status words returned by the Avalanche app.
//!
//! Every response ends with a two-byte, big-endian status word. This module
//! maps the codes the app is known to return onto [`StatusWord`] so that
//! callers branch on a typed value instead of comparing error strings.
//!
//! # Example
//!
//! ```
//! use ledger_avalanche::ledger::StatusWord;
//!
//! assert_eq!(StatusWord::from_u16(0x9000), StatusWord::NoErrors);
//! assert_eq!(StatusWord::from_u16(0x6E00), StatusWord::ClaNotSupported);
//! assert_eq!(StatusWord::from_u16(0x1234), StatusWord::Other(0x1234));
//! ```

use core::fmt;

/// A status word reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusWord {
    /// Success (`0x9000`).
    NoErrors,
    /// No information given, NV-RAM not changed (`0x6400`).
    ExecutionError,
    /// Wrong length (`0x6700`).
    WrongLength,
    /// Empty buffer (`0x6982`).
    EmptyBuffer,
    /// Output buffer too small (`0x6983`).
    OutputBufferTooSmall,
    /// Referenced data reversibly blocked (`0x6984`).
    ///
    /// During signing the response body carries a description of the
    /// rejected transaction.
    DataInvalid,
    /// Conditions of use not satisfied, usually the user refused (`0x6985`).
    ConditionsNotSatisfied,
    /// Command not allowed (`0x6986`).
    CommandNotAllowed,
    /// The parameters in the data field are incorrect (`0x6A80`).
    ///
    /// During signing the response body carries a parser error message.
    BadKeyHandle,
    /// Wrong P1 or P2 (`0x6B00`).
    InvalidP1P2,
    /// Instruction not supported (`0x6D00`).
    InsNotSupported,
    /// Class not supported (`0x6E00`); the expected app is not open.
    ClaNotSupported,
    /// Unknown error (`0x6F00`).
    Unknown,
    /// Signature verification failed on the device (`0x6F01`).
    SignVerifyError,
    /// Any code not listed above.
    Other(u16),
}

impl StatusWord {
    /// Maps a raw status code onto a [`StatusWord`].
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            0x9000 => Self::NoErrors,
            0x6400 => Self::ExecutionError,
            0x6700 => Self::WrongLength,
            0x6982 => Self::EmptyBuffer,
            0x6983 => Self::OutputBufferTooSmall,
            0x6984 => Self::DataInvalid,
            0x6985 => Self::ConditionsNotSatisfied,
            0x6986 => Self::CommandNotAllowed,
            0x6A80 => Self::BadKeyHandle,
            0x6B00 => Self::InvalidP1P2,
            0x6D00 => Self::InsNotSupported,
            0x6E00 => Self::ClaNotSupported,
            0x6F00 => Self::Unknown,
            0x6F01 => Self::SignVerifyError,
            other => Self::Other(other),
        }
    }

    /// Returns the raw two-byte code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::NoErrors => 0x9000,
            Self::ExecutionError => 0x6400,
            Self::WrongLength => 0x6700,
            Self::EmptyBuffer => 0x6982,
            Self::OutputBufferTooSmall => 0x6983,
            Self::DataInvalid => 0x6984,
            Self::ConditionsNotSatisfied => 0x6985,
            Self::CommandNotAllowed => 0x6986,
            Self::BadKeyHandle => 0x6A80,
            Self::InvalidP1P2 => 0x6B00,
            Self::InsNotSupported => 0x6D00,
            Self::ClaNotSupported => 0x6E00,
            Self::Unknown => 0x6F00,
            Self::SignVerifyError => 0x6F01,
            Self::Other(code) => code,
        }
    }

    /// Returns `true` for `0x9000`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::NoErrors)
    }

    /// Returns `true` when the response body carries a human-readable
    /// explanation from the device.
    #[must_use]
    pub const fn carries_diagnostic(self) -> bool {
        matches!(self, Self::BadKeyHandle | Self::DataInvalid)
    }

    /// Returns the symbolic name of the code.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoErrors => "APDU_CODE_OK",
            Self::ExecutionError => "APDU_CODE_EXECUTION_ERROR",
            Self::WrongLength => "APDU_CODE_WRONG_LENGTH",
            Self::EmptyBuffer => "APDU_CODE_EMPTY_BUFFER",
            Self::OutputBufferTooSmall => "APDU_CODE_OUTPUT_BUFFER_TOO_SMALL",
            Self::DataInvalid => "APDU_CODE_DATA_INVALID",
            Self::ConditionsNotSatisfied => "APDU_CODE_CONDITIONS_NOT_SATISFIED",
            Self::CommandNotAllowed => "APDU_CODE_COMMAND_NOT_ALLOWED",
            Self::BadKeyHandle => "APDU_CODE_BAD_KEY_HANDLE",
            Self::InvalidP1P2 => "APDU_CODE_INVALIDP1P2",
            Self::InsNotSupported => "APDU_CODE_INS_NOT_SUPPORTED",
            Self::ClaNotSupported => "APDU_CODE_CLA_NOT_SUPPORTED",
            Self::Unknown => "APDU_CODE_UNKNOWN",
            Self::SignVerifyError => "APDU_CODE_SIGN_VERIFY_ERROR",
            Self::Other(_) => "APDU_CODE_OTHER",
        }
    }

    /// Returns a short description of the code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NoErrors => "No errors",
            Self::ExecutionError => "No information given (NV-Ram not changed)",
            Self::WrongLength => "Wrong length",
            Self::EmptyBuffer => "Empty buffer",
            Self::OutputBufferTooSmall => "Output buffer too small",
            Self::DataInvalid => "Referenced data reversibly blocked (invalidated)",
            Self::ConditionsNotSatisfied => "Conditions of use not satisfied",
            Self::CommandNotAllowed => "Command not allowed (no current EF)",
            Self::BadKeyHandle => "The parameters in the data field are incorrect",
            Self::InvalidP1P2 => "Wrong parameter(s) P1-P2",
            Self::InsNotSupported => "Instruction code not supported or invalid",
            Self::ClaNotSupported => "CLA not supported",
            Self::Unknown => "Unknown",
            Self::SignVerifyError => "Sign/verify error",
            Self::Other(_) => "Unrecognized status word",
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "[{}] {code:#06x}", self.name()),
            _ => write!(f, "[{}] {}", self.name(), self.description()),
        }
    }
}

impl From<u16> for StatusWord {
    fn from(code: u16) -> Self {
        Self::from_u16(code)
    }
}

impl From<StatusWord> for u16 {
    fn from(status: StatusWord) -> Self {
        status.code()
    }
}
