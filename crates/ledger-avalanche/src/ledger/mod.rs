//! Ledger device communication module.
//!
//! This module provides communication with the Avalanche app running on a
//! Ledger device. It covers:
//!
//! - APDU command/response framing
//! - Status word classification
//! - App discovery and version negotiation
//! - Public key retrieval
//! - The chunked transaction signing session
//!
//! # Architecture
//!
//! - [`apdu`]: command/response types and encoding
//! - [`params`]: class byte, instruction codes and parameter flags
//! - [`status`]: status word classification
//! - [`app`]: the [`LedgerAvalanche`] facade
//! - [`session`]: the signing state machine
//!
//! # Transport Abstraction
//!
//! The [`Transport`] trait abstracts over the physical link (USB HID, BLE,
//! an emulator socket). The driver only needs a synchronous exchange of
//! raw bytes with one request in flight at a time. [`Connector`] opens
//! transports during discovery.
//!
//! # Example
//!
//! ```ignore
//! use ledger_avalanche::{AppConfig, LedgerAvalanche};
//!
//! let mut app = LedgerAvalanche::find_app(&mut connector, AppConfig::default())?;
//! let (public_key, hash) = app.get_pubkey("m/44'/9000'/0'/0/0", false, "avax", "")?;
//! app.close()?;
//! ```

pub mod apdu;
pub mod app;
pub mod params;
pub mod session;
pub mod status;

pub use apdu::{Command, Response, build_frame, parse_status};
pub use app::LedgerAvalanche;
pub use session::{Phase, SigningRequest, SigningSession};
pub use status::StatusWord;

use crate::error::Result;

/// A transport layer for communicating with a Ledger device.
pub trait Transport {
    /// Sends raw command bytes and returns the raw response bytes,
    /// status word included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the exchange
    /// fails.
    fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>>;

    /// Releases the device handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle could not be released cleanly.
    fn close(&mut self) -> Result<()>;

    /// Sends a [`Command`] and parses the response.
    ///
    /// The status word is not checked here; callers decide how each
    /// status is classified.
    ///
    /// # Errors
    ///
    /// Propagates transport errors and returns
    /// [`Error::MalformedResponse`](crate::Error::MalformedResponse) when
    /// the response has no status word.
    fn send(&mut self, command: &Command) -> Result<Response> {
        let bytes = command.to_bytes();
        tracing::trace!(command = %hex::encode(&bytes), "=> apdu");
        let raw = self.exchange(&bytes)?;
        tracing::trace!(response = %hex::encode(&raw), "<= apdu");
        Response::from_bytes(raw)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        (**self).exchange(command)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        (**self).exchange(command)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Opens transports to attached devices.
pub trait Connector {
    /// The transport produced by this connector.
    type Transport: Transport;

    /// Opens the device at `index` in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`](crate::Error::DeviceNotFound) if
    /// there is no such device, or a transport error if it cannot be opened.
    fn connect(&mut self, index: usize) -> Result<Self::Transport>;
}
