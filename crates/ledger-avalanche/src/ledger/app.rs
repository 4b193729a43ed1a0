//! Avalanche app facade.
//!
//! This module provides the [`LedgerAvalanche`] type for interacting with
//! the Avalanche app on a Ledger device. It handles:
//!
//! - App discovery and version negotiation
//! - Public key retrieval
//! - Transaction and hash signing
//!
//! # Example
//!
//! ```ignore
//! use ledger_avalanche::{AppConfig, LedgerAvalanche, SigningRequest};
//!
//! let mut app = LedgerAvalanche::find_app(&mut connector, AppConfig::default())?;
//!
//! let (public_key, hash) = app.get_pubkey("m/44'/9000'/0'/0/0", false, "avax", "")?;
//!
//! let request = SigningRequest::new("m/44'/9000'/0'", ["0/0"], unsigned_tx);
//! let response = app.sign(&request)?;
//!
//! app.close()?;
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use super::apdu::Command;
use super::params::{AddressMode, Instruction, MAX_HRP_LEN};
use super::session::{SigningRequest, SigningSession};
use super::status::StatusWord;
use super::{Connector, Transport};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::path::{serialize_chain_id, serialize_hrp, serialize_path};
use crate::signature::ResponseSign;
use crate::version::{self, VersionInfo};

/// Minimum `GET_ADDR` response body, excluding the hrp length.
const MIN_ADDR_RESPONSE_LEN: usize = 35;

/// A connection to the Avalanche app.
///
/// The facade owns its transport. Pass `&mut transport` to borrow a handle
/// opened elsewhere. Every method takes `&mut self`, so one handle is never
/// driven by two sessions at once.
pub struct LedgerAvalanche<T> {
    /// The underlying transport.
    transport: T,

    /// Protocol settings.
    config: AppConfig,

    /// The version most recently reported by the device.
    version: Option<VersionInfo>,
}

impl<T> fmt::Debug for LedgerAvalanche<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerAvalanche")
            .field("config", &self.config)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> LedgerAvalanche<T> {
    /// Wraps an open transport. Nothing is sent to the device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn new(transport: T, config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            version: None,
        })
    }

    /// Opens the configured device and checks that a supported Avalanche
    /// app is running on it.
    ///
    /// The opened transport is closed again if any step fails. A failure
    /// to close is logged and the discovery error is returned.
    ///
    /// # Arguments
    ///
    /// * `connector` - Opens the device at `config.device_index`
    /// * `config` - Protocol settings, including the minimum app version
    ///
    /// # Returns
    ///
    /// A [`LedgerAvalanche`] owning the opened transport, with
    /// [`last_version`](Self::last_version) set.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `config` is invalid
    /// - connector errors such as [`Error::DeviceNotFound`]
    /// - [`Error::AppNotOpen`] if the device rejects the class byte
    /// - [`Error::UnsupportedVersion`] if the app is too old
    ///
    /// # Example
    ///
    /// ```ignore
    /// use ledger_avalanche::{AppConfig, LedgerAvalanche};
    ///
    /// let mut app = LedgerAvalanche::find_app(&mut connector, AppConfig::load(None)?)?;
    /// println!("Avalanche app {}", app.last_version().unwrap_or_default());
    /// ```
    pub fn find_app<C>(connector: &mut C, config: AppConfig) -> Result<Self>
    where
        C: Connector<Transport = T>,
    {
        config.validate()?;
        let transport = connector.connect(config.device_index)?;
        let mut app = Self {
            transport,
            config,
            version: None,
        };

        match app.negotiate() {
            Ok(version) => {
                info!(%version, "found Avalanche app");
                Ok(app)
            }
            Err(err) => {
                if let Err(close_err) = app.transport.close() {
                    warn!(error = %close_err, "failed to close device after discovery error");
                }
                Err(err)
            }
        }
    }

    fn negotiate(&mut self) -> Result<VersionInfo> {
        let version = self.get_version().map_err(|err| match err {
            Error::Device(StatusWord::ClaNotSupported) => Error::AppNotOpen,
            other => other,
        })?;
        self.check_version(version)?;
        Ok(version)
    }

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the handle could not be released.
    pub fn close(mut self) -> Result<()> {
        self.transport.close()
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the version most recently read from the device.
    #[must_use]
    pub const fn last_version(&self) -> Option<VersionInfo> {
        self.version
    }

    /// Returns the underlying transport.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Queries the app version.
    ///
    /// # Errors
    ///
    /// - [`Error::Device`] if the device answers with an error status
    /// - [`Error::MalformedResponse`] if fewer than 4 bytes are returned
    pub fn get_version(&mut self) -> Result<VersionInfo> {
        let command = self.command(Instruction::GetVersion, 0x00, 0x00, vec![])?;
        let response = self.transport.send(&command)?;
        response.check()?;

        let version = VersionInfo::from_bytes(response.data())?;
        debug!(%version, app_mode = version.app_mode, "app version");
        self.version = Some(version);
        Ok(version)
    }

    /// Checks a version against the configured minimum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] if `version` is older.
    pub fn check_version(&self, version: VersionInfo) -> Result<()> {
        version::check_version(version, self.config.min_version)
    }

    /// Derives the public key for `path` and returns it with its address
    /// hash.
    ///
    /// With `show` set the device displays the address for confirmation
    /// before answering.
    ///
    /// # Errors
    ///
    /// - [`Error::PrefixTooLong`] if `hrp` is longer than 83 bytes
    /// - [`Error::InvalidPathFormat`] / [`Error::InvalidChainId`] for bad input
    /// - [`Error::Device`] if the device answers with an error status
    /// - [`Error::MalformedResponse`] if the response is too short
    pub fn get_pubkey(
        &mut self,
        path: &str,
        show: bool,
        hrp: &str,
        chain_id: &str,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        if hrp.len() > MAX_HRP_LEN {
            return Err(Error::PrefixTooLong(hrp.len()));
        }

        let mut data = serialize_hrp(hrp)?;
        data.extend(serialize_chain_id(chain_id)?);
        data.extend(serialize_path(path)?);

        let mode = AddressMode::from_show(show);
        let command = self.command(Instruction::GetAddr, mode.code(), 0x00, data)?;
        let response = self.transport.send(&command)?;
        response.check()?;

        parse_address_response(response.data(), hrp.len())
    }

    /// Signs a transaction with every path in `request.signing_paths`.
    ///
    /// See [`SigningSession::sign`] for the protocol and its errors.
    ///
    /// # Errors
    ///
    /// Fails as a whole; no signatures are returned if any step fails.
    pub fn sign(&mut self, request: &SigningRequest) -> Result<ResponseSign> {
        self.session().sign(request)
    }

    /// Signs a 32-byte hash with every path in `signing_paths`.
    ///
    /// # Errors
    ///
    /// Fails as a whole; no signatures are returned if any step fails.
    pub fn sign_hash<S: AsRef<str>>(
        &mut self,
        path_prefix: &str,
        signing_paths: &[S],
        hash: &[u8],
    ) -> Result<ResponseSign> {
        self.session().sign_hash(path_prefix, signing_paths, hash)
    }

    /// Starts a signing session over this connection.
    pub fn session(&mut self) -> SigningSession<'_, T> {
        SigningSession::new(&mut self.transport, self.config.cla, self.config.chunk_size)
    }

    fn command(&self, ins: Instruction, p1: u8, p2: u8, data: Vec<u8>) -> Result<Command> {
        Command::new(self.config.cla, ins.code(), p1, p2, data)
    }
}

/// Parses `[key_len] ++ key ++ hash`.
fn parse_address_response(data: &[u8], hrp_len: usize) -> Result<(Vec<u8>, Vec<u8>)> {
    let min_len = MIN_ADDR_RESPONSE_LEN + hrp_len;
    if data.len() < min_len {
        return Err(Error::MalformedResponse(format!(
            "address response has {} bytes, expected at least {min_len}",
            data.len()
        )));
    }

    let key_len = usize::from(data[0]);
    let Some((public_key, hash)) = data[1..].split_at_checked(key_len) else {
        return Err(Error::MalformedResponse(format!(
            "public key length {key_len} overruns {} byte response",
            data.len()
        )));
    };

    Ok((public_key.to_vec(), hash.to_vec()))
}
