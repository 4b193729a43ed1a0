//! Ledger Avalanche Driver
//!
//! This crate drives the Avalanche app running on a Ledger hardware wallet
//! over an APDU-style request/response protocol.
//!
//! # Overview
//!
//! The host never sees private keys. It asks the device for public keys and
//! addresses, uploads an unsigned transaction, and collects one secp256k1
//! signature per requested derivation path. The driver builds and parses
//! the frames for these exchanges; the physical link is supplied by the
//! caller through the [`Transport`] trait.
//!
//! This library provides:
//!
//! - **Discovery**: open a device and check that a supported app is running
//! - **Address Retrieval**: derive a public key and address hash for a path
//! - **Transaction Signing**: chunked upload followed by per-path signature
//!   collection
//! - **Hash Signing**: sign a precomputed 32-byte hash with several paths
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │   Discovery   │   Address    │   Signing    │   Signature   │
//! │   & Version   │  Retrieval   │   Session    │   Response    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Avalanche App Layer                       │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────────────┐ │
//! │  │  Path   │  │  APDU   │  │ Status  │  │    Transport    │ │
//! │  │ Encode  │  │ Encode  │  │  Words  │  │   Abstraction   │ │
//! │  └─────────┘  └─────────┘  └─────────┘  └─────────────────┘ │
//! ├─────────────────────────────────────────────────────────────┤
//! │               Transport Layer (USB HID / BLE)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Serializing a Derivation Path
//!
//! ```rust
//! use ledger_avalanche::path::serialize_path;
//!
//! let bytes = serialize_path("m/44'/9000'/0'").unwrap();
//! assert_eq!(bytes[0], 3);
//! assert_eq!(&bytes[1..5], &[0x80, 0x00, 0x00, 0x2C]);
//! ```
//!
//! ## Talking to the Device
//!
//! ```ignore
//! use ledger_avalanche::{AppConfig, LedgerAvalanche, SigningRequest};
//!
//! let config = AppConfig::load(None)?;
//! ledger_avalanche::logging::init(&config.logging)?;
//!
//! let mut app = LedgerAvalanche::find_app(&mut connector, config)?;
//! let (public_key, hash) = app.get_pubkey("m/44'/9000'/0'/0/0", true, "avax", "")?;
//!
//! let request = SigningRequest::new("m/44'/9000'/0'", ["0/0", "0/1"], unsigned_tx)
//!     .with_change_paths(["1/0"]);
//! let response = app.sign(&request)?;
//! for (path, signature) in &response {
//!     println!("{path}: {}", hex::encode(signature));
//! }
//!
//! app.close()?;
//! ```
//!
//! # Transport Integration
//!
//! Implement [`Transport`] for your link and [`Connector`] for whatever
//! enumerates devices. A transport exchanges one command at a time and
//! returns the raw response, status word included.
//!
//! # Security Considerations
//!
//! - Private keys never leave the device
//! - Every signature requires confirmation on the device
//! - A signing session returns either every requested signature or none

// Modules
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod path;
pub mod signature;
pub mod version;

// Re-exports for convenience
pub use config::{AppConfig, LoggingOptions};
pub use error::{Error, ErrorKind, Result};
pub use ledger::{Connector, LedgerAvalanche, SigningRequest, StatusWord, Transport};
pub use signature::ResponseSign;
pub use version::{VersionInfo, check_version};
