//! Transaction signing sessions.
//!
//! Signing a transaction takes three steps on the wire:
//!
//! 1. **Init**: one [`Sign`](Instruction::Sign) frame carrying the
//!    serialized path prefix shared by every key involved.
//! 2. **Upload**: the message, preceded by the deduplicated list of path
//!    suffixes the device should know about (signing paths first, then
//!    change paths), streamed in chunks of at most `chunk_size` bytes.
//! 3. **Collect**: one [`SignHash`](Instruction::SignHash) frame per
//!    signing path, each returning the signature for that path.
//!
//! ```text
//! upload payload | count (1B) | count x suffix (9B) | message |
//! ```
//!
//! The session moves through [`Phase::Idle`], [`Phase::Init`],
//! [`Phase::Uploading`], [`Phase::Collecting`] and [`Phase::Done`], or to
//! [`Phase::Failed`] from any of them. Signatures are accumulated by the
//! session and only handed out once every path has been signed; a
//! failure discards all of them.
//!
//! # Example
//!
//! ```ignore
//! use ledger_avalanche::ledger::SigningRequest;
//!
//! let request = SigningRequest::new("m/44'/9000'/0'", ["0/0", "0/1"], tx_bytes)
//!     .with_change_paths(["1/0"]);
//! let response = app.sign(&request)?;
//! let signature = response.get("0/0");
//! ```

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use super::Transport;
use super::apdu::Command;
use super::params::{HASH_LEN, Instruction, MessagePosition, PayloadType};
use crate::error::{Error, Result};
use crate::path::{remove_duplicates, serialize_path, serialize_path_suffix};
use crate::signature::ResponseSign;

/// Parameters of a transaction signing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// Full path shared by all signing and change keys, e.g. `m/44'/9000'/0'`.
    pub path_prefix: String,

    /// Suffixes of the keys that must sign, in request order.
    pub signing_paths: Vec<String>,

    /// The unsigned transaction bytes.
    pub message: Vec<u8>,

    /// Suffixes of change outputs the device should recognise as owned.
    pub change_paths: Option<Vec<String>>,
}

impl SigningRequest {
    /// Creates a request without change paths.
    ///
    /// # Arguments
    ///
    /// * `path_prefix` - Full path shared by every key, e.g. `m/44'/9000'/0'`
    /// * `signing_paths` - Two-level suffixes of the keys that must sign
    /// * `message` - The unsigned transaction bytes
    ///
    /// # Returns
    ///
    /// A [`SigningRequest`]. Paths are not validated until it is signed.
    ///
    /// # Example
    ///
    /// ```
    /// use ledger_avalanche::SigningRequest;
    ///
    /// let request = SigningRequest::new("m/44'/9000'/0'", ["0/0", "0/1"], vec![0x00; 4])
    ///     .with_change_paths(["1/0"]);
    /// assert_eq!(request.effective_paths(), vec!["0/0", "0/1", "1/0"]);
    /// assert_eq!(request.upload_payload().unwrap().len(), 1 + 3 * 9 + 4);
    /// ```
    pub fn new<P, I, S>(path_prefix: P, signing_paths: I, message: Vec<u8>) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path_prefix: path_prefix.into(),
            signing_paths: signing_paths.into_iter().map(Into::into).collect(),
            message,
            change_paths: None,
        }
    }

    /// Sets the change paths.
    #[must_use]
    pub fn with_change_paths<I, S>(mut self, change_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.change_paths = Some(change_paths.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the deduplicated union of signing and change paths, in
    /// first-occurrence order.
    #[must_use]
    pub fn effective_paths(&self) -> Vec<String> {
        let change = self.change_paths.iter().flatten();
        remove_duplicates(self.signing_paths.iter().chain(change))
    }

    /// Builds the upload payload: path count, path suffixes, message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPathFormat`] for a malformed suffix and
    /// [`Error::TooManyPaths`] if more than 255 distinct paths are given.
    pub fn upload_payload(&self) -> Result<Vec<u8>> {
        let paths = self.effective_paths();
        let count = u8::try_from(paths.len()).map_err(|_| Error::TooManyPaths(paths.len()))?;

        let mut payload = Vec::with_capacity(1 + paths.len() * 9 + self.message.len());
        payload.push(count);
        for path in &paths {
            payload.extend(serialize_path_suffix(path)?);
        }
        payload.extend_from_slice(&self.message);
        Ok(payload)
    }
}

/// Where a [`SigningSession`] is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing sent yet.
    Idle,
    /// Sending the init frame.
    Init,
    /// Streaming upload chunks.
    Uploading {
        /// Index of the chunk being sent.
        chunk: usize,
        /// Total number of chunks.
        total: usize,
    },
    /// Requesting signatures.
    Collecting {
        /// Index into the signing paths.
        index: usize,
        /// Number of signing paths.
        total: usize,
    },
    /// Every signature was collected.
    Done,
    /// The session aborted; nothing was returned.
    Failed,
}

/// Splits `payload` into upload frames.
///
/// Every frame but the last is tagged [`PayloadType::Add`]; the last,
/// which is shorter than `chunk_size` or exactly `chunk_size` long, is
/// tagged [`PayloadType::Last`]. An empty payload yields no frames.
///
/// # Errors
///
/// Returns [`Error::PayloadTooLong`] if `chunk_size` exceeds 255.
pub fn upload_frames(cla: u8, payload: &[u8], chunk_size: usize) -> Result<Vec<Command>> {
    let chunks: Vec<&[u8]> = payload.chunks(chunk_size.max(1)).collect();
    let last = chunks.len().saturating_sub(1);

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let payload_type = if i == last {
                PayloadType::Last
            } else {
                PayloadType::Add
            };
            Command::new(
                cla,
                Instruction::Sign.code(),
                payload_type.code(),
                0x00,
                chunk.to_vec(),
            )
        })
        .collect()
}

/// One signing run over a borrowed transport.
#[derive(Debug)]
pub struct SigningSession<'t, T: ?Sized> {
    transport: &'t mut T,
    cla: u8,
    chunk_size: usize,
    phase: Phase,
}

impl<'t, T: Transport + ?Sized> SigningSession<'t, T> {
    /// Creates an idle session.
    pub const fn new(transport: &'t mut T, cla: u8, chunk_size: usize) -> Self {
        Self {
            transport,
            cla,
            chunk_size,
            phase: Phase::Idle,
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the full transaction signing protocol.
    ///
    /// All paths are validated before the first frame is sent. At least one
    /// signing path is required and signing paths must be distinct, so
    /// every run ends with a [`MessagePosition::Last`] request and each
    /// path is signed exactly once. Change paths may repeat signing paths.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPathFormat`] for a malformed, repeated or missing
    ///   signing path, [`Error::TooManyPaths`] for more than 255 paths
    /// - [`Error::CommandRejected`] if the init frame fails
    /// - [`Error::DeviceMessage`] if the device rejects the upload with an
    ///   explanation, [`Error::Device`] for any other rejected chunk
    /// - [`Error::SigningFailed`] if any signature request is rejected
    /// - transport errors unchanged
    pub fn sign(&mut self, request: &SigningRequest) -> Result<ResponseSign> {
        let prefix = serialize_path(&request.path_prefix)?;
        let payload = request.upload_payload()?;
        let suffixes = signing_suffixes(&request.signing_paths)?;
        let init = Command::new(
            self.cla,
            Instruction::Sign.code(),
            PayloadType::Init.code(),
            MessagePosition::First.code(),
            prefix,
        )?;
        let frames = upload_frames(self.cla, &payload, self.chunk_size)?;

        let result = self.run(&init, &frames, &request.signing_paths, &suffixes);
        self.finish(result)
    }

    /// Signs a precomputed 32-byte hash with every signing path.
    ///
    /// Skips the upload phase: the init frame carries the path prefix
    /// followed by the hash.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHashLength`] if `hash` is not 32 bytes
    /// - [`Error::InvalidPathFormat`] for a malformed, repeated or missing
    ///   signing path
    /// - [`Error::CommandRejected`] if the init frame fails
    /// - [`Error::SigningFailed`] if any signature request is rejected
    pub fn sign_hash<S: AsRef<str>>(
        &mut self,
        path_prefix: &str,
        signing_paths: &[S],
        hash: &[u8],
    ) -> Result<ResponseSign> {
        if hash.len() != HASH_LEN {
            return Err(Error::InvalidHashLength(hash.len()));
        }
        let mut data = serialize_path(path_prefix)?;
        data.extend_from_slice(hash);
        let suffixes = signing_suffixes(signing_paths)?;
        let init = Command::new(
            self.cla,
            Instruction::SignHash.code(),
            MessagePosition::First.code(),
            0x00,
            data,
        )?;

        let result = self.run(&init, &[], signing_paths, &suffixes);
        self.finish(result)
    }

    fn run<S: AsRef<str>>(
        &mut self,
        init: &Command,
        frames: &[Command],
        signing_paths: &[S],
        suffixes: &[Vec<u8>],
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        self.init(init)?;
        self.upload(frames)?;
        self.collect(signing_paths, suffixes)
    }

    fn init(&mut self, command: &Command) -> Result<()> {
        self.phase = Phase::Init;
        debug!("signing session init");

        let response = self.transport.send(command).map_err(|err| {
            debug!(error = %err, "init frame failed");
            Error::CommandRejected
        })?;
        response.check().map_err(|err| {
            debug!(error = %err, "init frame rejected");
            Error::CommandRejected
        })
    }

    fn upload(&mut self, frames: &[Command]) -> Result<()> {
        let total = frames.len();
        for (chunk, frame) in frames.iter().enumerate() {
            self.phase = Phase::Uploading { chunk, total };
            debug!(chunk, total, len = frame.data().len(), "uploading chunk");

            let response = self.transport.send(frame)?;
            let status = response.status_word();
            if status.carries_diagnostic() {
                return Err(Error::DeviceMessage(response.diagnostic_text()));
            }
            response.check()?;
        }
        Ok(())
    }

    fn collect<S: AsRef<str>>(
        &mut self,
        signing_paths: &[S],
        suffixes: &[Vec<u8>],
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let total = signing_paths.len();
        let mut signatures = BTreeMap::new();

        for (index, (path, suffix)) in signing_paths.iter().zip(suffixes).enumerate() {
            self.phase = Phase::Collecting { index, total };
            let position = if index + 1 == total {
                MessagePosition::Last
            } else {
                MessagePosition::Next
            };
            let command = Command::new(
                self.cla,
                Instruction::SignHash.code(),
                position.code(),
                0x00,
                suffix.clone(),
            )?;

            let response = self.transport.send(&command)?;
            if !response.is_success() {
                debug!(
                    path = path.as_ref(),
                    status = %response.status_word(),
                    "signature rejected"
                );
                return Err(Error::SigningFailed);
            }
            if response.data().is_empty() {
                return Err(Error::MalformedResponse(format!(
                    "empty signature for path {}",
                    path.as_ref()
                )));
            }
            signatures.insert(path.as_ref().to_owned(), response.into_data());
        }

        Ok(signatures)
    }

    fn finish(&mut self, result: Result<BTreeMap<String, Vec<u8>>>) -> Result<ResponseSign> {
        match result {
            Ok(signatures) => {
                self.phase = Phase::Done;
                debug!(signatures = signatures.len(), "signing session done");
                Ok(ResponseSign::new(signatures))
            }
            Err(err) => {
                warn!(phase = ?self.phase, error = %err, "signing session failed");
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }
}

/// Serializes the signing paths, which must be non-empty and distinct.
fn signing_suffixes<S: AsRef<str>>(paths: &[S]) -> Result<Vec<Vec<u8>>> {
    if paths.is_empty() {
        return Err(Error::InvalidPathFormat(
            "at least one signing path is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            if !seen.insert(path) {
                return Err(Error::InvalidPathFormat(format!(
                    "signing path {path:?} is listed more than once"
                )));
            }
            serialize_path_suffix(path)
        })
        .collect()
}
