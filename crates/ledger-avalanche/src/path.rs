//! Binary encodings of derivation paths and address parameters.
//!
//! These serializers produce the exact byte layouts the Avalanche app
//! expects inside command payloads. They are pure functions and reject
//! malformed input before anything is sent to the device.
//!
//! # Layouts
//!
//! ```text
//! path         | n (1B) | n x u32 BE |         1 <= n <= 6, "m/44'/9000'/0'"
//! path suffix  | 2 (1B) | 2 x u32 BE |         non-hardened,   "0/3"
//! hrp          | len (1B) | ascii bytes |     len <= 83,      "avax"
//! chain id     | len (1B) | bytes |           see serialize_chain_id
//! ```
//!
//! # Example
//!
//! ```
//! use ledger_avalanche::path::{serialize_path, serialize_path_suffix};
//!
//! let path = serialize_path("m/44'/9000'/0'").unwrap();
//! assert_eq!(path[0], 3);
//! assert_eq!(&path[1..5], &[0x80, 0x00, 0x00, 0x2C]);
//!
//! let suffix = serialize_path_suffix("0/3").unwrap();
//! assert_eq!(suffix, vec![2, 0, 0, 0, 0, 0, 0, 0, 3]);
//! ```

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::ledger::params::MAX_HRP_LEN;

/// Bit set on hardened path components.
pub const HARDENED: u32 = 0x8000_0000;

/// Maximum number of components in a full path.
pub const MAX_PATH_DEPTH: usize = 6;

/// Number of components in a path suffix.
pub const SUFFIX_DEPTH: usize = 2;

/// Serialized length of a path suffix.
pub const SUFFIX_LEN: usize = 1 + SUFFIX_DEPTH * 4;

/// Length of a raw chain identifier.
pub const CHAIN_ID_LEN: usize = 32;

/// Longest accepted chain alias.
const MAX_CHAIN_ALIAS_LEN: usize = 32;

/// Serializes a full derivation path such as `m/44'/9000'/0'`.
///
/// # Errors
///
/// Returns [`Error::InvalidPathFormat`] if the path does not start with
/// `m/`, has no components or more than six, or has a component that is
/// not a decimal number below 2^31 with an optional `'`.
pub fn serialize_path(path: &str) -> Result<Vec<u8>> {
    let Some(rest) = path.strip_prefix("m/") else {
        return Err(Error::InvalidPathFormat(format!(
            "path should start with \"m/\" (e.g \"m/44'/9000'/0'\"), got {path:?}"
        )));
    };

    let components: Vec<&str> = rest.split('/').collect();
    if components.len() > MAX_PATH_DEPTH {
        return Err(Error::InvalidPathFormat(format!(
            "path {path:?} has {} components, at most {MAX_PATH_DEPTH} are allowed",
            components.len()
        )));
    }

    let mut buffer = Vec::with_capacity(1 + components.len() * 4);
    buffer.push(depth_byte(components.len()));
    for component in components {
        let value = match component.strip_suffix('\'') {
            Some(index) => parse_index(index, path)? | HARDENED,
            None => parse_index(component, path)?,
        };
        buffer.extend_from_slice(&value.to_be_bytes());
    }

    Ok(buffer)
}

/// Serializes a path suffix such as `0/3`, relative to the prefix sent in
/// the init frame of a signing session.
///
/// # Errors
///
/// Returns [`Error::InvalidPathFormat`] if the suffix starts with `m/`,
/// does not have exactly two components, or has a hardened or
/// non-numeric component.
pub fn serialize_path_suffix(path: &str) -> Result<Vec<u8>> {
    if path.starts_with("m/") {
        return Err(Error::InvalidPathFormat(format!(
            "path suffix should not start with \"m/\" (e.g \"0/3\"), got {path:?}"
        )));
    }

    let components: Vec<&str> = path.split('/').collect();
    if components.len() != SUFFIX_DEPTH {
        return Err(Error::InvalidPathFormat(format!(
            "path suffix {path:?} must contain {SUFFIX_DEPTH} components"
        )));
    }

    let mut buffer = Vec::with_capacity(SUFFIX_LEN);
    buffer.push(depth_byte(SUFFIX_DEPTH));
    for component in components {
        if component.ends_with('\'') {
            return Err(Error::InvalidPathFormat(format!(
                "path suffix {path:?} must not be hardened"
            )));
        }
        buffer.extend_from_slice(&parse_index(component, path)?.to_be_bytes());
    }

    Ok(buffer)
}

/// Serializes a bech32 human-readable prefix such as `avax`.
///
/// # Errors
///
/// Returns [`Error::PrefixTooLong`] if the prefix is longer than 83 bytes.
pub fn serialize_hrp(hrp: &str) -> Result<Vec<u8>> {
    let len = u8::try_from(hrp.len())
        .ok()
        .filter(|len| usize::from(*len) <= MAX_HRP_LEN)
        .ok_or(Error::PrefixTooLong(hrp.len()))?;

    let mut buffer = Vec::with_capacity(1 + hrp.len());
    buffer.push(len);
    buffer.extend_from_slice(hrp.as_bytes());
    Ok(buffer)
}

/// Serializes a chain identifier.
///
/// - an empty string selects the device default and encodes as `[0]`;
/// - 64 hex characters encode the raw 32-byte id as `[32] ++ id`;
/// - an alias of up to 32 ASCII alphanumerics (`testnet`, `X`, `P`, `C`)
///   encodes as `[len] ++ bytes`.
///
/// # Errors
///
/// Returns [`Error::InvalidChainId`] for anything else.
pub fn serialize_chain_id(chain_id: &str) -> Result<Vec<u8>> {
    if chain_id.is_empty() {
        return Ok(vec![0]);
    }

    if chain_id.len() == CHAIN_ID_LEN * 2 && chain_id.bytes().all(|b| b.is_ascii_hexdigit()) {
        let raw = hex::decode(chain_id)?;
        let mut buffer = Vec::with_capacity(1 + CHAIN_ID_LEN);
        buffer.push(depth_byte(CHAIN_ID_LEN));
        buffer.extend_from_slice(&raw);
        return Ok(buffer);
    }

    if chain_id.len() > MAX_CHAIN_ALIAS_LEN {
        return Err(Error::InvalidChainId(format!(
            "chain id {chain_id:?} is neither a 32-byte hex id \
             nor an alias of at most {MAX_CHAIN_ALIAS_LEN} characters"
        )));
    }
    if !chain_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Error::InvalidChainId(format!(
            "chain id {chain_id:?} contains characters outside [A-Za-z0-9]"
        )));
    }

    let mut buffer = Vec::with_capacity(1 + chain_id.len());
    buffer.push(depth_byte(chain_id.len()));
    buffer.extend_from_slice(chain_id.as_bytes());
    Ok(buffer)
}

/// Removes exact duplicates, keeping the first occurrence of each item.
#[must_use]
pub fn remove_duplicates<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| {
            let item = item.as_ref();
            seen.insert(item.to_owned()).then(|| item.to_owned())
        })
        .collect()
}

fn parse_index(component: &str, path: &str) -> Result<u32> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPathFormat(format!(
            "invalid component {component:?} in path {path:?}"
        )));
    }

    component
        .parse::<u32>()
        .ok()
        .filter(|index| *index < HARDENED)
        .ok_or_else(|| {
            Error::InvalidPathFormat(format!(
                "component {component:?} in path {path:?} is out of range"
            ))
        })
}

#[expect(clippy::cast_possible_truncation, reason = "callers pass lengths <= 32")]
const fn depth_byte(len: usize) -> u8 {
    len as u8
}
