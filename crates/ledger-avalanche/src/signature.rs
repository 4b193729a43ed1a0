//! Signatures collected from a signing session.
//!
//! A [`ResponseSign`] maps every requested path suffix to the raw signature
//! bytes the device returned for it. The device signs with secp256k1 and
//! returns `r || s || v`; this crate does not verify or reinterpret the
//! bytes.
//!
//! # Wire Format
//!
//! When serialized with serde, signatures are hex encoded with a `0x`
//! prefix:
//!
//! ```json
//! { "error_message": null, "signatures": { "0/0": "0x3044..." } }
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::Iter;

use serde::{Deserialize, Serialize};

/// Result of a successful signing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSign {
    /// Message reported alongside the signatures; always `None` for
    /// sessions that complete.
    pub error_message: Option<String>,

    /// Signature bytes keyed by the path suffix they were requested for.
    #[serde(with = "hex_map")]
    pub signatures: BTreeMap<String, Vec<u8>>,
}

/// Serde helper for hex encoding/decoding signature maps.
mod hex_map {
    use std::collections::BTreeMap;

    use hex::{decode, encode};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S>(
        signatures: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(
            signatures
                .iter()
                .map(|(path, signature)| (path, format!("0x{}", encode(signature)))),
        )
    }

    pub(super) fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(path, s)| {
                let s = s.strip_prefix("0x").unwrap_or(&s);
                decode(s).map(|bytes| (path, bytes)).map_err(de::Error::custom)
            })
            .collect()
    }
}

impl ResponseSign {
    /// Wraps a completed set of signatures.
    #[must_use]
    pub const fn new(signatures: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            error_message: None,
            signatures,
        }
    }

    /// Returns the signature collected for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.signatures.get(path).map(Vec::as_slice)
    }

    /// Returns the number of signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Returns `true` if no signature was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Iterates over `(path, signature)` pairs in path order.
    pub fn iter(&self) -> Iter<'_, String, Vec<u8>> {
        self.signatures.iter()
    }

    /// Consumes the response and returns the signature map.
    #[must_use]
    pub fn into_signatures(self) -> BTreeMap<String, Vec<u8>> {
        self.signatures
    }
}

impl<'a> IntoIterator for &'a ResponseSign {
    type Item = (&'a String, &'a Vec<u8>);
    type IntoIter = Iter<'a, String, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
