//! App version information and compatibility checks.

use core::cmp::Ordering;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version reported by the Avalanche app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    /// App mode flag (e.g. test mode); not part of compatibility checks.
    pub app_mode: u8,
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch version.
    pub patch: u8,
}

impl VersionInfo {
    /// Number of bytes the device uses to encode a version.
    pub const BYTE_LEN: usize = 4;

    /// Oldest app release this driver supports.
    pub const MINIMUM: Self = Self::new(0, 0, 6, 5);

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(app_mode: u8, major: u8, minor: u8, patch: u8) -> Self {
        Self {
            app_mode,
            major,
            minor,
            patch,
        }
    }

    /// Parses the leading `app_mode, major, minor, patch` bytes of a
    /// `GET_VERSION` response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if fewer than 4 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [app_mode, major, minor, patch, ..] => Ok(Self::new(*app_mode, *major, *minor, *patch)),
            _ => Err(Error::MalformedResponse(format!(
                "version response has {} bytes, expected at least {}",
                bytes.len(),
                Self::BYTE_LEN
            ))),
        }
    }

    /// Compares `major.minor.patch`, ignoring the app mode.
    #[must_use]
    pub fn cmp_release(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }

    /// Returns `true` if this version is at least `required`.
    #[must_use]
    pub fn satisfies(&self, required: &Self) -> bool {
        self.cmp_release(required) != Ordering::Less
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Checks `actual` against a minimum `required` version.
///
/// # Errors
///
/// Returns [`Error::UnsupportedVersion`] if `actual` is older than
/// `required`.
pub fn check_version(actual: VersionInfo, required: VersionInfo) -> Result<()> {
    if actual.satisfies(&required) {
        Ok(())
    } else {
        Err(Error::UnsupportedVersion { actual, required })
    }
}
