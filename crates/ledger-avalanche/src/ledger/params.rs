//! Protocol constants for the Avalanche app.

/// Class byte of the Avalanche app.
pub const CLA: u8 = 0x80;

/// Default upload chunk size in bytes.
pub const CHUNK_SIZE: usize = 250;

/// Length of a hash accepted by the hash signing flow.
pub const HASH_LEN: usize = 32;

/// Longest human-readable prefix the app accepts.
pub const MAX_HRP_LEN: usize = 83;

/// Instruction codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instruction {
    /// Query the app version.
    GetVersion = 0x00,
    /// Derive a public key and address hash.
    GetAddr = 0x02,
    /// Sign the hash held in device memory with one path suffix.
    SignHash = 0x04,
    /// Upload a transaction for signing.
    Sign = 0x05,
}

impl Instruction {
    /// Returns the instruction byte.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// P1 of a [`Instruction::Sign`] frame, tagging where the frame sits in
/// the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PayloadType {
    /// Carries the path prefix and opens the session.
    Init = 0x00,
    /// Any upload chunk except the final one.
    Add = 0x01,
    /// The final upload chunk.
    Last = 0x02,
}

impl PayloadType {
    /// Returns the P1 byte.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Message position flags.
///
/// Used as P2 of the init frame and as P1 of every
/// [`Instruction::SignHash`] frame, telling the device whether more
/// signature requests follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessagePosition {
    /// First frame of a session.
    First = 0x01,
    /// Final signature request.
    Last = 0x02,
    /// More signature requests follow.
    Next = 0x03,
}

impl MessagePosition {
    /// Returns the parameter byte.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// P1 of a [`Instruction::GetAddr`] frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressMode {
    /// Return the key without user interaction.
    OnlyRetrieve = 0x00,
    /// Display the address on the device before returning it.
    ShowOnDevice = 0x01,
}

impl AddressMode {
    /// Selects the mode from a `show` flag.
    #[must_use]
    pub const fn from_show(show: bool) -> Self {
        if show {
            Self::ShowOnDevice
        } else {
            Self::OnlyRetrieve
        }
    }

    /// Returns the P1 byte.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_codes() {
        assert_eq!(Instruction::GetVersion.code(), 0x00);
        assert_eq!(Instruction::GetAddr.code(), 0x02);
        assert_eq!(Instruction::SignHash.code(), 0x04);
        assert_eq!(Instruction::Sign.code(), 0x05);
    }

    #[test]
    fn address_mode_from_show() {
        assert_eq!(AddressMode::from_show(false).code(), 0x00);
        assert_eq!(AddressMode::from_show(true).code(), 0x01);
    }

    #[test]
    fn message_positions() {
        assert_eq!(MessagePosition::First.code(), 0x01);
        assert_eq!(MessagePosition::Last.code(), 0x02);
        assert_eq!(MessagePosition::Next.code(), 0x03);
        assert_eq!(PayloadType::Last.code(), 0x02);
    }
}
