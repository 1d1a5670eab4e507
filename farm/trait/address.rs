use core::{
    fmt,
    str::FromStr,
};

use amm_helpers::constants::ZERO_ADDRESS;

use crate::FarmError;

/// 20-byte account or contract address.
///
/// Parsing accepts any hex casing (with or without the `0x` prefix) and
/// `Display` always renders lowercase, so two addresses compare equal
/// whenever their normalized forms do.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, scale::Encode, scale::Decode,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address(ZERO_ADDRESS);

    pub fn parse(s: &str) -> Result<Self, FarmError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 40 {
            return Err(FarmError::InvalidAddress)
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| FarmError::InvalidAddress)?;
        Ok(Address(bytes))
    }

    /// Returns `true` if `s` parses as an address.
    pub fn is_address(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// `0x1234…abcd` style abbreviation keeping `chars` hex digits on each side.
    pub fn shorten(&self, chars: usize) -> String {
        let full = self.to_string();
        let chars = chars.min(19);
        format!("{}...{}", &full[..chars + 2], &full[42 - chars..])
    }
}

impl FromStr for Address {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Hash of a submitted transaction.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, scale::Encode, scale::Decode,
)]
pub struct TxHash(pub [u8; 32]);

impl From<[u8; 32]> for TxHash {
    fn from(bytes: [u8; 32]) -> Self {
        TxHash(bytes)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
