//! Principal address type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The address of a principal: the registry owner, a system or a user.
///
/// Addresses are opaque identity keys handed to the center by the
/// authenticating layer. They are compared byte-for-byte; no case folding.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An address is well-formed when it is non-empty and free of whitespace.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Returned when a string cannot be used as an address.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid address: {0:?}")]
pub struct InvalidAddress(pub String);

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let address = Self::new(s.trim());
        if address.is_valid() {
            Ok(address)
        } else {
            Err(InvalidAddress(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let addr: Address = "  0xabc ".parse().unwrap();
        assert_eq!(addr.as_str(), "0xabc");
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!("".parse::<Address>().is_err());
        assert!("0x a".parse::<Address>().is_err());
    }
}
