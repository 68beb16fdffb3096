//! Monotonically assigned identifiers for groups, shares and requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Never assigned; stands in where no id applies.
            pub const NONE: Self = Self(0);

            /// The first id handed out by a fresh ledger.
            pub const FIRST: Self = Self(1);

            pub fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub fn get(&self) -> u64 {
                self.0
            }

            /// The id assigned after this one.
            pub fn next(&self) -> Self {
                Self(self.0 + 1)
            }

            /// Big-endian key bytes, so that storage iteration follows id order.
            pub fn to_key(&self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            pub fn from_key(bytes: &[u8]) -> Option<Self> {
                let arr: [u8; 8] = bytes.try_into().ok()?;
                Some(Self(u64::from_be_bytes(arr)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                let digits = trimmed.strip_prefix($prefix).unwrap_or(trimmed);
                digits.parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a group (personal or explicitly created).
    GroupId,
    "g"
);

numeric_id!(
    /// Identifier of a share record.
    ShareId,
    "s"
);

numeric_id!(
    /// Identifier of a pending join, invite or share request.
    RequestId,
    "r"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bytes_sort_like_ids() {
        let a = GroupId::new(2).to_key();
        let b = GroupId::new(256).to_key();
        assert!(a < b);
        assert_eq!(GroupId::from_key(&b), Some(GroupId::new(256)));
    }

    #[test]
    fn parse_accepts_optional_prefix() {
        assert_eq!("g7".parse::<GroupId>().unwrap(), GroupId::new(7));
        assert_eq!("7".parse::<GroupId>().unwrap(), GroupId::new(7));
        assert_eq!("s12".parse::<ShareId>().unwrap(), ShareId::new(12));
        assert!("r".parse::<RequestId>().is_err());
    }

    #[test]
    fn from_key_rejects_wrong_length() {
        assert_eq!(ShareId::from_key(&[1, 2, 3]), None);
    }
}
