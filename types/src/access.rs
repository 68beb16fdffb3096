//! Access levels granted by a share.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level of access a share grants on its URI. `Write` implies `Read`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    Read,
    Write,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
        }
    }

    pub fn allows_write(&self) -> bool {
        matches!(self, AccessLevel::Write)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" | "r" => Ok(AccessLevel::Read),
            "write" | "w" => Ok(AccessLevel::Write),
            other => Err(format!("unknown access level '{other}'")),
        }
    }
}
