//! Mount flag literal parsing and representation.
//!
//! Flags are an opaque bitmask handed to the mount primitive. In tables
//! and configuration files they are written as C-style integer literals:
//! - "0x1001" / "0X1001" (hexadecimal)
//! - "0755" (octal, leading zero)
//! - "4096" (decimal)
//! - "" (absent, no flags)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AutomountError, AutomountResult};

/// An unsigned mount flag bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FlagsRepr", into = "u64")]
pub struct MountFlags(u64);

/// Accepted on-disk forms: a TOML/JSON integer or a literal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagsRepr {
    Bits(u64),
    Literal(String),
}

impl MountFlags {
    /// No flags.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap a raw bitmask.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The raw bitmask.
    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Whether no flag is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Parse an integer literal with base detection.
    ///
    /// An empty literal yields no flags. Anything that is not entirely a
    /// valid literal of the detected base is rejected, including signs,
    /// whitespace, trailing garbage and values wider than 64 bits.
    pub fn parse(literal: &str) -> AutomountResult<Self> {
        let invalid = || {
            tracing::error!(literal, "Invalid mount flags literal");
            AutomountError::InvalidFlags {
                value: literal.to_string(),
            }
        };

        if literal.is_empty() {
            return Ok(Self::empty());
        }

        let (digits, radix) = if let Some(hex) = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
        {
            (hex, 16)
        } else if literal.len() > 1 && literal.starts_with('0') {
            (&literal[1..], 8)
        } else {
            (literal, 10)
        };

        // from_str_radix tolerates a leading '+', the literal grammar does not
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(invalid());
        }

        u64::from_str_radix(digits, radix)
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl fmt::Display for MountFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for MountFlags {
    type Err = AutomountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<MountFlags> for u64 {
    fn from(flags: MountFlags) -> Self {
        flags.0
    }
}

impl TryFrom<FlagsRepr> for MountFlags {
    type Error = AutomountError;

    fn try_from(repr: FlagsRepr) -> Result<Self, Self::Error> {
        match repr {
            FlagsRepr::Bits(bits) => Ok(Self(bits)),
            FlagsRepr::Literal(literal) => Self::parse(&literal),
        }
    }
}
