//! HID Radio Addresses
//!
//! A device is identified on air by a 5-byte radio address, written as
//! five colon-separated 2-hex-digit octets (`a1:b2:c3:d4:e5`). Parsing
//! is case-insensitive; the normalized text form is lowercase.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid HID address '{0}': expected five colon-separated octets")]
    InvalidFormat(String),

    #[error("invalid octet '{0}' in HID address")]
    InvalidOctet(String),
}

/// A 5-byte HID radio address plus its normalized text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HidAddress {
    raw: [u8; 5],
    text: String,
}

impl HidAddress {
    /// Build from raw on-air bytes (most-significant octet first).
    pub fn from_bytes(raw: [u8; 5]) -> Self {
        let text = format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            raw[0], raw[1], raw[2], raw[3], raw[4]
        );
        Self { raw, text }
    }

    /// Raw address bytes as transmitted over the air.
    pub fn bytes(&self) -> &[u8; 5] {
        &self.raw
    }

    /// Normalized lowercase `aa:bb:cc:dd:ee` form.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for HidAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for HidAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 5 {
            return Err(AddressError::InvalidFormat(s.to_string()));
        }

        let mut raw = [0u8; 5];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(AddressError::InvalidOctet(part.to_string()));
            }
            raw[i] = u8::from_str_radix(part, 16)
                .map_err(|_| AddressError::InvalidOctet(part.to_string()))?;
        }

        Ok(Self::from_bytes(raw))
    }
}
