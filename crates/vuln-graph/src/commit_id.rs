use std::fmt;
use std::str::FromStr;

use crate::GraphError;

/// Identifier of a single commit in the analyzed history.
///
/// An opaque digest: equality, ordering, and hashing are the only
/// operations the analyzer relies on. Both 20-byte (SHA-1) and 32-byte
/// (SHA-256) repositories are representable, carried inline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommitId {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
}

impl CommitId {
    /// Create a CommitId from raw digest bytes.
    ///
    /// The width is inferred from the length: 20 bytes → SHA-1,
    /// 32 bytes → SHA-256.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        match bytes.len() {
            20 => {
                let mut arr = [0u8; 20];
                arr.copy_from_slice(bytes);
                Ok(Self::Sha1(arr))
            }
            32 => {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(bytes);
                Ok(Self::Sha256(arr))
            }
            actual => Err(GraphError::InvalidIdLength { actual }),
        }
    }

    /// Parse a CommitId from a hex string (40 or 64 characters).
    pub fn from_hex(hex: &str) -> Result<Self, GraphError> {
        match hex.len() {
            40 => {
                let mut bytes = [0u8; 20];
                hex_decode(hex, &mut bytes)?;
                Ok(Self::Sha1(bytes))
            }
            64 => {
                let mut bytes = [0u8; 32];
                hex_decode(hex, &mut bytes)?;
                Ok(Self::Sha256(bytes))
            }
            actual => Err(GraphError::InvalidHexLength { actual }),
        }
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha1(b) => b,
            Self::Sha256(b) => b,
        }
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex_string(self.as_bytes())
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId({})", &self.to_hex()[..8])
    }
}

impl FromStr for CommitId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Lowercase hex rendering of arbitrary digest bytes.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

fn hex_decode(hex: &str, buf: &mut [u8]) -> Result<(), GraphError> {
    debug_assert_eq!(hex.len(), buf.len() * 2);
    for (i, c) in hex.bytes().enumerate() {
        let nibble = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => {
                return Err(GraphError::InvalidHex {
                    position: i,
                    character: c as char,
                })
            }
        };
        if i % 2 == 0 {
            buf[i / 2] = nibble << 4;
        } else {
            buf[i / 2] |= nibble;
        }
    }
    Ok(())
}
