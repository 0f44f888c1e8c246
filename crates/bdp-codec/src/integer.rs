//! Fixed-width big-endian length prefixes.

use std::fmt;
use std::ops::Deref;

use crate::error::{BdpError, Result};

/// Width class of a length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LengthWidth {
    /// 8-bit prefix, fields up to 255 bytes.
    U8,
    /// 16-bit prefix, fields up to 65535 bytes.
    U16,
    /// 32-bit prefix, fields up to 4294967295 bytes.
    U32,
    /// 64-bit prefix.
    U64,
}

impl LengthWidth {
    /// All width classes, narrowest first.
    pub const ALL: [LengthWidth; 4] = [
        LengthWidth::U8,
        LengthWidth::U16,
        LengthWidth::U32,
        LengthWidth::U64,
    ];

    /// Map a bit size to its width class.
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            8 => Ok(LengthWidth::U8),
            16 => Ok(LengthWidth::U16),
            32 => Ok(LengthWidth::U32),
            64 => Ok(LengthWidth::U64),
            _ => Err(BdpError::InvalidConfig { bits }),
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            LengthWidth::U8 => 8,
            LengthWidth::U16 => 16,
            LengthWidth::U32 => 32,
            LengthWidth::U64 => 64,
        }
    }

    /// Number of bytes the prefix occupies on the wire.
    pub const fn byte_size(self) -> usize {
        self.bits() as usize / 8
    }

    /// Largest field length this prefix can describe: `2^bits - 1`.
    pub const fn max_length(self) -> u64 {
        match self {
            LengthWidth::U8 => u8::MAX as u64,
            LengthWidth::U16 => u16::MAX as u64,
            LengthWidth::U32 => u32::MAX as u64,
            LengthWidth::U64 => u64::MAX,
        }
    }

    /// Position of this class in [`LengthWidth::ALL`]; doubles as the bit
    /// offset inside a header control nibble.
    pub(crate) const fn class_index(self) -> u32 {
        match self {
            LengthWidth::U8 => 0,
            LengthWidth::U16 => 1,
            LengthWidth::U32 => 2,
            LengthWidth::U64 => 3,
        }
    }
}

impl fmt::Display for LengthWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Maximum field length for a prefix of `bits` bits.
pub fn max_length(bits: u8) -> Result<u64> {
    LengthWidth::from_bits(bits).map(LengthWidth::max_length)
}

/// An encoded length prefix. Derefs to exactly `width.byte_size()` bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LengthBytes {
    buf: [u8; 8],
    len: usize,
}

impl Deref for LengthBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl AsRef<[u8]> for LengthBytes {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl fmt::Debug for LengthBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LengthBytes").field(&&**self).finish()
    }
}

/// Encode `value` big-endian into `width.byte_size()` bytes.
///
/// High bits that do not fit are dropped; callers check against
/// [`LengthWidth::max_length`] first.
pub fn encode_uint(value: u64, width: LengthWidth) -> LengthBytes {
    let len = width.byte_size();
    let be = value.to_be_bytes();
    let mut buf = [0u8; 8];
    buf[..len].copy_from_slice(&be[8 - len..]);
    LengthBytes { buf, len }
}

/// Decode a big-endian unsigned integer from the first `width.byte_size()`
/// bytes of `bytes`. Anything after them is ignored.
pub fn decode_uint(bytes: &[u8], width: LengthWidth) -> Result<u64> {
    let expected = width.byte_size();
    let Some(prefix) = bytes.get(..expected) else {
        return Err(BdpError::Truncated {
            expected,
            actual: bytes.len(),
        });
    };
    Ok(prefix
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)))
}
