//! Package header: "BDP" magic plus one control byte packing both widths.

use bdp_io::{Sink, Source};
use tracing::{debug, warn};

use crate::config::HeaderPolicy;
use crate::error::{BdpError, Result};
use crate::integer::LengthWidth;

/// Magic bytes: "BDP" (0x42 0x44 0x50).
pub const MAGIC: [u8; 3] = *b"BDP";

/// Header: magic (3) + control byte (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

const NAME_NIBBLE_SHIFT: u32 = 4;

/// Legacy widths used by [`HeaderPolicy::Lenient`] when a nibble is empty.
const FALLBACK_NAME_WIDTH: LengthWidth = LengthWidth::U8;
const FALLBACK_VALUE_WIDTH: LengthWidth = LengthWidth::U32;

/// Length-prefix widths for one package.
///
/// Chosen by the writer, parsed by the reader, and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    name: LengthWidth,
    value: LengthWidth,
}

impl Header {
    /// Build a header from name and value prefix bit sizes.
    pub fn new(name_bits: u8, value_bits: u8) -> Result<Self> {
        Ok(Self::from_widths(
            LengthWidth::from_bits(name_bits)?,
            LengthWidth::from_bits(value_bits)?,
        ))
    }

    pub const fn from_widths(name: LengthWidth, value: LengthWidth) -> Self {
        Self { name, value }
    }

    pub const fn name_width(&self) -> LengthWidth {
        self.name
    }

    pub const fn value_width(&self) -> LengthWidth {
        self.value
    }

    pub const fn name_length_bit_size(&self) -> u8 {
        self.name.bits()
    }

    pub const fn value_length_bit_size(&self) -> u8 {
        self.value.bits()
    }

    pub const fn name_length_byte_size(&self) -> usize {
        self.name.byte_size()
    }

    pub const fn value_length_byte_size(&self) -> usize {
        self.value.byte_size()
    }

    pub const fn name_max_length(&self) -> u64 {
        self.name.max_length()
    }

    pub const fn value_max_length(&self) -> u64 {
        self.value.max_length()
    }

    /// Control byte: one-hot name class in bits 7-4, one-hot value class in
    /// bits 3-0.
    pub const fn control_byte(&self) -> u8 {
        (1u8 << (NAME_NIBBLE_SHIFT + self.name.class_index())) | (1u8 << self.value.class_index())
    }

    /// Wire form of this header.
    pub const fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        [MAGIC[0], MAGIC[1], MAGIC[2], self.control_byte()]
    }
}

/// Encode a header for the given name/value prefix bit sizes.
pub fn encode_header(name_bits: u8, value_bits: u8) -> Result<[u8; HEADER_SIZE]> {
    Header::new(name_bits, value_bits).map(|header| header.to_bytes())
}

/// Decode a header from its 4 wire bytes.
pub fn decode_header(bytes: &[u8; HEADER_SIZE], policy: HeaderPolicy) -> Result<Header> {
    let found = [bytes[0], bytes[1], bytes[2]];
    if found != MAGIC {
        return Err(BdpError::InvalidMagic { found });
    }

    let control = bytes[3];
    let name = scan_nibble(control, NAME_NIBBLE_SHIFT);
    let value = scan_nibble(control, 0);

    match (name, value, policy) {
        (Some(name), Some(value), _) => Ok(Header::from_widths(name, value)),
        (_, _, HeaderPolicy::Strict) => Err(BdpError::InvalidControlByte { byte: control }),
        (name, value, HeaderPolicy::Lenient) => {
            warn!(
                control,
                "header control byte has an empty width nibble, using legacy defaults"
            );
            Ok(Header::from_widths(
                name.unwrap_or(FALLBACK_NAME_WIDTH),
                value.unwrap_or(FALLBACK_VALUE_WIDTH),
            ))
        }
    }
}

/// Highest set bit of the nibble starting at `shift`, as a width class.
fn scan_nibble(control: u8, shift: u32) -> Option<LengthWidth> {
    LengthWidth::ALL
        .iter()
        .rev()
        .copied()
        .find(|width| control & (1u8 << (shift + width.class_index())) != 0)
}

/// Write a package header to `sink` and return it.
pub fn write_header<S: Sink + ?Sized>(
    sink: &mut S,
    name_bits: u8,
    value_bits: u8,
) -> Result<Header> {
    let header = Header::new(name_bits, value_bits)?;
    sink.append_bytes(&header.to_bytes())?;
    debug!(name_bits, value_bits, "wrote package header");
    Ok(header)
}

/// Read and validate a package header from `source` with strict policy.
pub fn read_header<R: Source + ?Sized>(source: &mut R) -> Result<Header> {
    read_header_with(source, HeaderPolicy::Strict)
}

/// Read and validate a package header from `source`.
pub fn read_header_with<R: Source + ?Sized>(
    source: &mut R,
    policy: HeaderPolicy,
) -> Result<Header> {
    let mut bytes = [0u8; HEADER_SIZE];
    let read = source.read_fill(&mut bytes)?;
    if read < HEADER_SIZE {
        return Err(BdpError::Truncated {
            expected: HEADER_SIZE,
            actual: read,
        });
    }

    let header = decode_header(&bytes, policy)?;
    debug!(
        name_bits = header.name_length_bit_size(),
        value_bits = header.value_length_bit_size(),
        "read package header"
    );
    Ok(header)
}
