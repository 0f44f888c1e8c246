//! Whole-buffer encoding and incremental decoding over `BytesMut`.
//!
//! Wire format:
//! ```text
//! ┌──────────────┬──────────┬────────────────────────────────────────────┐
//! │ Magic (3B)   │ Control  │ Pairs (repeated, no terminator)             │
//! │ "BDP"        │ (1B)     │ [name len][name][value len][value]          │
//! │              │          │ lengths big-endian, widths from control     │
//! └──────────────┴──────────┴────────────────────────────────────────────┘
//! ```
//!
//! The decoders return `Ok(None)` until the buffer holds a complete item and
//! consume nothing in that case, so they can be fed from a socket or file in
//! arbitrary chunks.

use bytes::{Buf, BufMut, BytesMut};

use crate::config::HeaderPolicy;
use crate::error::{BdpError, Result};
use crate::field::Field;
use crate::header::{decode_header, Header, HEADER_SIZE};
use crate::integer::{decode_uint, LengthWidth};
use crate::pair::Pair;

/// Append the wire form of `header` to `dst`.
pub fn encode_package_header(header: &Header, dst: &mut BytesMut) {
    dst.put_slice(&header.to_bytes());
}

/// Append one field to `dst`.
pub fn encode_field(width: LengthWidth, data: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = data.len() as u64;
    let max = width.max_length();
    if len > max {
        return Err(BdpError::FieldTooLong { len, max });
    }
    dst.reserve(width.byte_size() + data.len());
    dst.put_uint(len, width.byte_size());
    dst.put_slice(data);
    Ok(())
}

/// Append one name/value pair to `dst`.
///
/// Both fields are checked before anything is written, so a rejected pair
/// leaves `dst` unchanged.
pub fn encode_pair(header: &Header, name: &[u8], value: &[u8], dst: &mut BytesMut) -> Result<()> {
    for (len, max) in [
        (name.len() as u64, header.name_max_length()),
        (value.len() as u64, header.value_max_length()),
    ] {
        if len > max {
            return Err(BdpError::FieldTooLong { len, max });
        }
    }
    encode_field(header.name_width(), name, dst)?;
    encode_field(header.value_width(), value, dst)
}

/// Decode a package header from the front of `src`.
pub fn decode_package_header(src: &mut BytesMut, policy: HeaderPolicy) -> Result<Option<Header>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut bytes = [0u8; HEADER_SIZE];
    bytes.copy_from_slice(&src[..HEADER_SIZE]);
    let header = decode_header(&bytes, policy)?;

    src.advance(HEADER_SIZE);
    Ok(Some(header))
}

/// Decode one name/value pair from the front of `src`.
///
/// Declared lengths above `max_field_length` are rejected as soon as their
/// prefix is visible, without waiting for the body.
pub fn decode_pair(
    header: &Header,
    src: &mut BytesMut,
    max_field_length: u64,
) -> Result<Option<Pair>> {
    let name_prefix = header.name_length_byte_size();
    let Some(name_len) = peek_length(src, 0, header.name_width(), max_field_length)? else {
        return Ok(None);
    };

    let value_at = name_prefix + name_len;
    if src.len() < value_at {
        return Ok(None);
    }

    let value_prefix = header.value_length_byte_size();
    let Some(value_len) = peek_length(src, value_at, header.value_width(), max_field_length)?
    else {
        return Ok(None);
    };

    let total = value_at + value_prefix + value_len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(name_prefix);
    let name = src.split_to(name_len).freeze();
    src.advance(value_prefix);
    let value = src.split_to(value_len).freeze();

    Ok(Some(Pair {
        name: Field::complete(name),
        value: Field::complete(value),
    }))
}

/// Read the length prefix at `offset` without consuming it.
fn peek_length(
    src: &BytesMut,
    offset: usize,
    width: LengthWidth,
    max_field_length: u64,
) -> Result<Option<usize>> {
    let end = offset + width.byte_size();
    if src.len() < end {
        return Ok(None);
    }

    let len = decode_uint(&src[offset..end], width)?;
    let max = max_field_length.min(usize::MAX as u64 - end as u64);
    if len > max {
        return Err(BdpError::FieldTooLong { len, max });
    }
    // `len <= usize::MAX - end`, so the cast and the caller's offset sums fit.
    Ok(Some(len as usize))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn header(name_bits: u8, value_bits: u8) -> Header {
        Header::new(name_bits, value_bits).unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let h = header(8, 8);
        let mut buf = BytesMut::new();
        encode_package_header(&h, &mut buf);
        encode_pair(&h, b"id", b"42", &mut buf).unwrap();

        assert_eq!(&buf[..], b"BDP\x11\x02id\x0242");

        let decoded = decode_package_header(&mut buf, HeaderPolicy::Strict)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, h);

        let pair = decode_pair(&decoded, &mut buf, u64::MAX).unwrap().unwrap();
        assert_eq!(pair, Pair::new(Bytes::from_static(b"id"), Bytes::from_static(b"42")));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&b"BD"[..]);
        let result = decode_package_header(&mut buf, HeaderPolicy::Strict).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_decode_invalid_magic() {
        let mut buf = BytesMut::from(&b"XYZ\x11"[..]);
        let result = decode_package_header(&mut buf, HeaderPolicy::Strict);
        assert!(matches!(result, Err(BdpError::InvalidMagic { .. })));
    }

    #[test]
    fn test_decode_incomplete_pair_consumes_nothing() {
        let h = header(16, 32);
        let mut full = BytesMut::new();
        encode_pair(&h, b"name", b"value", &mut full).unwrap();

        for cut in 0..full.len() {
            let mut partial = BytesMut::from(&full[..cut]);
            let result = decode_pair(&h, &mut partial, u64::MAX).unwrap();
            assert!(result.is_none(), "cut at {cut} should be incomplete");
            assert_eq!(partial.len(), cut);
        }
    }

    #[test]
    fn test_decode_field_too_large() {
        let h = header(8, 32);
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_u8(b'k');
        buf.put_u32(1024 * 1024);

        let result = decode_pair(&h, &mut buf, 64 * 1024);
        assert!(matches!(
            result,
            Err(BdpError::FieldTooLong {
                len: 1_048_576,
                ..
            })
        ));
    }

    #[test]
    fn test_multiple_pairs() {
        let h = header(8, 16);
        let mut buf = BytesMut::new();
        encode_pair(&h, b"first", b"1", &mut buf).unwrap();
        encode_pair(&h, b"second", b"22", &mut buf).unwrap();

        let p1 = decode_pair(&h, &mut buf, u64::MAX).unwrap().unwrap();
        assert_eq!(p1.name.as_bytes(), b"first");
        assert_eq!(p1.value.as_bytes(), b"1");

        let p2 = decode_pair(&h, &mut buf, u64::MAX).unwrap().unwrap();
        assert_eq!(p2.name.as_bytes(), b"second");
        assert_eq!(p2.value.as_bytes(), b"22");

        assert!(buf.is_empty());
        assert!(decode_pair(&h, &mut buf, u64::MAX).unwrap().is_none());
    }

    #[test]
    fn test_empty_name() {
        let h = header(8, 8);
        let mut buf = BytesMut::new();
        encode_pair(&h, b"", b"v", &mut buf).unwrap();

        let pair = decode_pair(&h, &mut buf, u64::MAX).unwrap().unwrap();
        assert!(pair.name.is_empty());
        assert_eq!(pair.value.as_bytes(), b"v");
    }

    #[test]
    fn test_rejected_pair_leaves_buffer_unchanged() {
        let h = header(8, 8);
        let mut buf = BytesMut::new();
        let value = vec![0u8; 256];

        let err = encode_pair(&h, b"ok", &value, &mut buf).unwrap_err();
        assert!(matches!(err, BdpError::FieldTooLong { len: 256, max: 255 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_sixty_four_bit_prefixes() {
        let h = header(64, 64);
        let mut buf = BytesMut::new();
        encode_pair(&h, b"n", b"v", &mut buf).unwrap();
        assert_eq!(buf.len(), 8 + 1 + 8 + 1);
        assert_eq!(&buf[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);

        let pair = decode_pair(&h, &mut buf, u64::MAX).unwrap().unwrap();
        assert_eq!(pair.value.as_bytes(), b"v");
    }
}
