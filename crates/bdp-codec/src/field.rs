//! Length-prefixed fields.
//!
//! Every field is written and read through the [`Sink`]/[`SeekSink`]/[`Source`]
//! capabilities, so the same code serves in-memory buffers and streams:
//! - buffer mode: the data length is known, the prefix is written up front
//! - streaming mode: the prefix is a placeholder patched once the source is
//!   drained, which is why it needs a [`SeekSink`]

use std::fmt;

use bdp_io::{SeekSink, Sink, Source};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::config::CodecConfig;
use crate::error::{BdpError, Result};
use crate::header::Header;
use crate::integer::{decode_uint, encode_uint, LengthWidth};

/// Which half of a pair a field is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Name,
    Value,
}

impl FieldKind {
    /// Prefix width the header assigns to this kind of field.
    pub const fn width(self, header: &Header) -> LengthWidth {
        match self {
            FieldKind::Name => header.name_width(),
            FieldKind::Value => header.value_width(),
        }
    }

    /// The field that follows this one in a package.
    pub const fn next(self) -> FieldKind {
        match self {
            FieldKind::Name => FieldKind::Value,
            FieldKind::Value => FieldKind::Name,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Name => f.write_str("name"),
            FieldKind::Value => f.write_str("value"),
        }
    }
}

/// A decoded field, owned by the caller.
///
/// `declared_len` is the length the prefix announced. When the source ended
/// early the data is shorter and [`Field::is_truncated`] returns true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    declared_len: u64,
    data: Bytes,
}

impl Field {
    /// A field whose data matches its declared length.
    pub fn complete(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            declared_len: data.len() as u64,
            data,
        }
    }

    pub(crate) fn with_declared(declared_len: u64, data: Bytes) -> Self {
        Self { declared_len, data }
    }

    /// Length announced by the prefix.
    pub fn declared_len(&self) -> u64 {
        self.declared_len
    }

    /// Bytes actually read.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when the source ended before the declared length was read.
    pub fn is_truncated(&self) -> bool {
        (self.data.len() as u64) < self.declared_len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for Field {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Outcome of copying a field body into a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCopy {
    /// Length announced by the prefix.
    pub declared: u64,
    /// Bytes actually copied.
    pub copied: u64,
}

impl FieldCopy {
    pub fn is_truncated(&self) -> bool {
        self.copied < self.declared
    }
}

/// Write `data` as one field: prefix, then bytes.
///
/// Fails with `FieldTooLong` before touching the sink if `data` does not fit
/// the prefix width. Returns the length written.
pub fn write_field<S: Sink + ?Sized>(sink: &mut S, width: LengthWidth, data: &[u8]) -> Result<u64> {
    let len = data.len() as u64;
    let max = width.max_length();
    if len > max {
        return Err(BdpError::FieldTooLong { len, max });
    }

    sink.append_bytes(&encode_uint(len, width))?;
    sink.append_bytes(data)?;
    Ok(len)
}

/// Write one field whose bytes come from `source`, copied in chunks of at most
/// `buffer_size`.
///
/// The prefix is written as a zero placeholder, the body is copied until the
/// source is exhausted or the width maximum is reached, and the placeholder is
/// then patched with the real length. Input beyond the maximum is left unread
/// in the source and not stored. Returns the length written.
pub fn write_field_from<S, R>(
    sink: &mut S,
    width: LengthWidth,
    source: &mut R,
    buffer_size: usize,
) -> Result<u64>
where
    S: SeekSink + ?Sized,
    R: Source + ?Sized,
{
    if buffer_size == 0 {
        return Err(BdpError::InvalidBufferSize);
    }

    let max = width.max_length();
    let placeholder = sink.position()?;
    sink.append_bytes(&encode_uint(0, width))?;

    let mut buf = vec![0u8; chunk_len(buffer_size, max)];
    let mut written = 0u64;
    while written < max {
        let want = chunk_len(buffer_size, max - written);
        let n = source.read_up_to(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        sink.append_bytes(&buf[..n])?;
        written += n as u64;
    }

    if written == max {
        debug!(max, "streamed field reached its maximum length");
    }

    sink.patch(placeholder, &encode_uint(written, width))?;
    Ok(written)
}

/// Read a length prefix. Fails with `Truncated` if the source ends inside it.
pub fn read_length<R: Source + ?Sized>(source: &mut R, width: LengthWidth) -> Result<u64> {
    try_read_length(source, width)?.ok_or(BdpError::Truncated {
        expected: width.byte_size(),
        actual: 0,
    })
}

/// Read a length prefix, returning `None` if the source is already exhausted.
pub(crate) fn try_read_length<R: Source + ?Sized>(
    source: &mut R,
    width: LengthWidth,
) -> Result<Option<u64>> {
    let mut buf = [0u8; 8];
    let expected = width.byte_size();
    match source.read_fill(&mut buf[..expected])? {
        0 => Ok(None),
        actual if actual < expected => Err(BdpError::Truncated { expected, actual }),
        _ => decode_uint(&buf[..expected], width).map(Some),
    }
}

/// Read one field into a newly allocated buffer, using default settings.
pub fn read_field<R: Source + ?Sized>(source: &mut R, width: LengthWidth) -> Result<Field> {
    read_field_with(source, width, &CodecConfig::default())
}

/// Read one field into a newly allocated buffer.
///
/// The buffer grows in `config.buffer_size` steps rather than being sized from
/// the prefix up front. A declared length above `config.max_field_length` is
/// rejected before any body byte is read.
pub fn read_field_with<R: Source + ?Sized>(
    source: &mut R,
    width: LengthWidth,
    config: &CodecConfig,
) -> Result<Field> {
    let declared = read_length(source, width)?;
    read_body(source, declared, config)
}

/// Read a field body of `declared` bytes into a newly allocated buffer.
pub(crate) fn read_body<R: Source + ?Sized>(
    source: &mut R,
    declared: u64,
    config: &CodecConfig,
) -> Result<Field> {
    check_limit(declared, config)?;

    let mut data = BytesMut::new();
    {
        let mut writer = (&mut data).writer();
        copy_body(source, &mut writer, declared, config.buffer_size)?;
    }
    Ok(Field::with_declared(declared, data.freeze()))
}

/// Read one field, copying its body into `sink` in chunks of at most
/// `buffer_size`.
pub fn read_field_into<R, S>(
    source: &mut R,
    width: LengthWidth,
    sink: &mut S,
    buffer_size: usize,
) -> Result<FieldCopy>
where
    R: Source + ?Sized,
    S: Sink + ?Sized,
{
    if buffer_size == 0 {
        return Err(BdpError::InvalidBufferSize);
    }
    let declared = read_length(source, width)?;
    let copied = copy_body(source, sink, declared, buffer_size)?;
    Ok(FieldCopy { declared, copied })
}

fn check_limit(declared: u64, config: &CodecConfig) -> Result<()> {
    let max = config.field_limit();
    if declared > max {
        return Err(BdpError::FieldTooLong { len: declared, max });
    }
    Ok(())
}

/// Copy up to `declared` bytes from `source` to `sink`. Stops early, without
/// error, if the source runs dry.
fn copy_body<R, S>(source: &mut R, sink: &mut S, declared: u64, buffer_size: usize) -> Result<u64>
where
    R: Source + ?Sized,
    S: Sink + ?Sized,
{
    if buffer_size == 0 {
        return Err(BdpError::InvalidBufferSize);
    }

    let mut buf = vec![0u8; chunk_len(buffer_size, declared)];
    let mut remaining = declared;
    while remaining > 0 {
        let want = chunk_len(buffer_size, remaining);
        let n = source.read_up_to(&mut buf[..want])?;
        if n == 0 {
            debug!(
                declared,
                copied = declared - remaining,
                "source ended before the declared field length"
            );
            break;
        }
        sink.append_bytes(&buf[..n])?;
        remaining -= n as u64;
    }

    Ok(declared - remaining)
}

fn chunk_len(buffer_size: usize, remaining: u64) -> usize {
    usize::try_from(remaining).map_or(buffer_size, |remaining| remaining.min(buffer_size))
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, ErrorKind, Read};

    use super::*;

    #[test]
    fn buffer_write_layout() {
        let mut out = Vec::<u8>::new();
        assert_eq!(write_field(&mut out, LengthWidth::U16, b"abc").unwrap(), 3);
        assert_eq!(out, b"\x00\x03abc");
    }

    #[test]
    fn buffer_write_rejects_oversized_field() {
        let data = vec![0u8; 256];
        let mut out = Vec::<u8>::new();
        let err = write_field(&mut out, LengthWidth::U8, &data).unwrap_err();
        assert!(matches!(err, BdpError::FieldTooLong { len: 256, max: 255 }));
        assert!(out.is_empty());
    }

    #[test]
    fn buffer_write_accepts_exact_maximum() {
        let data = vec![0x5Au8; 255];
        let mut out = Vec::<u8>::new();
        write_field(&mut out, LengthWidth::U8, &data).unwrap();
        assert_eq!(out[0], 0xFF);
        assert_eq!(out.len(), 256);
    }

    #[test]
    fn read_field_from_slice() {
        let mut src: &[u8] = b"\x00\x00\x00\x02hi\x01";
        let field = read_field(&mut src, LengthWidth::U32).unwrap();
        assert_eq!(field.as_bytes(), b"hi");
        assert_eq!(field.declared_len(), 2);
        assert!(!field.is_truncated());
        assert_eq!(src, b"\x01");
    }

    #[test]
    fn empty_field() {
        let mut out = Vec::<u8>::new();
        write_field(&mut out, LengthWidth::U64, b"").unwrap();
        assert_eq!(out, [0u8; 8]);

        let field = read_field(&mut out.as_slice(), LengthWidth::U64).unwrap();
        assert!(field.is_empty());
        assert!(!field.is_truncated());
    }

    #[test]
    fn short_body_returns_available_bytes() {
        let mut src: &[u8] = b"\x05abc";
        let field = read_field(&mut src, LengthWidth::U8).unwrap();
        assert_eq!(field.as_bytes(), b"abc");
        assert_eq!(field.declared_len(), 5);
        assert!(field.is_truncated());
    }

    #[test]
    fn short_prefix_is_truncated_error() {
        let mut src: &[u8] = b"\x00\x01";
        let err = read_field(&mut src, LengthWidth::U32).unwrap_err();
        assert!(matches!(
            err,
            BdpError::Truncated {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn missing_prefix_is_truncated_error() {
        let mut src: &[u8] = b"";
        let err = read_field(&mut src, LengthWidth::U16).unwrap_err();
        assert!(matches!(
            err,
            BdpError::Truncated {
                expected: 2,
                actual: 0
            }
        ));
    }

    #[test]
    fn configured_limit_rejects_large_declared_length() {
        let cfg = CodecConfig {
            max_field_length: Some(4),
            ..CodecConfig::default()
        };
        let mut src: &[u8] = b"\x00\x10";
        let err = read_field_with(&mut src, LengthWidth::U16, &cfg).unwrap_err();
        assert!(matches!(err, BdpError::FieldTooLong { len: 16, max: 4 }));
    }

    #[test]
    fn huge_declared_length_does_not_preallocate() {
        let mut src: &[u8] = b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFFtail";
        let field = read_field(&mut src, LengthWidth::U64).unwrap();
        assert_eq!(field.as_bytes(), b"tail");
        assert_eq!(field.declared_len(), u64::MAX);
        assert!(field.is_truncated());
    }

    #[test]
    fn streaming_write_patches_length() {
        let mut out = Cursor::new(Vec::<u8>::new());
        out.get_mut().extend_from_slice(b"BDP\x14");
        out.set_position(4);

        let mut src: &[u8] = b"streamed value";
        let written = write_field_from(&mut out, LengthWidth::U32, &mut src, 4).unwrap();
        assert_eq!(written, 14);
        assert_eq!(out.position(), 4 + 4 + 14);

        let bytes = out.into_inner();
        assert_eq!(&bytes[4..8], &[0, 0, 0, 14]);
        assert_eq!(&bytes[8..], b"streamed value");
    }

    #[test]
    fn streaming_write_saturates_at_maximum() {
        let data = vec![0xA5u8; 300];
        let mut src = data.as_slice();
        let mut out = Cursor::new(Vec::<u8>::new());

        let written = write_field_from(&mut out, LengthWidth::U8, &mut src, 64).unwrap();
        assert_eq!(written, 255);
        assert_eq!(src.len(), 45);

        let bytes = out.into_inner();
        assert_eq!(bytes.len(), 1 + 255);
        assert_eq!(bytes[0], 0xFF);

        let field = read_field(&mut bytes.as_slice(), LengthWidth::U8).unwrap();
        assert_eq!(field.len(), 255);
    }

    #[test]
    fn streaming_write_of_empty_source() {
        let mut out = Cursor::new(Vec::<u8>::new());
        let written =
            write_field_from(&mut out, LengthWidth::U16, &mut std::io::empty(), 8).unwrap();
        assert_eq!(written, 0);
        assert_eq!(out.into_inner(), [0u8, 0]);
    }

    #[test]
    fn streaming_write_with_trickling_source() {
        let mut src = OneByteAtATime(Cursor::new(b"drip".to_vec()));
        let mut out = Cursor::new(Vec::<u8>::new());
        write_field_from(&mut out, LengthWidth::U8, &mut src, 16).unwrap();
        assert_eq!(out.into_inner(), b"\x04drip");
    }

    #[test]
    fn zero_buffer_size_rejected() {
        let mut out = Cursor::new(Vec::<u8>::new());
        let err = write_field_from(&mut out, LengthWidth::U8, &mut &b"x"[..], 0).unwrap_err();
        assert!(matches!(err, BdpError::InvalidBufferSize));

        let mut sink = Vec::<u8>::new();
        let err = read_field_into(&mut &b"\x01x"[..], LengthWidth::U8, &mut sink, 0).unwrap_err();
        assert!(matches!(err, BdpError::InvalidBufferSize));
    }

    #[test]
    fn read_into_sink_in_chunks() {
        let mut src: &[u8] = b"\x00\x0Achunked-io";
        let mut sink = Vec::<u8>::new();
        let copy = read_field_into(&mut src, LengthWidth::U16, &mut sink, 3).unwrap();
        assert_eq!(copy, FieldCopy { declared: 10, copied: 10 });
        assert_eq!(sink, b"chunked-io");
        assert!(src.is_empty());
    }

    #[test]
    fn read_into_sink_stops_at_declared_length() {
        let mut src: &[u8] = b"\x02abcd";
        let mut sink = Vec::<u8>::new();
        read_field_into(&mut src, LengthWidth::U8, &mut sink, 16).unwrap();
        assert_eq!(sink, b"ab");
        assert_eq!(src, b"cd");
    }

    #[test]
    fn read_into_sink_short_read() {
        let mut src: &[u8] = b"\x08abc";
        let mut sink = Vec::<u8>::new();
        let copy = read_field_into(&mut src, LengthWidth::U8, &mut sink, 16).unwrap();
        assert_eq!(copy.declared, 8);
        assert_eq!(copy.copied, 3);
        assert!(copy.is_truncated());
    }

    #[test]
    fn source_errors_propagate() {
        let mut out = Cursor::new(Vec::<u8>::new());
        let err = write_field_from(&mut out, LengthWidth::U8, &mut FailingReader, 8).unwrap_err();
        assert!(matches!(err, BdpError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
    }

    #[test]
    fn field_kind_widths() {
        let header = Header::new(8, 64).unwrap();
        assert_eq!(FieldKind::Name.width(&header), LengthWidth::U8);
        assert_eq!(FieldKind::Value.width(&header), LengthWidth::U64);
        assert_eq!(FieldKind::Name.next(), FieldKind::Value);
        assert_eq!(FieldKind::Value.to_string(), "value");
    }

    struct OneByteAtATime(Cursor<Vec<u8>>);

    impl Read for OneByteAtATime {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let end = buf.len().min(1);
            self.0.read(&mut buf[..end])
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::ConnectionReset))
        }
    }
}
