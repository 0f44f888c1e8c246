//! Name/value pairs and the header-aware field entry points.
//!
//! These functions only pick the width for the kind of field and sequence the
//! calls; they do not track whether a name or a value is due next. Writing two
//! names in a row silently desynchronizes the package. [`PackageWriter`] and
//! [`PackageReader`] add that bookkeeping.
//!
//! [`PackageWriter`]: crate::writer::PackageWriter
//! [`PackageReader`]: crate::reader::PackageReader

use std::io::Read;

use bdp_io::{SeekSink, Sink, Source};
use bytes::Bytes;
use tracing::trace;

use crate::config::{CodecConfig, DEFAULT_BUFFER_SIZE};
use crate::error::{BdpError, Result};
use crate::field::{
    read_field_into, read_field_with, write_field, write_field_from, Field, FieldCopy, FieldKind,
};
use crate::header::Header;
use crate::integer::LengthWidth;

/// One decoded name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub name: Field,
    pub value: Field,
}

impl Pair {
    /// A pair whose fields match their declared lengths.
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            name: Field::complete(name),
            value: Field::complete(value),
        }
    }
}

/// Something that can be written as one field onto a seekable sink.
///
/// Byte slices go through the buffer path; [`Streamed`] readers go through
/// the placeholder-and-patch path. Name and value may use different shapes.
pub trait FieldInput {
    fn write_field_to<S: SeekSink + ?Sized>(self, sink: &mut S, width: LengthWidth) -> Result<u64>;

    /// Length of the field when it is known before writing. Streamed input
    /// returns `None`.
    fn known_len(&self) -> Option<u64> {
        None
    }
}

impl FieldInput for &[u8] {
    fn write_field_to<S: SeekSink + ?Sized>(self, sink: &mut S, width: LengthWidth) -> Result<u64> {
        write_field(sink, width, self)
    }

    fn known_len(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl<const N: usize> FieldInput for &[u8; N] {
    fn write_field_to<S: SeekSink + ?Sized>(self, sink: &mut S, width: LengthWidth) -> Result<u64> {
        write_field(sink, width, self)
    }

    fn known_len(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl FieldInput for &Vec<u8> {
    fn write_field_to<S: SeekSink + ?Sized>(self, sink: &mut S, width: LengthWidth) -> Result<u64> {
        write_field(sink, width, self)
    }

    fn known_len(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl FieldInput for &Bytes {
    fn write_field_to<S: SeekSink + ?Sized>(self, sink: &mut S, width: LengthWidth) -> Result<u64> {
        write_field(sink, width, self)
    }

    fn known_len(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl FieldInput for &str {
    fn write_field_to<S: SeekSink + ?Sized>(self, sink: &mut S, width: LengthWidth) -> Result<u64> {
        write_field(sink, width, self.as_bytes())
    }

    fn known_len(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

/// A reader whose contents become one field, copied through a bounded buffer.
#[derive(Debug)]
pub struct Streamed<R> {
    reader: R,
    buffer_size: usize,
}

impl<R: Read> Streamed<R> {
    /// Stream `reader` with the default 16 KiB buffer.
    pub fn new(reader: R) -> Self {
        Self::with_buffer_size(reader, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(reader: R, buffer_size: usize) -> Self {
        Self {
            reader,
            buffer_size,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> FieldInput for Streamed<R> {
    fn write_field_to<S: SeekSink + ?Sized>(
        mut self,
        sink: &mut S,
        width: LengthWidth,
    ) -> Result<u64> {
        write_field_from(sink, width, &mut self.reader, self.buffer_size)
    }
}

/// Write a name field from a byte slice.
pub fn write_name<S: Sink + ?Sized>(header: &Header, sink: &mut S, name: &[u8]) -> Result<u64> {
    write_field(sink, header.name_width(), name)
}

/// Write a name field streamed from `source`.
pub fn write_name_from<S, R>(
    header: &Header,
    sink: &mut S,
    source: &mut R,
    buffer_size: usize,
) -> Result<u64>
where
    S: SeekSink + ?Sized,
    R: Source + ?Sized,
{
    write_field_from(sink, header.name_width(), source, buffer_size)
}

/// Write a value field from a byte slice.
pub fn write_value<S: Sink + ?Sized>(header: &Header, sink: &mut S, value: &[u8]) -> Result<u64> {
    write_field(sink, header.value_width(), value)
}

/// Write a value field streamed from `source`.
pub fn write_value_from<S, R>(
    header: &Header,
    sink: &mut S,
    source: &mut R,
    buffer_size: usize,
) -> Result<u64>
where
    S: SeekSink + ?Sized,
    R: Source + ?Sized,
{
    write_field_from(sink, header.value_width(), source, buffer_size)
}

/// Write a name field, then a value field, from byte slices.
///
/// Both lengths are checked first, so a rejected pair leaves the sink
/// untouched.
pub fn write_pair<S: Sink + ?Sized>(
    header: &Header,
    sink: &mut S,
    name: &[u8],
    value: &[u8],
) -> Result<()> {
    check_pair_lengths(header, Some(name.len() as u64), Some(value.len() as u64))?;
    write_name(header, sink, name)?;
    write_value(header, sink, value)?;
    trace!(name_len = name.len(), value_len = value.len(), "wrote pair");
    Ok(())
}

/// Write a name field, then a value field, each from any [`FieldInput`].
///
/// Lengths known up front are checked before anything is written.
pub fn write_pair_with<S, N, V>(header: &Header, sink: &mut S, name: N, value: V) -> Result<()>
where
    S: SeekSink + ?Sized,
    N: FieldInput,
    V: FieldInput,
{
    check_pair_lengths(header, name.known_len(), value.known_len())?;
    let name_len = name.write_field_to(sink, header.name_width())?;
    let value_len = value.write_field_to(sink, header.value_width())?;
    trace!(name_len, value_len, "wrote pair");
    Ok(())
}

/// Reject a pair whose known lengths exceed the header's maxima.
pub(crate) fn check_pair_lengths(
    header: &Header,
    name_len: Option<u64>,
    value_len: Option<u64>,
) -> Result<()> {
    for (len, max) in [
        (name_len, header.name_max_length()),
        (value_len, header.value_max_length()),
    ] {
        if let Some(len) = len.filter(|&len| len > max) {
            return Err(BdpError::FieldTooLong { len, max });
        }
    }
    Ok(())
}

/// Read a name field into a new buffer.
pub fn read_name<R: Source + ?Sized>(header: &Header, source: &mut R) -> Result<Field> {
    read_kind(header, source, FieldKind::Name, &CodecConfig::default())
}

/// Read a name field, copying it into `sink`.
pub fn read_name_into<R, S>(
    header: &Header,
    source: &mut R,
    sink: &mut S,
    buffer_size: usize,
) -> Result<FieldCopy>
where
    R: Source + ?Sized,
    S: Sink + ?Sized,
{
    read_field_into(source, header.name_width(), sink, buffer_size)
}

/// Read a value field into a new buffer.
pub fn read_value<R: Source + ?Sized>(header: &Header, source: &mut R) -> Result<Field> {
    read_kind(header, source, FieldKind::Value, &CodecConfig::default())
}

/// Read a value field, copying it into `sink`.
pub fn read_value_into<R, S>(
    header: &Header,
    source: &mut R,
    sink: &mut S,
    buffer_size: usize,
) -> Result<FieldCopy>
where
    R: Source + ?Sized,
    S: Sink + ?Sized,
{
    read_field_into(source, header.value_width(), sink, buffer_size)
}

/// Read a name field, then a value field, into new buffers.
pub fn read_pair<R: Source + ?Sized>(header: &Header, source: &mut R) -> Result<Pair> {
    read_pair_with(header, source, &CodecConfig::default())
}

/// Read a pair into new buffers under an explicit configuration.
pub fn read_pair_with<R: Source + ?Sized>(
    header: &Header,
    source: &mut R,
    config: &CodecConfig,
) -> Result<Pair> {
    let name = read_kind(header, source, FieldKind::Name, config)?;
    let value = read_kind(header, source, FieldKind::Value, config)?;
    Ok(Pair { name, value })
}

/// Read a name field into `name_sink`, then a value field into `value_sink`.
pub fn read_pair_into<R, N, V>(
    header: &Header,
    source: &mut R,
    name_sink: &mut N,
    value_sink: &mut V,
    buffer_size: usize,
) -> Result<(FieldCopy, FieldCopy)>
where
    R: Source + ?Sized,
    N: Sink + ?Sized,
    V: Sink + ?Sized,
{
    let name = read_name_into(header, source, name_sink, buffer_size)?;
    let value = read_value_into(header, source, value_sink, buffer_size)?;
    Ok((name, value))
}

pub(crate) fn read_kind<R: Source + ?Sized>(
    header: &Header,
    source: &mut R,
    kind: FieldKind,
    config: &CodecConfig,
) -> Result<Field> {
    read_field_with(source, kind.width(header), config)
}
