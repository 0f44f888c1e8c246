use std::io::{Read, Seek, Write};

use bdp_io::Sink;
use tracing::debug;

use crate::config::CodecConfig;
use crate::error::{BdpError, Result};
use crate::field::FieldKind;
use crate::header::{write_header, Header};
use crate::pair::{self, FieldInput};

/// Writes one package to any `Write` stream.
///
/// The header goes out on construction. After that the writer enforces the
/// name/value alternation: asking for a value while a name is due (or the
/// reverse) fails with `OutOfOrder` and writes nothing. A pair whose slice
/// lengths do not fit the header is rejected with `FieldTooLong` before any of
/// it is written.
///
/// An I/O error can leave a field half written. The writer is poisoned after
/// one and every later field operation fails with `Poisoned`.
///
/// Slice-backed fields work on any `Write`. Streamed fields need `Write + Seek`
/// because their length prefix is patched after the body is copied.
pub struct PackageWriter<T> {
    inner: T,
    header: Header,
    config: CodecConfig,
    next: FieldKind,
    poisoned: bool,
}

impl<T: Write> PackageWriter<T> {
    /// Write a header with the given prefix widths and return a writer for
    /// the rest of the package.
    pub fn create(inner: T, name_bits: u8, value_bits: u8) -> Result<Self> {
        Self::create_with_config(inner, name_bits, value_bits, CodecConfig::default())
    }

    /// Like [`PackageWriter::create`], with explicit configuration.
    pub fn create_with_config(
        mut inner: T,
        name_bits: u8,
        value_bits: u8,
        config: CodecConfig,
    ) -> Result<Self> {
        let header = write_header(&mut inner, name_bits, value_bits)?;
        Ok(Self {
            inner,
            header,
            config,
            next: FieldKind::Name,
            poisoned: false,
        })
    }

    /// Write the name half of a pair.
    pub fn write_name(&mut self, name: &[u8]) -> Result<()> {
        self.check_next(FieldKind::Name)?;
        let result = pair::write_name(&self.header, &mut self.inner, name);
        self.track(result)?;
        self.next = FieldKind::Value;
        Ok(())
    }

    /// Write the value half of a pair.
    pub fn write_value(&mut self, value: &[u8]) -> Result<()> {
        self.check_next(FieldKind::Value)?;
        let result = pair::write_value(&self.header, &mut self.inner, value);
        self.track(result)?;
        self.next = FieldKind::Name;
        Ok(())
    }

    /// Write a complete name/value pair.
    pub fn write_pair(&mut self, name: &[u8], value: &[u8]) -> Result<()> {
        self.check_next(FieldKind::Name)?;
        pair::check_pair_lengths(
            &self.header,
            Some(name.len() as u64),
            Some(value.len() as u64),
        )?;
        self.write_name(name)?;
        self.write_value(value)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush_sink().map_err(BdpError::Io)
    }

    /// Header this package was opened with.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Which half of a pair the writer expects next.
    pub fn next_field(&self) -> FieldKind {
        self.next
    }

    /// True once an I/O error has left the package in an unknown state.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    ///
    /// Writing to it directly bypasses the name/value bookkeeping.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Flush and return the inner stream.
    pub fn finish(mut self) -> Result<T> {
        if self.next == FieldKind::Value {
            debug!("package finished after a name without its value");
        }
        self.flush()?;
        Ok(self.inner)
    }

    /// Consume the writer and return the inner stream without flushing.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the chunk size for subsequent streamed fields.
    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.config.buffer_size = buffer_size;
    }

    /// Current writer configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn check_next(&self, kind: FieldKind) -> Result<()> {
        if self.poisoned {
            return Err(BdpError::Poisoned);
        }
        if self.next != kind {
            return Err(BdpError::OutOfOrder {
                expected: self.next,
            });
        }
        Ok(())
    }

    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(BdpError::Io(err)) = &result {
            debug!(%err, "package writer poisoned");
            self.poisoned = true;
        }
        result
    }
}

impl<T: Write + Seek> PackageWriter<T> {
    /// Stream the name half of a pair from `source`.
    ///
    /// Input beyond the header's name maximum is not stored. Returns the
    /// stored length.
    pub fn write_name_from<R: Read>(&mut self, mut source: R) -> Result<u64> {
        self.check_next(FieldKind::Name)?;
        let result = pair::write_name_from(
            &self.header,
            &mut self.inner,
            &mut source,
            self.config.buffer_size,
        );
        let len = self.track(result)?;
        self.next = FieldKind::Value;
        Ok(len)
    }

    /// Stream the value half of a pair from `source`.
    ///
    /// Input beyond the header's value maximum is not stored. Returns the
    /// stored length.
    pub fn write_value_from<R: Read>(&mut self, mut source: R) -> Result<u64> {
        self.check_next(FieldKind::Value)?;
        let result = pair::write_value_from(
            &self.header,
            &mut self.inner,
            &mut source,
            self.config.buffer_size,
        );
        let len = self.track(result)?;
        self.next = FieldKind::Name;
        Ok(len)
    }

    /// Write a pair whose halves may each be a slice or a [`Streamed`] reader.
    ///
    /// [`Streamed`]: crate::pair::Streamed
    pub fn write_pair_with<N, V>(&mut self, name: N, value: V) -> Result<()>
    where
        N: FieldInput,
        V: FieldInput,
    {
        self.check_next(FieldKind::Name)?;
        pair::check_pair_lengths(&self.header, name.known_len(), value.known_len())?;

        let result = name.write_field_to(&mut self.inner, self.header.name_width());
        self.track(result)?;
        self.next = FieldKind::Value;

        let result = value.write_field_to(&mut self.inner, self.header.value_width());
        self.track(result)?;
        self.next = FieldKind::Name;
        Ok(())
    }
}
