use std::io::{Read, Write};

use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::{BdpError, Result};
use crate::field::{read_body, try_read_length, Field, FieldCopy, FieldKind};
use crate::header::{read_header_with, Header};
use crate::pair::{self, Pair};

/// Reads one package from any `Read` stream.
///
/// The header is read and validated on construction. Fields must then be read
/// in the order they were written; asking for a value while a name is due (or
/// the reverse) fails with `OutOfOrder` without consuming input.
///
/// Any other failure may leave the stream inside a field (a rejected length
/// prefix has already been consumed, for one). The reader is poisoned after
/// such an error and every later field operation fails with `Poisoned`.
pub struct PackageReader<T> {
    inner: T,
    header: Header,
    config: CodecConfig,
    next: FieldKind,
    poisoned: bool,
}

impl<T: Read> PackageReader<T> {
    /// Read the package header from `inner` with default configuration.
    pub fn open(inner: T) -> Result<Self> {
        Self::open_with_config(inner, CodecConfig::default())
    }

    /// Read the package header from `inner` with explicit configuration.
    pub fn open_with_config(mut inner: T, config: CodecConfig) -> Result<Self> {
        let header = read_header_with(&mut inner, config.header_policy)?;
        Ok(Self {
            inner,
            header,
            config,
            next: FieldKind::Name,
            poisoned: false,
        })
    }

    /// Read the name half of a pair into a new buffer.
    pub fn read_name(&mut self) -> Result<Field> {
        self.read_owned(FieldKind::Name)
    }

    /// Read the value half of a pair into a new buffer.
    pub fn read_value(&mut self) -> Result<Field> {
        self.read_owned(FieldKind::Value)
    }

    /// Read a complete pair into new buffers.
    pub fn read_pair(&mut self) -> Result<Pair> {
        self.check_next(FieldKind::Name)?;
        let name = self.read_owned(FieldKind::Name)?;
        let value = self.read_owned(FieldKind::Value)?;
        Ok(Pair { name, value })
    }

    /// Copy the name half of a pair into `sink`.
    pub fn read_name_into<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<FieldCopy> {
        self.check_next(FieldKind::Name)?;
        let result = pair::read_name_into(
            &self.header,
            &mut self.inner,
            sink,
            self.config.buffer_size,
        );
        let copy = self.track(result)?;
        self.next = FieldKind::Value;
        Ok(copy)
    }

    /// Copy the value half of a pair into `sink`.
    pub fn read_value_into<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<FieldCopy> {
        self.check_next(FieldKind::Value)?;
        let result = pair::read_value_into(
            &self.header,
            &mut self.inner,
            sink,
            self.config.buffer_size,
        );
        let copy = self.track(result)?;
        self.next = FieldKind::Name;
        Ok(copy)
    }

    /// Copy a complete pair into two sinks.
    pub fn read_pair_into<N, V>(
        &mut self,
        name_sink: &mut N,
        value_sink: &mut V,
    ) -> Result<(FieldCopy, FieldCopy)>
    where
        N: Write + ?Sized,
        V: Write + ?Sized,
    {
        let name = self.read_name_into(name_sink)?;
        let value = self.read_value_into(value_sink)?;
        Ok((name, value))
    }

    /// Read the next pair, or `None` if the package ends cleanly here.
    ///
    /// "Cleanly" means the source is exhausted exactly at a pair boundary. An
    /// end inside a length prefix is `Truncated`; an end inside a body yields
    /// a short field, as with every other read.
    pub fn next_pair(&mut self) -> Result<Option<Pair>> {
        self.check_next(FieldKind::Name)?;
        let result = try_read_length(&mut self.inner, self.header.name_width());
        let Some(declared) = self.track(result)? else {
            debug!("reached end of package");
            return Ok(None);
        };
        let result = read_body(&mut self.inner, declared, &self.config);
        let name = self.track(result)?;
        self.next = FieldKind::Value;

        let value = self.read_owned(FieldKind::Value)?;
        Ok(Some(Pair { name, value }))
    }

    /// Iterate over the remaining pairs. Iteration stops after the first error.
    pub fn pairs(&mut self) -> Pairs<'_, T> {
        Pairs {
            reader: self,
            done: false,
        }
    }

    /// Header this package was written with.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Which half of a pair the reader expects next.
    pub fn next_field(&self) -> FieldKind {
        self.next
    }

    /// True once a failed read has left the stream at an unknown position.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the chunk size for subsequent field reads.
    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.config.buffer_size = buffer_size;
    }

    /// Update the largest declared field length accepted by owned reads.
    pub fn set_max_field_length(&mut self, max_field_length: Option<u64>) {
        self.config.max_field_length = max_field_length;
    }

    /// Current reader configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn read_owned(&mut self, kind: FieldKind) -> Result<Field> {
        self.check_next(kind)?;
        let result = pair::read_kind(&self.header, &mut self.inner, kind, &self.config);
        let field = self.track(result)?;
        trace!(%kind, declared = field.declared_len(), read = field.len(), "read field");
        self.next = kind.next();
        Ok(field)
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
        if let Err(err) = &result {
            debug!(%err, "package reader poisoned");
            self.poisoned = true;
        }
        result
    }
}

/// Iterator over the remaining pairs of a [`PackageReader`].
pub struct Pairs<'a, T> {
    reader: &'a mut PackageReader<T>,
    done: bool,
}

impl<T: Read> Iterator for Pairs<'_, T> {
    type Item = Result<Pair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_pair() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
