//! Binary Data Package (BDP) codec.
//!
//! A package is a 4-byte header followed by any number of name/value pairs:
//! - "BDP" magic
//! - one control byte: name length width in the high nibble, value length
//!   width in the low nibble, each one-hot over 8/16/32/64 bits
//! - per pair: `[name len][name][value len][value]`, lengths big-endian
//!
//! There is no terminator or pair count. A reader stops when its source is
//! exhausted at a pair boundary.
//!
//! Streamed writes need a sink that can seek back and patch the length prefix
//! once the body has been copied. Reads only need a forward source. See
//! [`PackageWriter`] and [`PackageReader`] for the stateful API, the free
//! functions in [`header`], [`field`] and [`pair`] for the low-level one, and
//! [`codec`] for incremental decoding out of a `BytesMut`.

pub mod codec;
pub mod config;
pub mod error;
pub mod field;
pub mod header;
pub mod integer;
pub mod pair;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_package_header, decode_pair, encode_field, encode_package_header, encode_pair,
};
pub use config::{CodecConfig, HeaderPolicy, DEFAULT_BUFFER_SIZE};
pub use error::{BdpError, Result};
pub use field::{Field, FieldCopy, FieldKind};
pub use header::{decode_header, encode_header, read_header, read_header_with, write_header};
pub use header::{Header, HEADER_SIZE, MAGIC};
pub use integer::{decode_uint, encode_uint, max_length, LengthWidth};
pub use pair::{
    read_pair, read_pair_into, read_pair_with, write_pair, write_pair_with, FieldInput, Pair,
    Streamed,
};
pub use reader::{PackageReader, Pairs};
pub use writer::PackageWriter;
