//! Binary Data Package: a minimal container for name/value byte pairs.
//!
//! Each package declares, in a single control byte, how wide the length
//! prefixes of its names and values are (8, 16, 32 or 64 bits). Fields can be
//! written from slices or streamed from any reader, and read back either into
//! owned buffers or straight into another writer.
//!
//! # Crate Structure
//!
//! - [`io`]: sink and source capabilities the codec is written against
//! - [`codec`]: headers, fields, pairs, and the stateful package reader/writer
//!
//! ```
//! use bdp::codec::{PackageReader, PackageWriter};
//!
//! let mut writer = PackageWriter::create(Vec::<u8>::new(), 8, 32)?;
//! writer.write_pair(b"greeting", b"hello")?;
//! let wire = writer.finish()?;
//!
//! let mut reader = PackageReader::open(wire.as_slice())?;
//! let pair = reader.read_pair()?;
//! assert_eq!(pair.value.as_bytes(), b"hello");
//! # Ok::<(), bdp::codec::BdpError>(())
//! ```

/// Re-export I/O capability traits.
pub mod io {
    pub use bdp_io::*;
}

/// Re-export codec types.
pub mod codec {
    pub use bdp_codec::*;
}
