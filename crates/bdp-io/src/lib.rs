//! I/O capabilities for the BDP package codec.
//!
//! The codec never talks to concrete buffer or stream types. It is written
//! once against three small capabilities:
//! - [`Sink`]: append bytes in order
//! - [`SeekSink`]: a sink that can revisit an earlier position and patch it
//! - [`Source`]: read up to `n` bytes, with `0` meaning the source is exhausted
//!
//! Every `std::io::Write` is a [`Sink`], every `Write + Seek` is a
//! [`SeekSink`], and every `std::io::Read` is a [`Source`]. In-memory use goes
//! through `Vec<u8>`, `&[u8]` and `std::io::Cursor`.

pub mod sink;
pub mod source;

pub use sink::{SeekSink, Sink};
pub use source::Source;
