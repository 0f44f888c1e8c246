/// Default chunk size for streaming field copies: 16 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// How to treat a header control byte with an empty width nibble.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Reject the header as `InvalidControlByte`.
    #[default]
    Strict,
    /// Fall back to an 8-bit name width and a 32-bit value width, logging a
    /// warning each time the fallback fires.
    Lenient,
}

/// Configuration for package readers and writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Chunk size used when copying a field through a stream. Default: 16 KiB.
    pub buffer_size: usize,
    /// Upper bound on a declared field length accepted on read. `None`
    /// accepts anything the width allows.
    pub max_field_length: Option<u64>,
    /// Header control byte handling on read.
    pub header_policy: HeaderPolicy,
}

impl CodecConfig {
    /// Effective read limit: the configured maximum, or `u64::MAX`.
    pub fn field_limit(&self) -> u64 {
        self.max_field_length.unwrap_or(u64::MAX)
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_field_length: None,
            header_policy: HeaderPolicy::Strict,
        }
    }
}
