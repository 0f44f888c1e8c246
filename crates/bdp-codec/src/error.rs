use crate::field::FieldKind;

/// Errors that can occur while writing or reading a package.
#[derive(Debug, thiserror::Error)]
pub enum BdpError {
    /// A length prefix bit size outside {8, 16, 32, 64} was requested.
    #[error("invalid length bit size {bits} (expected 8, 16, 32 or 64)")]
    InvalidConfig { bits: u8 },

    /// The package does not start with the "BDP" magic.
    #[error("invalid package magic {found:02x?} (expected \"BDP\")")]
    InvalidMagic { found: [u8; 3] },

    /// The header control byte does not name a width in one of its nibbles.
    #[error("invalid header control byte 0x{byte:02x}")]
    InvalidControlByte { byte: u8 },

    /// A streaming copy was asked to use a zero-sized buffer.
    #[error("stream buffer size must be non-zero")]
    InvalidBufferSize,

    /// A field is longer than its length prefix (or the configured limit) allows.
    #[error("field too long ({len} bytes, max {max})")]
    FieldTooLong { len: u64, max: u64 },

    /// The input ended inside a header or a length prefix.
    #[error("input ended early ({actual} of {expected} bytes)")]
    Truncated { expected: usize, actual: usize },

    /// A stateful reader or writer was asked for the wrong half of a pair.
    #[error("out of order: expected a {expected} field next")]
    OutOfOrder { expected: FieldKind },

    /// An earlier failure left the stream in the middle of a field, so a
    /// stateful reader or writer refuses any further field operations.
    #[error("package stream unusable after an earlier error")]
    Poisoned,

    /// An I/O error occurred on the underlying sink or source.
    #[error("package I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BdpError {
    /// True when the input is not a package of this format (bad magic or
    /// control byte).
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self,
            BdpError::InvalidMagic { .. } | BdpError::InvalidControlByte { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BdpError>;
