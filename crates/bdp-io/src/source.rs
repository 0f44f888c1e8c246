use std::io::{ErrorKind, Read};

/// A sequential byte origin.
///
/// Implemented for every [`Read`]. A return value of `0` from a non-empty
/// request means the source is exhausted.
pub trait Source {
    /// Read at most `buf.len()` bytes into `buf`.
    ///
    /// `Interrupted` is retried; every other error is returned as-is.
    fn read_up_to(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Keep reading until `buf` is full or the source is exhausted.
    ///
    /// Returns how many bytes were placed in `buf`. A short count is not an
    /// error here; callers decide whether it matters.
    fn read_fill(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.read_up_to(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }
}

impl<R: Read + ?Sized> Source for R {
    fn read_up_to(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            match self.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}
