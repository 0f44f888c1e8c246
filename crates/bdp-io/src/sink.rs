use std::io::{ErrorKind, Seek, SeekFrom, Write};

use tracing::trace;

/// An ordered byte destination.
///
/// Implemented for every [`Write`]. Appends are all-or-error: partial writes
/// are continued internally and `Interrupted`/`WouldBlock` are retried.
pub trait Sink {
    /// Append `bytes` after everything written so far.
    fn append_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Flush any buffered bytes to the underlying destination.
    fn flush_sink(&mut self) -> std::io::Result<()>;
}

/// A sink that can go back and overwrite bytes it already emitted.
///
/// Streaming field writes need this: the length prefix is only known once the
/// source is drained, so a placeholder is written first and patched later.
pub trait SeekSink: Sink {
    /// Current write position, measured from the start of the sink.
    fn position(&mut self) -> std::io::Result<u64>;

    /// Overwrite `bytes.len()` bytes at `position`, then return the write
    /// position to where it was before the call.
    fn patch(&mut self, position: u64, bytes: &[u8]) -> std::io::Result<()>;
}

impl<W: Write + ?Sized> Sink for W {
    fn append_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.write(&bytes[offset..]) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn flush_sink(&mut self) -> std::io::Result<()> {
        loop {
            match self.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

impl<W: Write + Seek + ?Sized> SeekSink for W {
    fn position(&mut self) -> std::io::Result<u64> {
        self.stream_position()
    }

    fn patch(&mut self, position: u64, bytes: &[u8]) -> std::io::Result<()> {
        let end = self.stream_position()?;
        trace!(position, end, len = bytes.len(), "patching sink");

        self.seek(SeekFrom::Start(position))?;
        self.append_bytes(bytes)?;
        self.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn append_to_vec() {
        let mut out = Vec::<u8>::new();
        out.append_bytes(b"BDP").unwrap();
        out.append_bytes(b"").unwrap();
        out.append_bytes(&[0x11]).unwrap();
        assert_eq!(out, b"BDP\x11");
    }

    #[test]
    fn append_through_mutable_reference() {
        fn emit<S: Sink + ?Sized>(sink: &mut S) {
            sink.append_bytes(b"abc").unwrap();
        }

        let mut out = Vec::<u8>::new();
        emit(&mut out);
        emit(&mut &mut out);
        assert_eq!(out, b"abcabc");
    }

    #[test]
    fn patch_restores_write_position() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        cursor.append_bytes(b"xx").unwrap();
        let placeholder = cursor.position();
        cursor.append_bytes(&[0, 0]).unwrap();
        cursor.append_bytes(b"payload").unwrap();

        SeekSink::patch(&mut cursor, placeholder, &[0x00, 0x07]).unwrap();
        assert_eq!(SeekSink::position(&mut cursor).unwrap(), 11);

        cursor.append_bytes(b"!").unwrap();
        assert_eq!(cursor.into_inner(), b"xx\x00\x07payload!");
    }

    #[test]
    fn short_writes_are_continued() {
        let mut sink = OneByteWriter::default();
        sink.append_bytes(b"hello").unwrap();
        assert_eq!(sink.data, b"hello");
    }

    #[test]
    fn interrupted_write_and_flush_retry() {
        let mut sink = InterruptedOnce::default();
        sink.append_bytes(b"retry").unwrap();
        sink.flush_sink().unwrap();
        assert_eq!(sink.data, b"retry");
        assert!(sink.flushed);
    }

    #[test]
    fn zero_write_is_an_error() {
        let err = ZeroWriter.append_bytes(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }

    #[test]
    fn other_errors_propagate() {
        let err = BrokenPipe.append_bytes(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[derive(Default)]
    struct OneByteWriter {
        data: Vec<u8>,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct InterruptedOnce {
        wrote_once: bool,
        flush_interrupted: bool,
        flushed: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.flushed = true;
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
