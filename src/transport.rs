//! Helpers for moving bytes over a socket.

use std::io::{self, Read, Write};

use crate::error::{Error, ErrorKind, Result};
use crate::sasl::{Auth, Guid, SaslParser, BEGIN};

/// The number of bytes read from the socket at a time.
pub(crate) const RECV_CHUNK: usize = 4096;

/// Write all of `bytes` and flush.
pub(crate) fn send_all<W>(stream: &mut W, bytes: &[u8]) -> Result<()>
where
    W: ?Sized + Write,
{
    stream.write_all(bytes)?;
    stream.flush()?;
    tracing::trace!(len = bytes.len(), "sent");
    Ok(())
}

/// Read whatever is available into `buf`.
///
/// An empty read means the peer closed the socket, which is reported as a
/// connection reset rather than as zero bytes.
pub(crate) fn recv_some<'a, R>(stream: &mut R, buf: &'a mut [u8]) -> Result<&'a [u8]>
where
    R: ?Sized + Read,
{
    loop {
        match stream.read(buf) {
            Ok(0) => return Err(Error::new(ErrorKind::ConnectionReset)),
            Ok(n) => return Ok(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Perform the SASL handshake over a blocking stream.
///
/// Returns the GUID of the server and the bytes received after its `OK`
/// line, which belong to the message stream.
pub(crate) fn authenticate<S>(stream: &mut S, auth: &Auth) -> Result<(Guid, Vec<u8>)>
where
    S: ?Sized + Read + Write,
{
    send_all(stream, &auth.request_line())?;

    let mut sasl = SaslParser::new();
    let mut buf = [0; RECV_CHUNK];

    while !sasl.feed(recv_some(stream, &mut buf)?)? {}

    send_all(stream, BEGIN)?;
    finish(sasl)
}

/// Split a successful handshake into its GUID and the remaining bytes.
pub(crate) fn finish(sasl: SaslParser) -> Result<(Guid, Vec<u8>)> {
    let Some(guid) = sasl.guid().cloned() else {
        return Err(Error::new(ErrorKind::ConnectionReset));
    };

    tracing::debug!(%guid, "authenticated");
    Ok((guid, sasl.into_remaining()))
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Write};

    use crate::sasl::Auth;
    use crate::Result;

    use super::{authenticate, recv_some};

    /// A stream which reads from a fixed buffer and records writes.
    struct Script {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Script {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_read_is_reset() {
        let mut stream = Cursor::new(Vec::new());
        let mut buf = [0; 16];
        let error = recv_some(&mut stream, &mut buf).unwrap_err();
        assert!(error.is_connection_reset());
    }

    #[test]
    fn handshake() -> Result<()> {
        let mut stream = Script {
            input: Cursor::new(b"OK 0f0f\r\nl\x01\x00\x01".to_vec()),
            output: Vec::new(),
        };

        let (guid, remaining) = authenticate(&mut stream, &Auth::external_from_u32(0))?;
        assert_eq!(guid.as_str(), "0f0f");
        assert_eq!(remaining, b"l\x01\x00\x01");
        assert_eq!(stream.output, b"\0AUTH EXTERNAL 30\r\nBEGIN\r\n");
        Ok(())
    }

    #[test]
    fn handshake_rejected() {
        let mut stream = Script {
            input: Cursor::new(b"REJECTED EXTERNAL\r\n".to_vec()),
            output: Vec::new(),
        };

        let error = authenticate(&mut stream, &Auth::external_from_u32(0)).unwrap_err();
        assert_eq!(error.auth_line(), Some(&b"REJECTED EXTERNAL"[..]));
        assert!(!stream.output.ends_with(b"BEGIN\r\n"));
    }

    #[test]
    fn handshake_closed() {
        let mut stream = Script {
            input: Cursor::new(b"OK 12".to_vec()),
            output: Vec::new(),
        };

        let error = authenticate(&mut stream, &Auth::external_from_u32(0)).unwrap_err();
        assert!(error.is_connection_reset());
    }
}
