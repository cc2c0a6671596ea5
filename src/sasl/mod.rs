//! Types related to SASL authentication which D-Bus performs.
//!
//! Before the binary protocol starts the client sends a NUL byte followed by
//! an `AUTH` line, and waits for the bus to answer `OK <guid>`. The client then
//! sends `BEGIN` after which the stream carries messages.


use std::fmt;

use crate::error::{Error, ErrorKind, Result};

/// The line which ends authentication.
pub const BEGIN: &[u8] = b"BEGIN\r\n";

/// The longest line accepted from the server during authentication.
pub const MAX_LINE_LENGTH: usize = 16 * 1024;

/// The GUID of the server, sent with `OK`.
#[derive(Clone, PartialEq, Eq)]
pub struct Guid(Box<str>);

impl Guid {
    #[inline]
    fn new(guid: &[u8]) -> Guid {
        Guid(String::from_utf8_lossy(guid).into())
    }

    /// Get the GUID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guid").field(&self.0).finish()
    }
}

impl fmt::Display for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The SASL authentication method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// EXTERNAL authentication with a hex-encoded payload.
    External(Box<[u8]>),
    /// ANONYMOUS authentication with a hex-encoded trace.
    Anonymous(Box<[u8]>),
}

impl Auth {
    /// Construct external authentication for the effective user id of the
    /// current process.
    #[cfg(all(unix, feature = "libc"))]
    pub fn external_from_uid() -> Auth {
        // SAFETY: geteuid is always successful.
        let id = unsafe { libc::geteuid() };
        Self::external_from_u32(id)
    }

    /// Construct external authentication from a user id.
    ///
    /// The payload is the decimal user id in ASCII, hex encoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_wire::sasl::Auth;
    ///
    /// assert_eq!(Auth::external_from_u32(1000), Auth::External(Box::from(&b"31303030"[..])));
    /// ```
    pub fn external_from_u32(id: u32) -> Auth {
        Auth::External(hex(id.to_string().as_bytes()))
    }

    /// Construct anonymous authentication with the given trace.
    pub fn anonymous(trace: &str) -> Auth {
        Auth::Anonymous(hex(trace.as_bytes()))
    }

    /// The name of the mechanism.
    pub fn mechanism(&self) -> &'static str {
        match self {
            Auth::External(..) => "EXTERNAL",
            Auth::Anonymous(..) => "ANONYMOUS",
        }
    }

    /// The bytes which start authentication, including the leading NUL byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_wire::sasl::Auth;
    ///
    /// let auth = Auth::external_from_u32(0);
    /// assert_eq!(auth.request_line(), b"\0AUTH EXTERNAL 30\r\n");
    /// ```
    pub fn request_line(&self) -> Vec<u8> {
        let (Auth::External(payload) | Auth::Anonymous(payload)) = self;

        let mut line = Vec::with_capacity(16 + payload.len());
        line.extend_from_slice(b"\0AUTH ");
        line.extend_from_slice(self.mechanism().as_bytes());
        line.push(b' ');
        line.extend_from_slice(payload);
        line.extend_from_slice(b"\r\n");
        line
    }
}

impl Default for Auth {
    /// External authentication for the current user.
    #[cfg(all(unix, feature = "libc"))]
    fn default() -> Self {
        Self::external_from_uid()
    }

    /// Anonymous authentication, since the user id is unavailable.
    #[cfg(not(all(unix, feature = "libc")))]
    fn default() -> Self {
        Self::anonymous(concat!("dbus-wire ", env!("CARGO_PKG_VERSION")))
    }
}

fn hex(bytes: &[u8]) -> Box<[u8]> {
    const HEX: [u8; 16] = *b"0123456789abcdef";

    let mut out = Vec::with_capacity(bytes.len() * 2);

    for &b in bytes {
        out.push(HEX[(b >> 4) as usize]);
        out.push(HEX[(b & 0xf) as usize]);
    }

    out.into()
}

/// Parses the server side of the handshake.
///
/// # Examples
///
/// ```
/// use dbus_wire::sasl::SaslParser;
///
/// let mut parser = SaslParser::new();
/// assert!(!parser.feed(b"OK 1234")?);
/// assert!(parser.feed(b"abcd\r\nl\x01")?);
/// assert_eq!(parser.guid().map(|g| g.as_str()), Some("1234abcd"));
/// assert_eq!(parser.into_remaining(), b"l\x01");
/// # Ok::<_, dbus_wire::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct SaslParser {
    buffer: Vec<u8>,
    scanned: usize,
    guid: Option<Guid>,
}

impl SaslParser {
    /// Construct a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes received from the server.
    ///
    /// Returns `true` once authentication succeeded. Bytes after the `OK` line
    /// are kept and can be taken with [`SaslParser::into_remaining`].
    ///
    /// # Errors
    ///
    /// Errors with the received line if it is anything but `OK`, or if no
    /// line ending arrives within [`MAX_LINE_LENGTH`] bytes.
    pub fn feed(&mut self, data: &[u8]) -> Result<bool> {
        self.buffer.extend_from_slice(data);

        if self.guid.is_some() {
            return Ok(true);
        }

        // The `\r` of a line ending may be the last byte scanned so far.
        let from = self.scanned.saturating_sub(1);

        let Some(at) = self.buffer[from..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|n| from + n)
        else {
            if self.buffer.len() > MAX_LINE_LENGTH {
                return Err(Error::new(ErrorKind::AuthLineTooLong(self.buffer.len())));
            }

            self.scanned = self.buffer.len();
            return Ok(false);
        };

        if at > MAX_LINE_LENGTH {
            return Err(Error::new(ErrorKind::AuthLineTooLong(at)));
        }

        let line = &self.buffer[..at];

        let Some(guid) = line.strip_prefix(b"OK ") else {
            return Err(Error::new(ErrorKind::Authentication(line.into())));
        };

        self.guid = Some(Guid::new(guid));
        self.buffer.drain(..at + 2);
        Ok(true)
    }

    /// Test if authentication succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.guid.is_some()
    }

    /// The GUID sent by the server.
    pub fn guid(&self) -> Option<&Guid> {
        self.guid.as_ref()
    }

    /// Take the bytes received after the `OK` line. They belong to the
    /// message stream.
    pub fn into_remaining(self) -> Vec<u8> {
        self.buffer
    }
}
