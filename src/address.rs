//! Resolution of bus addresses to unix socket paths.

use std::env;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result};

const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const DEFAULT_SYSTEM_BUS: &str = "unix:path=/var/run/dbus/system_bus_socket";

/// The address of a bus, which is the path of a unix domain socket.
///
/// # Examples
///
/// ```
/// use dbus_wire::BusAddress;
///
/// let address = BusAddress::parse("unix:path=/run/user/1000/bus,guid=1234")?;
/// assert_eq!(address.path(), std::path::Path::new("/run/user/1000/bus"));
///
/// let address = BusAddress::parse("tcp:host=localhost;unix:path=/tmp/bus")?;
/// assert_eq!(address.path(), std::path::Path::new("/tmp/bus"));
///
/// assert!(BusAddress::parse("tcp:host=localhost,port=1").is_err());
/// # Ok::<_, dbus_wire::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusAddress {
    path: PathBuf,
}

impl BusAddress {
    /// The address of the session bus.
    ///
    /// This uses the `DBUS_SESSION_BUS_ADDRESS` environment variable to
    /// determine its address.
    pub fn session() -> Result<Self> {
        Self::from_env(ENV_SESSION_BUS, None)
    }

    /// The address of the system bus.
    ///
    /// This uses the `DBUS_SYSTEM_BUS_ADDRESS` environment variable to
    /// determine its address or fallback to the well-known address
    /// `unix:path=/var/run/dbus/system_bus_socket`.
    pub fn system() -> Result<Self> {
        Self::from_env(ENV_SYSTEM_BUS, Some(DEFAULT_SYSTEM_BUS))
    }

    /// Construct an address directly from a socket path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse an address string.
    ///
    /// Entries are separated by `;` and the first `unix:path=` entry is used.
    pub fn parse(address: &str) -> Result<Self> {
        parse_address_bytes(address.as_bytes())
    }

    /// The path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn from_env(env: &str, default: Option<&str>) -> Result<Self> {
        match env::var_os(env) {
            Some(address) => parse_address_bytes(address.as_bytes()),
            None => match default {
                Some(default) => Self::parse(default),
                None => Err(Error::new(ErrorKind::MissingBus)),
            },
        }
    }
}

fn parse_address_bytes(bytes: &[u8]) -> Result<BusAddress> {
    for entry in bytes.split(|&b| b == b';') {
        let Some(rest) = entry.strip_prefix(b"unix:") else {
            continue;
        };

        for pair in rest.split(|&b| b == b',') {
            if let Some(path) = pair.strip_prefix(b"path=") {
                if path.is_empty() {
                    break;
                }

                return Ok(BusAddress::from_path(OsStr::from_bytes(path)));
            }
        }
    }

    Err(Error::new(ErrorKind::InvalidAddress))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::BusAddress;

    #[test]
    fn addresses() {
        let address = BusAddress::parse("unix:path=/run/dbus/system_bus_socket");
        assert!(address.is_ok_and(|a| a.path() == Path::new("/run/dbus/system_bus_socket")));

        let address = BusAddress::parse("unix:guid=abc,path=/tmp/x");
        assert!(address.is_ok_and(|a| a.path() == Path::new("/tmp/x")));

        let address = BusAddress::parse("unix:abstract=/tmp/dbus-XXXX;unix:path=/tmp/y");
        assert!(address.is_ok_and(|a| a.path() == Path::new("/tmp/y")));

        assert!(BusAddress::parse("").is_err());
        assert!(BusAddress::parse("unix:path=").is_err());
        assert!(BusAddress::parse("unix:abstract=/tmp/dbus-XXXX").is_err());
        assert!(BusAddress::parse("path=/tmp/x").is_err());
    }
}
