//! Validation of object paths.
//!
//! The following rules define a [valid object path]. Implementations must not
//! send or accept messages with invalid object paths.
//!
//! [valid object path]: https://dbus.freedesktop.org/doc/dbus-specification.html#message-protocol-marshaling-object-path
//!
//! * The path may be of any length.
//! * The path must begin with an ASCII '/' (integer 47) character, and must
//!   consist of elements separated by slash characters.
//! * Each element must only contain the ASCII characters "[A-Z][a-z][0-9]_"
//! * No element may be the empty string.
//! * Multiple '/' characters cannot occur in sequence.
//! * A trailing '/' character is not allowed unless the path is the root path
//!   (a single '/' character).

use crate::error::{Error, ErrorKind, Result};

/// The root object path.
pub const ROOT: &str = "/";

/// Test if `path` is a valid object path.
///
/// # Examples
///
/// ```
/// use dbus_wire::object_path::is_valid;
///
/// assert!(is_valid("/"));
/// assert!(is_valid("/org/freedesktop/DBus"));
/// assert!(is_valid("/org/freedesktop/secrets/collection/login_1"));
/// assert!(!is_valid("org/freedesktop"));
/// assert!(!is_valid("/org//freedesktop"));
/// assert!(!is_valid("/org/"));
/// ```
pub const fn is_valid(path: &str) -> bool {
    validate(path.as_bytes())
}

/// Check that `path` is valid, raising a marshalling error otherwise.
pub(crate) fn check(path: &str) -> Result<()> {
    if !is_valid(path) {
        return Err(Error::new(ErrorKind::InvalidObjectPath(path.into())));
    }

    Ok(())
}

const fn validate(bytes: &[u8]) -> bool {
    let [b'/', bytes @ ..] = bytes else {
        return false;
    };

    // Special case: "/" is a valid path.
    if bytes.is_empty() {
        return true;
    }

    let mut bytes = bytes;
    let mut component = false;

    while let [b, rest @ ..] = bytes {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' => {
                component = true;
            }
            b'/' => {
                if !component {
                    return false;
                }

                component = false;
            }
            _ => {
                return false;
            }
        }

        bytes = rest;
    }

    component
}

#[cfg(test)]
mod tests {
    use super::is_valid;

    #[test]
    fn object_paths() {
        assert!(is_valid("/"));
        assert!(is_valid("/a"));
        assert!(is_valid("/a_b/C0"));
        assert!(is_valid("/org/freedesktop/secrets/aliases/default"));

        assert!(!is_valid(""));
        assert!(!is_valid("//"));
        assert!(!is_valid("/a/"));
        assert!(!is_valid("a/b"));
        assert!(!is_valid("/a-b"));
        assert!(!is_valid("/a.b"));
        assert!(!is_valid("/ä"));
    }
}
