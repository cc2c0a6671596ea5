use std::collections::HashMap;
use std::sync::Arc;

use crate::signature::{parse_all, Signature, SignatureError};
use crate::ty::Type;

/// The number of distinct signatures kept before the cache is reset.
const MAX_ENTRIES: usize = 512;

/// A cache of parsed signatures keyed by their string form.
///
/// Parsed types are immutable, so the same descriptors are shared across all
/// messages using a signature.
///
/// # Examples
///
/// ```
/// use dbus_wire::SignatureCache;
///
/// let mut cache = SignatureCache::new();
/// let a = cache.get("a{sv}")?;
/// let b = cache.get("a{sv}")?;
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// # Ok::<_, dbus_wire::SignatureError>(())
/// ```
#[derive(Debug, Default)]
pub struct SignatureCache {
    entries: HashMap<Box<str>, Arc<[Type]>>,
}

impl SignatureCache {
    /// Construct an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the parsed types of `signature`, parsing it if needed.
    pub fn get(&mut self, signature: &str) -> Result<Arc<[Type]>, SignatureError> {
        if let Some(types) = self.entries.get(signature) {
            return Ok(types.clone());
        }

        let types: Arc<[Type]> = parse_all(signature)?.into();

        if self.entries.len() >= MAX_ENTRIES {
            self.entries.clear();
        }

        self.entries.insert(signature.into(), types.clone());
        Ok(types)
    }

    /// Get a [`Signature`] for the given string, parsing it if needed.
    pub fn signature(&mut self, signature: &str) -> Result<Signature, SignatureError> {
        let types = self.get(signature)?;
        Ok(Signature::from_parts(signature, types))
    }

    /// The number of cached signatures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Test if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
