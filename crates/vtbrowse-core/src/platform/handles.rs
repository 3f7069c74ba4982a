/// Continuation handles — filesystem drivers referenced from menu text.
///
/// A directory or partition entry in a generated menu re-invokes
/// `vt_browser_dir` with the filesystem to use. Instead of writing a raw
/// address into the script, the engine registers the driver in a
/// [`HandleTable`] and writes a versioned token:
///
/// ```text
/// 0x01000003
///   ^^        token version (1)
///     ^^^^^^  1-based index into the table
/// ```
///
/// Tokens are parsed strictly; anything that is not exactly `0x` plus eight
/// hex digits, carries another version, or names an empty slot is rejected
/// with [`BrowseError::InvalidHandle`].
use super::FileSystem;
use crate::error::BrowseError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Version tag stored in the top byte of every token.
pub const TOKEN_VERSION: u32 = 1;

/// Largest index a token can carry.
pub const MAX_HANDLE_INDEX: u32 = 0x00ff_ffff;

const TOKEN_HEX_DIGITS: usize = 8;

/// Opaque reference to a registered filesystem driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FsHandle(u32);

impl FsHandle {
    /// Wrap a 1-based table index.
    #[inline]
    pub fn new(index: u32) -> Self {
        debug_assert!(
            (1..=MAX_HANDLE_INDEX).contains(&index),
            "FsHandle index out of range"
        );
        Self(index)
    }

    /// The 1-based table index.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Render as a continuation token for menu text.
    pub fn to_token(self) -> String {
        format!("0x{:08x}", (TOKEN_VERSION << 24) | self.0)
    }

    /// Parse a continuation token back into a handle.
    ///
    /// Only checks the encoding; use [`HandleTable::resolve_token`] to also
    /// check the handle refers to a registered driver.
    pub fn parse_token(token: &str) -> Result<Self, BrowseError> {
        let reject = |reason| BrowseError::InvalidHandle {
            token: token.to_string(),
            reason,
        };

        let digits = token
            .strip_prefix("0x")
            .ok_or_else(|| reject("missing 0x prefix"))?;
        if digits.len() != TOKEN_HEX_DIGITS || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(reject("expected eight hex digits"));
        }
        let raw = u32::from_str_radix(digits, 16).map_err(|_| reject("expected eight hex digits"))?;

        if raw >> 24 != TOKEN_VERSION {
            return Err(reject("unsupported token version"));
        }
        let index = raw & MAX_HANDLE_INDEX;
        if index == 0 {
            return Err(reject("null handle"));
        }
        Ok(Self(index))
    }
}

impl fmt::Display for FsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

/// Filesystem drivers registered for the lifetime of the engine.
///
/// Drivers are deduplicated by name, so repeated disk listings reuse the
/// same handles and the table stays as small as the set of drivers seen.
/// The lock is only held for the lookup itself, never across a
/// collaborator call, so a re-entrant invocation cannot deadlock on it.
#[derive(Default)]
pub struct HandleTable {
    drivers: Mutex<Vec<Arc<dyn FileSystem>>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `fs` (or find its existing registration) and return its handle.
    pub fn register(&self, fs: Arc<dyn FileSystem>) -> FsHandle {
        let mut drivers = self.drivers.lock();
        if let Some(pos) = drivers.iter().position(|d| d.name() == fs.name()) {
            return FsHandle::new(pos as u32 + 1);
        }
        drivers.push(fs);
        FsHandle::new(drivers.len() as u32)
    }

    /// The driver behind `handle`, if registered.
    pub fn resolve(&self, handle: FsHandle) -> Option<Arc<dyn FileSystem>> {
        let drivers = self.drivers.lock();
        (handle.index() as usize)
            .checked_sub(1)
            .and_then(|i| drivers.get(i))
            .cloned()
    }

    /// Parse `token` and resolve it in one step.
    pub fn resolve_token(
        &self,
        token: &str,
    ) -> Result<(FsHandle, Arc<dyn FileSystem>), BrowseError> {
        let handle = FsHandle::parse_token(token)?;
        let fs = self.resolve(handle).ok_or_else(|| BrowseError::InvalidHandle {
            token: token.to_string(),
            reason: "unknown handle",
        })?;
        Ok((handle, fs))
    }

    /// Number of registered drivers.
    pub fn len(&self) -> usize {
        self.drivers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.lock().is_empty()
    }
}

impl fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let drivers = self.drivers.lock();
        f.debug_list()
            .entries(drivers.iter().map(|d| d.name()))
            .finish()
    }
}
