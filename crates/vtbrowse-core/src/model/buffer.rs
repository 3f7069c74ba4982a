/// Growable menu-script buffer.
///
/// An append-only byte buffer with the boot loader's growth policy: start
/// at 64 KiB, and whenever fewer than 1 KiB of headroom remain before an
/// append, grow by another 64 KiB. Growth goes through `try_reserve_exact`
/// so an exhausted allocator surfaces as
/// [`BrowseError::AllocationFailure`] instead of aborting, and the bytes
/// already written stay untouched.
use crate::error::BrowseError;
use std::fmt;

/// Initial capacity and growth increment.
pub const MENU_BUF_STEP: usize = 64 * 1024;

/// Headroom below which the buffer grows before the next append.
pub const MENU_BUF_LOW_WATER: usize = 1024;

/// Append `format!`-style text to a [`MenuBuffer`], propagating allocation
/// failure.
#[macro_export]
macro_rules! menu_write {
    ($buf:expr, $($arg:tt)*) => {
        $buf.append_fmt(::std::format_args!($($arg)*))
    };
}

/// Owned, append-only script text.
#[derive(Debug)]
pub struct MenuBuffer {
    bytes: Vec<u8>,
}

impl MenuBuffer {
    /// Allocate a buffer with at least `initial_capacity` bytes reserved.
    pub fn allocate(initial_capacity: usize) -> Result<Self, BrowseError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(initial_capacity)
            .map_err(|_| BrowseError::AllocationFailure {
                requested: initial_capacity,
            })?;
        Ok(Self { bytes })
    }

    /// Allocate with the default 64 KiB capacity.
    pub fn with_default_capacity() -> Result<Self, BrowseError> {
        Self::allocate(MENU_BUF_STEP)
    }

    /// Append formatted text at the write position.
    ///
    /// The fragment is formatted first so its length is known; the buffer
    /// then grows in [`MENU_BUF_STEP`] increments until both the low-water
    /// mark and the fragment fit. Nothing is written unless growth succeeded.
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), BrowseError> {
        let fragment = fmt::format(args);
        self.append_bytes(fragment.as_bytes())
    }

    /// Append raw bytes with the same growth policy as [`append_fmt`].
    ///
    /// [`append_fmt`]: MenuBuffer::append_fmt
    pub fn append_bytes(&mut self, data: &[u8]) -> Result<(), BrowseError> {
        let needed = data.len().max(MENU_BUF_LOW_WATER);
        if self.headroom() < needed {
            let mut target = self.bytes.capacity();
            while target - self.bytes.len() < needed {
                target += MENU_BUF_STEP;
            }
            let additional = target - self.bytes.len();
            self.bytes
                .try_reserve_exact(additional)
                .map_err(|_| BrowseError::AllocationFailure { requested: target })?;
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Currently reserved bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Unused reserved bytes.
    #[inline]
    pub fn headroom(&self) -> usize {
        self.bytes.capacity() - self.bytes.len()
    }

    /// The written script. The slice length is the script length; there is
    /// no terminator.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Release the buffer. Consuming `self` makes a second release
    /// impossible; dropping without calling this releases it as well.
    pub fn release(self) {
        drop(self);
    }
}
