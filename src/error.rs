use core::fmt;

/// The error type returned by [`FreeList::new`](crate::FreeList::new) and
/// [`FreeList::new_ptr`](crate::FreeList::new_ptr).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// After alignment, the memory pool can't hold a single indexable free
    /// block.
    TooSmall {
        /// The number of bytes left after aligning the pool.
        usable: usize,
        /// [`MIN_BLOCK_SIZE`](crate::MIN_BLOCK_SIZE).
        required: usize,
    },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSmall { usable, required } => write!(
                f,
                "memory pool too small: {} usable bytes, at least {} required",
                usable, required
            ),
        }
    }
}

#[cfg(feature = "std")]
#[cfg_attr(feature = "doc_cfg", doc(cfg(feature = "std")))]
impl std::error::Error for InitError {}
