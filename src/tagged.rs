//! A machine word with a stolen low bit
use core::fmt;

/// A `usize` whose bit 0 is a boolean flag. The remaining bits hold an even
/// value (a block size or a node reference), so the flag never changes what
/// [`Self::value`] reads back.
///
/// Block sizes are multiples of [`crate::GRANULARITY`] and node references are
/// even by construction, which is what makes the bit free in the first place.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub(crate) struct TaggedWord(usize);

const FLAG: usize = 1;

impl TaggedWord {
    #[inline]
    pub(crate) const fn new(value: usize, flag: bool) -> Self {
        debug_assert!(value & FLAG == 0);
        Self(value | flag as usize)
    }

    #[inline]
    pub(crate) const fn value(self) -> usize {
        self.0 & !FLAG
    }

    #[inline]
    pub(crate) const fn flag(self) -> bool {
        self.0 & FLAG != 0
    }

    /// Replace the value, keeping the flag.
    #[inline]
    pub(crate) fn set_value(&mut self, value: usize) {
        debug_assert!(value & FLAG == 0);
        self.0 = value | (self.0 & FLAG);
    }

    /// Replace the flag, keeping the value.
    #[inline]
    pub(crate) fn set_flag(&mut self, flag: bool) {
        self.0 = (self.0 & !FLAG) | flag as usize;
    }
}

impl fmt::Debug for TaggedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaggedWord")
            .field(&self.value())
            .field(&self.flag())
            .finish()
    }
}
