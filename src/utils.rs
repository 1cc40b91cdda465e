use core::{mem::MaybeUninit, ptr::NonNull};

/// Round `value` up to a multiple of `align`, which must be a power of two.
///
/// Returns `None` on overflow.
#[inline]
pub fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    Some(value.checked_add(align - 1)? & !(align - 1))
}

/// The `const` counterpart of [`align_up`]. Wraps on overflow.
#[inline]
pub const fn const_align_up(value: usize, align: usize) -> usize {
    value.wrapping_add(align - 1) & !(align - 1)
}

/// Round `value` down to a multiple of `align`, which must be a power of two.
#[inline]
pub fn align_down(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value & !(align - 1)
}

/// Get the length of a slice pointer.
///
/// # Safety
///
/// `ptr` must point to a slice that is valid for reads of its metadata.
#[inline]
pub unsafe fn nonnull_slice_len<T>(ptr: NonNull<[T]>) -> usize {
    // Only the length embedded in the fat pointer is read. The slice might be
    // uninitialized, hence the `MaybeUninit`.
    (&*(ptr.as_ptr() as *const [MaybeUninit<T>])).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(align_up(0, 16), Some(0));
        assert_eq!(align_up(1, 16), Some(16));
        assert_eq!(align_up(16, 16), Some(16));
        assert_eq!(align_up(usize::MAX, 16), None);
        assert_eq!(const_align_up(33, 16), 48);
        assert_eq!(align_down(47, 16), 32);
    }

    #[test]
    fn slice_len_of_uninit_pool() {
        let mut pool = [MaybeUninit::<u8>::uninit(); 100];
        let ptr = NonNull::new(&mut pool[3..] as *mut [MaybeUninit<u8>] as *mut [u8]).unwrap();
        assert_eq!(unsafe { nonnull_slice_len(ptr) }, 97);

        let empty = NonNull::new(&mut pool[..0] as *mut [MaybeUninit<u8>] as *mut [u8]).unwrap();
        assert_eq!(unsafe { nonnull_slice_len(empty) }, 0);
    }
}
