use rfreelist::FreeList;
use std::{mem::MaybeUninit, ptr::NonNull, slice};

const LETTERS: usize = (b'z' - b'a' + 1) as usize;

/// Fill block `i` with a NUL-terminated run of the first `i + 1` letters.
unsafe fn write_letters(ptr: NonNull<u8>, i: usize) {
    let payload = slice::from_raw_parts_mut(ptr.as_ptr(), i + 2);
    for (j, b) in payload[..i + 1].iter_mut().enumerate() {
        *b = b'a' + j as u8;
    }
    payload[i + 1] = 0;
}

unsafe fn assert_letters(ptr: NonNull<u8>, i: usize) {
    let payload = slice::from_raw_parts(ptr.as_ptr(), i + 2);
    let expected: Vec<u8> = (b'a'..).take(i + 1).chain(Some(0)).collect();
    assert_eq!(payload, &expected[..], "block {} was corrupted", i);
}

fn is_freed(i: usize) -> bool {
    i % 3 == 0 || i % 4 == 0
}

#[test]
fn chars() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut pool = [MaybeUninit::uninit(); 4096];
    let mut fl = FreeList::new(&mut pool).unwrap();

    let mut ptrs = Vec::with_capacity(LETTERS);
    for i in 0..LETTERS {
        let ptr = fl.allocate(i + 2).unwrap();
        unsafe { write_letters(ptr, i) };
        ptrs.push(ptr);
    }

    for (i, &ptr) in ptrs.iter().enumerate() {
        unsafe { assert_letters(ptr, i) };
    }

    for (i, &ptr) in ptrs.iter().enumerate() {
        if is_freed(i) {
            unsafe { fl.deallocate(ptr) };
        }
    }
    log::trace!("{} free blocks indexed", fl.indexed_free_blocks());

    // The survivors are untouched
    for (i, &ptr) in ptrs.iter().enumerate() {
        if !is_freed(i) {
            unsafe { assert_letters(ptr, i) };
        }
    }

    for (i, ptr) in ptrs.iter_mut().enumerate() {
        if is_freed(i) {
            *ptr = fl.allocate(i + 2).unwrap();
            unsafe { write_letters(*ptr, i) };
        }
    }

    for (i, &ptr) in ptrs.iter().enumerate() {
        unsafe { assert_letters(ptr, i) };
    }

    fl.deallocate_all();
    assert_eq!(fl.bytes_used(), 0);
    assert_eq!(fl.blocks().count(), 1);

    // Previous contents don't leak into zeroed allocations
    let ptr = fl.allocate_zeroed(LETTERS + 1).unwrap();
    let payload = unsafe { slice::from_raw_parts(ptr.as_ptr(), LETTERS + 1) };
    assert!(payload.iter().all(|&b| b == 0));

    fl.deallocate_all();
    assert_eq!(fl.bytes_used(), 0);
}

#[test]
fn every_size_round_trips() {
    let mut pool = [MaybeUninit::uninit(); 4096];
    let mut fl = FreeList::new(&mut pool).unwrap();

    for size in 1..=512 {
        let ptr = fl.allocate(size).unwrap();
        assert_eq!(ptr.as_ptr() as usize % rfreelist::GRANULARITY, 0);
        unsafe {
            ptr.as_ptr().write_bytes(size as u8, size);
            fl.deallocate(ptr);
        }
        assert_eq!(fl.bytes_used(), 0);
        assert_eq!(fl.blocks().count(), 1, "size {} left fragments", size);
    }
}
