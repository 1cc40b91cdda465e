//! The free-list allocator core
use core::{
    alloc::Layout,
    fmt,
    marker::PhantomData,
    mem::{self, MaybeUninit},
    ptr::{self, NonNull},
};

use crate::{
    error::InitError,
    rbtree::{NaturalOrder, Node, NodeRef, NodeStore, RbTree},
    tagged::TaggedWord,
    utils::{align_down, align_up, const_align_up, nonnull_slice_len},
};

#[doc = svgbobdoc::transform!(
/// A best-fit allocator managing a fixed memory pool.
///
/// # Data Structure Overview
///
/// <center>
/// ```svgbob
///   pool
///   ,-----+----------,-----+------+------,-----+----------------,-----+-----,
///   | hdr | payload  | hdr | node |      | hdr | payload        | hdr |     |
///   '-----+----------'-----+--+---+------'-----+----------------'-----+-----'
///    used                free |                 used             free, too
///                             |                                  small to
///   ╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶|╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶  index
///   Index (red-black tree     v
///   keyed by block size)   ,-----,
///                          | 160 |
///                          '+---+'
///                          /     \
///                     ,---+-,   ,-+---,
///                     |  48 |   | 512 |
///                     '-----'   '-----'
/// ```
/// </center>
///
/// Every block starts with a [`GRANULARITY`]-byte header recording the
/// block's size and its physically previous block's size, so both neighbors
/// are found in constant time. A free block that is at least
/// [`MIN_BLOCK_SIZE`] bytes long hosts a red-black tree node right after its
/// header; the tree is used to find the smallest free block that satisfies an
/// allocation. Smaller free blocks are not indexed and only become usable
/// again when a neighbor is freed and they are merged.
///
/// # Properties
///
/// Payloads are aligned to [`GRANULARITY`] bytes. Every block handed out is at
/// least [`MIN_BLOCK_SIZE`] bytes long, so it can always be indexed once
/// freed.
///
/// Allocation and deallocation complete in `O(log n)` time, `n` being the
/// number of indexed free blocks.
)]
#[derive(Debug)]
pub struct FreeList<'pool> {
    pool: Pool,
    index: RbTree<usize, NaturalOrder, true>,
    used: usize,
    _phantom: PhantomData<&'pool mut ()>,
}

// Safety: All memory block headers directly or indirectly referenced by a
//         particular instance of `FreeList` are logically owned by that
//         `FreeList` and have no interior mutability, so these are safe.
unsafe impl Send for FreeList<'_> {}

unsafe impl Sync for FreeList<'_> {}

/// The alignment of every block and the size of a block header.
///
/// It is `size_of::<usize>() * 2` bytes.
pub const GRANULARITY: usize = core::mem::size_of::<usize>() * 2;

/// The smallest block that can be registered in the free block index: a
/// header followed by a tree node.
pub const MIN_BLOCK_SIZE: usize = const_align_up(HDR_SIZE + NODE_SIZE, GRANULARITY);

const HDR_SIZE: usize = mem::size_of::<BlockHdr>();
const NODE_SIZE: usize = mem::size_of::<FreeNode>();

/// The index node embedded in a free block. The key is the block size.
type FreeNode = Node<usize>;

/// The header of a memory block.
#[repr(C)]
#[cfg_attr(target_pointer_width = "16", repr(align(4)))]
#[cfg_attr(target_pointer_width = "32", repr(align(8)))]
#[cfg_attr(target_pointer_width = "64", repr(align(16)))]
#[derive(Debug, Clone, Copy)]
struct BlockHdr {
    /// The size of the whole memory block, including the header.
    size: usize,
    /// `value()`: the size of the physically previous block, or zero if this
    /// is the first block of the pool.
    /// `flag()`: whether this block is free.
    prev_size_and_free: TaggedWord,
}

impl BlockHdr {
    #[inline]
    const fn new(size: usize, prev_size: usize, free: bool) -> Self {
        Self {
            size,
            prev_size_and_free: TaggedWord::new(prev_size, free),
        }
    }

    #[inline]
    fn prev_size(&self) -> usize {
        self.prev_size_and_free.value()
    }

    #[inline]
    fn is_free(&self) -> bool {
        self.prev_size_and_free.flag()
    }

    /// Whether the block hosts an index node while free.
    #[inline]
    fn is_indexable(&self) -> bool {
        self.size >= MIN_BLOCK_SIZE
    }
}

/// The usable part of the pool. All blocks are addressed by their byte
/// offset from `start`.
#[derive(Debug)]
struct Pool {
    start: NonNull<u8>,
    len: usize,
}

impl Pool {
    /// Get the header of the block at `offset`.
    ///
    /// # Safety
    ///
    /// `offset` must be the start of a block.
    #[inline]
    unsafe fn hdr(&self, offset: usize) -> &BlockHdr {
        debug_assert!(offset + HDR_SIZE <= self.len);
        debug_assert_eq!(offset % GRANULARITY, 0);
        &*self.start.as_ptr().add(offset).cast::<BlockHdr>()
    }

    /// Get the header of the block at `offset`.
    ///
    /// # Safety
    ///
    /// `offset` must be the start of a block.
    #[inline]
    unsafe fn hdr_mut(&mut self, offset: usize) -> &mut BlockHdr {
        debug_assert!(offset + HDR_SIZE <= self.len);
        debug_assert_eq!(offset % GRANULARITY, 0);
        &mut *self.start.as_ptr().add(offset).cast::<BlockHdr>()
    }

    /// Write a new header at `offset`.
    ///
    /// # Safety
    ///
    /// `offset..offset + hdr.size` must be inside the pool and not overlap
    /// any other block.
    #[inline]
    unsafe fn write_hdr(&mut self, offset: usize, hdr: BlockHdr) {
        debug_assert!(offset + hdr.size <= self.len);
        debug_assert_eq!(offset % GRANULARITY, 0);
        debug_assert_eq!(hdr.size % GRANULARITY, 0);
        self.start.as_ptr().add(offset).cast::<BlockHdr>().write(hdr);
    }

    /// Update the previous-size field of the block following the block that
    /// ends at `end`, if any. Its free flag is preserved.
    ///
    /// # Safety
    ///
    /// `end` must be the end of a block.
    #[inline]
    unsafe fn set_prev_size_after(&mut self, end: usize, prev_size: usize) {
        if end < self.len {
            self.hdr_mut(end).prev_size_and_free.set_value(prev_size);
        }
    }

    /// The index node of the block at `offset`.
    #[inline]
    fn node_ref(offset: usize) -> NodeRef {
        // `offset + HDR_SIZE` is a non-zero multiple of `GRANULARITY`
        match NodeRef::new(offset + HDR_SIZE) {
            Some(x) => x,
            None => unreachable!(),
        }
    }

    #[inline]
    fn block_of_node(node: NodeRef) -> usize {
        node.get() - HDR_SIZE
    }

    /// Translate a payload pointer into its block's offset.
    #[inline]
    fn block_of_ptr(&self, ptr: NonNull<u8>) -> usize {
        let addr = ptr.as_ptr() as usize;
        let start = self.start.as_ptr() as usize;
        debug_assert!(
            addr >= start + HDR_SIZE && addr < start + self.len,
            "{:p} does not belong to this pool",
            ptr
        );
        debug_assert_eq!(addr % GRANULARITY, 0, "{:p} is not a block payload", ptr);
        addr.wrapping_sub(start + HDR_SIZE)
    }

    #[inline]
    fn payload(&self, offset: usize) -> NonNull<u8> {
        // Safety: `start + offset + HDR_SIZE` is inside the pool, so it's
        //         not null
        unsafe { NonNull::new_unchecked(self.start.as_ptr().add(offset + HDR_SIZE)) }
    }
}

impl NodeStore<usize> for Pool {
    #[inline]
    fn node(&self, at: NodeRef) -> &FreeNode {
        debug_assert!(at.get() + NODE_SIZE <= self.len);
        // Safety: `NodeRef`s reach the index only through
        //         `FreeList::link_free_block`, which creates them for free
        //         blocks inside the pool that are large enough to host a
        //         node. The node was initialized there.
        unsafe { &*self.start.as_ptr().add(at.get()).cast::<FreeNode>() }
    }

    #[inline]
    fn node_mut(&mut self, at: NodeRef) -> &mut FreeNode {
        debug_assert!(at.get() + NODE_SIZE <= self.len);
        // Safety: See `node`
        unsafe { &mut *self.start.as_ptr().add(at.get()).cast::<FreeNode>() }
    }
}

/// The number of bytes to skip after the payload address `addr` to make it
/// `align`-byte aligned. Returns `None` if the aligned address would wrap.
#[inline]
fn front_padding_for(addr: usize, align: usize) -> Option<usize> {
    Some(align_up(addr, align)? - addr)
}

/// Calculate the size of a block that can hold a `size`-byte payload.
#[inline]
fn block_size_for(size: usize) -> Option<usize> {
    let size = align_up(size.checked_add(HDR_SIZE)?, GRANULARITY)?;
    Some(size.max(MIN_BLOCK_SIZE))
}

impl<'pool> FreeList<'pool> {
    /// Create an allocator managing the memory block specified by a slice
    /// pointer.
    ///
    /// Up to `GRANULARITY - 1` bytes at each end of the block may be left
    /// unused to satisfy alignment.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfreelist::FreeList;
    /// use std::{mem::MaybeUninit, ptr::NonNull};
    /// let mut pool = [MaybeUninit::<u8>::uninit(); 1024];
    /// let block = NonNull::new(&mut pool[..] as *mut [MaybeUninit<u8>] as *mut [u8]).unwrap();
    /// let fl = unsafe { FreeList::new_ptr(block) };
    /// assert!(fl.is_ok());
    /// ```
    ///
    /// # Safety
    ///
    /// The memory block will be considered owned by `self`. The memory block
    /// must outlive `self`.
    ///
    /// # Errors
    ///
    /// [`InitError::TooSmall`] if the aligned block can't hold a single
    /// block of [`MIN_BLOCK_SIZE`] bytes.
    pub unsafe fn new_ptr(block: NonNull<[u8]>) -> Result<Self, InitError> {
        let len = nonnull_slice_len(block);

        // Round up the starting address and round down the length
        let unaligned_start = block.as_ptr() as *mut u8 as usize;
        let padding = usable_padding(unaligned_start);
        let usable = len
            .checked_sub(padding)
            .map_or(0, |x| align_down(x, GRANULARITY));

        if usable < MIN_BLOCK_SIZE {
            return Err(InitError::TooSmall {
                usable,
                required: MIN_BLOCK_SIZE,
            });
        }

        let start = (block.as_ptr() as *mut u8).add(padding);

        let mut this = Self {
            pool: Pool {
                // Safety: `start` is at or after the non-null `block`
                start: NonNull::new_unchecked(start),
                len: usable,
            },
            index: RbTree::INIT,
            used: 0,
            _phantom: PhantomData,
        };
        this.deallocate_all();

        log::trace!(
            "FreeList::new_ptr({:p}, {}) → {:p}, {} bytes usable",
            unaligned_start as *const u8,
            len,
            start,
            usable
        );

        Ok(this)
    }

    /// Create an allocator managing the memory block specified by a slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfreelist::FreeList;
    /// use std::mem::MaybeUninit;
    /// let mut pool = [MaybeUninit::uninit(); 1024];
    /// let fl = FreeList::new(&mut pool).unwrap();
    /// assert_eq!(fl.bytes_used(), 0);
    /// ```
    ///
    /// The memory block must outlive `self`:
    ///
    /// ```rust,compile_fail
    /// use rfreelist::FreeList;
    /// use std::mem::MaybeUninit;
    /// let fl;
    /// {
    ///     let mut pool = [MaybeUninit::uninit(); 1024];
    ///     fl = FreeList::new(&mut pool).unwrap();
    /// }
    /// drop(fl); // `pool` has already been dropped
    /// ```
    ///
    /// # Errors
    ///
    /// See [`Self::new_ptr`].
    #[inline]
    pub fn new(block: &'pool mut [MaybeUninit<u8>]) -> Result<Self, InitError> {
        // Safety: `block` is a mutable reference, which guarantees the absence
        // of aliasing references. Being `'pool` means it will outlive `self`.
        unsafe { Self::new_ptr(NonNull::new_unchecked(block as *mut [_] as *mut [u8])) }
    }

    /// The number of bytes occupied by allocated blocks, headers included.
    #[inline]
    pub fn bytes_used(&self) -> usize {
        self.used
    }

    /// The number of bytes managed by `self`, after alignment.
    #[inline]
    pub fn bytes_total(&self) -> usize {
        self.pool.len
    }

    /// The number of free blocks registered in the index.
    #[inline]
    pub fn indexed_free_blocks(&self) -> usize {
        self.index.len()
    }

    /// Iterate over all blocks in address order.
    #[inline]
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            pool: &self.pool,
            offset: 0,
        }
    }

    /// Write a free block header at `offset` and register the block in the
    /// index if it's large enough.
    ///
    /// # Safety
    ///
    /// `offset..offset + size` must be inside the pool and not overlap any
    /// other block.
    unsafe fn link_free_block(&mut self, offset: usize, size: usize, prev_size: usize) {
        let hdr = BlockHdr::new(size, prev_size, true);
        self.pool.write_hdr(offset, hdr);

        if hdr.is_indexable() {
            let node = Pool::node_ref(offset);
            self.pool
                .start
                .as_ptr()
                .add(node.get())
                .cast::<FreeNode>()
                .write(Node::new(size));
            let inserted = self.index.insert(&mut self.pool, node);
            debug_assert!(inserted.is_ok());
        }
    }

    /// Remove the free block at `offset` from the index if it's registered
    /// there.
    ///
    /// # Safety
    ///
    /// `offset` must be the start of a free block.
    unsafe fn unlink_free_block(&mut self, offset: usize) {
        let hdr = *self.pool.hdr(offset);
        debug_assert!(hdr.is_free());

        if hdr.is_indexable() {
            let node = Pool::node_ref(offset);
            debug_assert_eq!(*self.pool.node(node).key(), hdr.size);
            self.index.delete(&mut self.pool, node);
        }
    }

    /// Attempt to allocate a block of memory.
    ///
    /// Returns the starting address of the payload on success; `None`
    /// otherwise. The payload is [`GRANULARITY`]-byte aligned and at least
    /// `size` bytes long.
    ///
    /// # Time Complexity
    ///
    /// This method will complete in `O(log n)` time.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        debug_assert_ne!(size, 0, "zero-size allocation");
        let block_size = block_size_for(size)?;

        // Safety: `block_size` is a multiple of `GRANULARITY` and no smaller
        //         than `MIN_BLOCK_SIZE`
        let ptr = unsafe { self.allocate_block(block_size, GRANULARITY) };
        log::trace!("FreeList::allocate({}) = {:?}", size, ptr);
        ptr
    }

    /// Similar to [`Self::allocate`], but the first `size` bytes of the
    /// payload are filled with zeros.
    pub fn allocate_zeroed(&mut self, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.allocate(size)?;
        // Safety: The payload is at least `size` bytes long and owned by the
        //         caller now
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Some(ptr)
    }

    /// Attempt to allocate a block of memory whose payload satisfies
    /// `layout.align()`.
    ///
    /// Alignments up to [`GRANULARITY`] cost nothing extra. For larger
    /// alignments the search asks for `layout.align() - GRANULARITY` spare
    /// bytes, and whatever precedes the aligned payload is returned to the
    /// pool as a separate free block.
    pub fn allocate_aligned(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert_ne!(layout.size(), 0, "zero-size allocation");
        let block_size = block_size_for(layout.size())?;

        // Safety: `block_size` is a multiple of `GRANULARITY` and no smaller
        //         than `MIN_BLOCK_SIZE`; `layout.align()` is a power of two
        let ptr = unsafe { self.allocate_block(block_size, layout.align().max(GRANULARITY)) };
        log::trace!("FreeList::allocate_aligned({:?}) = {:?}", layout, ptr);
        ptr
    }

    /// Find the best-fitting free block, carve a `block_size`-byte block whose
    /// payload is `align`-byte aligned out of it, and return the payload.
    ///
    /// # Safety
    ///
    ///  - `block_size` must be a multiple of `GRANULARITY` and no smaller
    ///    than `MIN_BLOCK_SIZE`.
    ///  - `align` must be a power of two no smaller than `GRANULARITY`.
    ///
    unsafe fn allocate_block(&mut self, block_size: usize, align: usize) -> Option<NonNull<u8>> {
        debug_assert_eq!(block_size % GRANULARITY, 0);
        debug_assert!(block_size >= MIN_BLOCK_SIZE);
        debug_assert!(align.is_power_of_two() && align >= GRANULARITY);

        // The worst-case front padding needed to align the payload
        let search_size = block_size.checked_add(align - GRANULARITY)?;

        // Best fit: the smallest indexed free block that is large enough
        let node = self.index.lower_bound(&self.pool, &search_size)?;
        let free_offset = Pool::block_of_node(node);
        let free_hdr = *self.pool.hdr(free_offset);

        debug_assert!(free_hdr.is_free());
        debug_assert!(free_hdr.size >= search_size);

        // Decide the starting address of the payload. Nothing may fail past
        // this point.
        let front_padding =
            front_padding_for(self.pool.payload(free_offset).as_ptr() as usize, align)?;
        debug_assert_eq!(front_padding % GRANULARITY, 0);

        self.index.delete(&mut self.pool, node);

        let offset = free_offset + front_padding;
        let prev_size = if front_padding > 0 {
            // The padding becomes a free block of its own. Its predecessor
            // is not free because no two free blocks are adjacent.
            self.link_free_block(free_offset, front_padding, free_hdr.prev_size());
            front_padding
        } else {
            free_hdr.prev_size()
        };

        let end = free_offset + free_hdr.size;
        let leftover = end - offset - block_size;

        if leftover > 0 {
            // Split the remainder off. Its successor, if any, is not free.
            self.link_free_block(offset + block_size, leftover, block_size);
            self.pool.set_prev_size_after(end, leftover);
        } else {
            self.pool.set_prev_size_after(end, block_size);
        }

        self.pool
            .write_hdr(offset, BlockHdr::new(block_size, prev_size, false));
        self.used += block_size;

        Some(self.pool.payload(offset))
    }

    /// Deallocate a previously allocated memory block.
    ///
    /// The block is merged with its free neighbors, if any.
    ///
    /// # Time Complexity
    ///
    /// This method will complete in `O(log n)` time.
    ///
    /// # Safety
    ///
    ///  - `ptr` must denote a memory block previously allocated via `self`.
    ///  - The memory block must not have been deallocated since.
    ///
    pub unsafe fn deallocate(&mut self, ptr: NonNull<u8>) {
        let offset = self.pool.block_of_ptr(ptr);
        let hdr = *self.pool.hdr(offset);
        debug_assert!(!hdr.is_free(), "double free of {:p}", ptr);

        log::trace!("FreeList::deallocate({:p}) ({} bytes)", ptr, hdr.size);

        self.used -= hdr.size;

        let mut start = offset;
        let mut size = hdr.size;
        let mut prev_size = hdr.prev_size();

        // Merge with the previous block if it's a free block
        if prev_size != 0 {
            let prev_offset = offset - prev_size;
            let prev_hdr = *self.pool.hdr(prev_offset);
            debug_assert_eq!(prev_hdr.size, prev_size);

            if prev_hdr.is_free() {
                self.unlink_free_block(prev_offset);
                start = prev_offset;
                size += prev_hdr.size;
                prev_size = prev_hdr.prev_size();
            }
        }

        // Merge with the next block if it's a free block
        let next_offset = offset + hdr.size;
        if next_offset < self.pool.len {
            let next_hdr = *self.pool.hdr(next_offset);
            debug_assert_eq!(next_hdr.prev_size(), hdr.size);

            if next_hdr.is_free() {
                self.unlink_free_block(next_offset);
                size += next_hdr.size;
            }
        }

        self.pool.set_prev_size_after(start + size, size);
        self.link_free_block(start, size, prev_size);
    }

    /// Shrink or grow a previously allocated memory block.
    ///
    /// Returns the new starting address of the payload on success; `None`
    /// otherwise, in which case the original block is left intact.
    ///
    /// The block is resized in place if possible. Otherwise, a new block is
    /// allocated, the old payload is copied there, and the old block is
    /// deallocated; the new payload is only guaranteed to be
    /// [`GRANULARITY`]-byte aligned.
    ///
    /// # Time Complexity
    ///
    /// Unlike other methods, this method will complete in linear time
    /// (`O(old_size)`) when the block has to be moved.
    ///
    /// # Safety
    ///
    /// Same as [`Self::deallocate`].
    pub unsafe fn reallocate(&mut self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        debug_assert_ne!(new_size, 0, "zero-size allocation");
        let offset = self.pool.block_of_ptr(ptr);
        let old_size = self.pool.hdr(offset).size;
        debug_assert!(!self.pool.hdr(offset).is_free());

        let new_block_size = block_size_for(new_size)?;

        if new_block_size <= old_size {
            self.shrink_in_place(offset, new_block_size);
            log::trace!("FreeList::reallocate({:p}, {}) = shrunk", ptr, new_size);
            return Some(ptr);
        }

        if self.grow_in_place(offset, new_block_size) {
            log::trace!("FreeList::reallocate({:p}, {}) = grown", ptr, new_size);
            return Some(ptr);
        }

        let new_ptr = self.allocate(new_size)?;
        ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size - HDR_SIZE);
        self.deallocate(ptr);

        log::trace!("FreeList::reallocate({:p}, {}) = {:p}", ptr, new_size, new_ptr);
        Some(new_ptr)
    }

    /// A subroutine of [`Self::reallocate`]. Shrinks the used block at
    /// `offset` to `new_size` bytes, returning the tail to the pool.
    ///
    /// # Safety
    ///
    /// `offset` must be the start of a used block no smaller than `new_size`,
    /// which must be a multiple of `GRANULARITY` no smaller than
    /// `MIN_BLOCK_SIZE`.
    unsafe fn shrink_in_place(&mut self, offset: usize, new_size: usize) {
        let old_size = self.pool.hdr(offset).size;
        let shrink_by = old_size - new_size;
        if shrink_by == 0 {
            return;
        }

        let mut tail_size = shrink_by;

        // If the next block is a free block, the tail absorbs it
        let next_offset = offset + old_size;
        if next_offset < self.pool.len && self.pool.hdr(next_offset).is_free() {
            tail_size += self.pool.hdr(next_offset).size;
            self.unlink_free_block(next_offset);
        }

        let tail_offset = offset + new_size;
        self.pool.set_prev_size_after(tail_offset + tail_size, tail_size);
        self.link_free_block(tail_offset, tail_size, new_size);

        self.pool.hdr_mut(offset).size = new_size;
        self.used -= shrink_by;
    }

    /// A subroutine of [`Self::reallocate`]. Attempts to grow the used block
    /// at `offset` to `new_size` bytes by taking space from the next block.
    ///
    /// # Safety
    ///
    /// `offset` must be the start of a used block smaller than `new_size`,
    /// which must be a multiple of `GRANULARITY`.
    unsafe fn grow_in_place(&mut self, offset: usize, new_size: usize) -> bool {
        let old_size = self.pool.hdr(offset).size;
        let next_offset = offset + old_size;
        if next_offset >= self.pool.len {
            return false;
        }

        let next_hdr = *self.pool.hdr(next_offset);
        if !next_hdr.is_free() || old_size + next_hdr.size < new_size {
            // Not a free block or can't fit
            return false;
        }

        self.unlink_free_block(next_offset);

        let end = next_offset + next_hdr.size;
        let leftover = end - offset - new_size;
        if leftover > 0 {
            self.link_free_block(offset + new_size, leftover, new_size);
            self.pool.set_prev_size_after(end, leftover);
        } else {
            self.pool.set_prev_size_after(end, new_size);
        }

        self.pool.hdr_mut(offset).size = new_size;
        self.used += new_size - old_size;
        true
    }

    /// Deallocate all memory blocks at once, leaving a single free block
    /// spanning the whole pool.
    ///
    /// Any pointers previously returned by `self` must not be used after
    /// this call.
    ///
    /// # Time Complexity
    ///
    /// This method will complete in constant time.
    pub fn deallocate_all(&mut self) {
        log::trace!("FreeList::deallocate_all() ({} bytes were in use)", self.used);

        self.index.clear();
        self.used = 0;
        // Safety: The pool is at least `MIN_BLOCK_SIZE` bytes long and the
        //         new block covers it exactly
        unsafe { self.link_free_block(0, self.pool.len, 0) };
    }
}

/// The number of bytes to skip to reach a `GRANULARITY`-aligned address.
#[inline]
fn usable_padding(addr: usize) -> usize {
    addr.wrapping_neg() & (GRANULARITY - 1)
}

/// Information about a block, returned by [`FreeList::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// The block's byte offset from the start of the usable pool.
    pub offset: usize,
    /// The size of the whole block, including the header.
    pub size: usize,
    pub is_free: bool,
}

impl BlockInfo {
    /// Whether the block is a free block registered in the index.
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.is_free && self.size >= MIN_BLOCK_SIZE
    }
}

/// An iterator over the blocks of a [`FreeList`], in address order.
pub struct Blocks<'a> {
    pool: &'a Pool,
    offset: usize,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        if self.offset >= self.pool.len {
            return None;
        }

        // Safety: The header chain tiles the pool, so `offset` is the start
        //         of a block
        let hdr = unsafe { self.pool.hdr(self.offset) };
        let info = BlockInfo {
            offset: self.offset,
            size: hdr.size,
            is_free: hdr.is_free(),
        };
        self.offset += hdr.size;
        Some(info)
    }
}

impl fmt::Debug for Blocks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blocks")
            .field("offset", &self.offset)
            .finish()
    }
}
