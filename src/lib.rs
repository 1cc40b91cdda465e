//! This crate implements a best-fit free-list memory allocator over a single
//! fixed memory pool.
//!
//!  - **Free blocks are indexed by size in a red-black tree.** The tree is
//!    intrusive: its nodes live inside the free blocks themselves, so the
//!    allocator needs no memory besides the pool it manages.
//!
//!  - **Allocation and deallocation complete in `O(log n)` time**, `n` being
//!    the number of free blocks. Every block carries a header that locates
//!    both of its physical neighbors, so adjacent free blocks are merged as
//!    soon as they appear.
//!
//!  - **The memory pool is provided by an application.** It may be a `static`
//!    array, a stack buffer, or a memory block obtained from another
//!    allocator.
//!
//!  - **This crate supports `#![no_std]`.**
//!
//! The index is also available on its own as [`rbtree::RbTree`], which can be
//! used with any node storage implementing [`rbtree::NodeStore`].
//!
//! # Examples
//!
//! ```rust
//! use rfreelist::FreeList;
//! use std::mem::MaybeUninit;
//!
//! let mut pool = [MaybeUninit::uninit(); 4096];
//!
//! // `'pool` represents the memory pool's lifetime (`pool` in this case).
//! let mut fl = FreeList::new(&mut pool).unwrap();
//!
//! unsafe {
//!     let mut ptr1 = fl.allocate(8).unwrap().cast::<u64>();
//!     let mut ptr2 = fl.allocate(8).unwrap().cast::<u64>();
//!     *ptr1.as_mut() = 42;
//!     *ptr2.as_mut() = 56;
//!     assert_eq!(*ptr1.as_ref(), 42);
//!     assert_eq!(*ptr2.as_ref(), 56);
//!     fl.deallocate(ptr1.cast());
//!     fl.deallocate(ptr2.cast());
//! }
//!
//! assert_eq!(fl.bytes_used(), 0);
//! ```
//!
//! # Cargo Features
//!
//!  - `std` implements `std::error::Error` for [`InitError`].
//!  - `doc_cfg` annotates feature-gated items in the documentation. Requires
//!    a nightly compiler.
//!
#![no_std]
#![cfg_attr(feature = "doc_cfg", feature(doc_cfg))]

mod error;
mod freelist;
pub mod rbtree;
mod tagged;
mod utils;
pub use self::{
    error::InitError,
    freelist::{BlockInfo, Blocks, FreeList, GRANULARITY, MIN_BLOCK_SIZE},
};

#[cfg(any(test, feature = "std"))]
extern crate std;
