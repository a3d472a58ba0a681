use std::sync::atomic::{AtomicPtr, Ordering};

/// Shorthand for the raw node pointers the low-level API traffics in.
pub type NodePtr = *mut LinkNode;

/// Reserved sentinel stored in a pointer field while the field's link is
/// held by some thread.
///
/// An all-ones bit pattern is odd, and `LinkNode` is at least
/// pointer-aligned, so no live node can ever occupy this address. The value
/// is never dereferenced; it only marks a field as cut.
pub(crate) const BUSY: NodePtr = usize::MAX as NodePtr;

/// Check whether a field value is the lock sentinel.
#[inline]
pub(crate) fn is_busy(ptr: NodePtr) -> bool {
    ptr == BUSY
}

/// A two-pointer link cell, embedded in user data or used as a list head.
///
/// The pair `(prev, next)` encodes the node's state:
///
/// | state        | prev   | next   | meaning                               |
/// |--------------|--------|--------|---------------------------------------|
/// | detached     | self   | self   | singleton loop, member of no list     |
/// | linked       | ≠BUSY  | ≠BUSY  | live member of some list              |
/// | next-locked  | ≠BUSY  | BUSY   | outgoing link held by some thread     |
/// | prev-locked  | BUSY   | ≠BUSY  | incoming link held by some thread     |
/// | fully-locked | BUSY   | BUSY   | both links held, element isolated     |
///
/// At rest (no thread inside an operation) `BUSY` never appears, and for
/// every pair of adjacent members A, B: `A.next == &B` iff `B.prev == &A`.
/// The list is cyclic through its head; an empty head is a self-loop.
#[derive(Debug)]
pub struct LinkNode {
    prev: AtomicPtr<LinkNode>,
    next: AtomicPtr<LinkNode>,
}

impl LinkNode {
    /// Create a node with null fields.
    ///
    /// The node is not yet in any recognized state; call [`init_detached`]
    /// once it has reached its final address, or hand it straight to a
    /// trusting insert, which overwrites both fields.
    ///
    /// [`init_detached`]: LinkNode::init_detached
    pub const fn new() -> Self {
        LinkNode {
            prev: AtomicPtr::new(std::ptr::null_mut()),
            next: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    /// Put the node into the detached state (a self-loop).
    ///
    /// Also used to initialize a list head: an empty list is a head whose
    /// both fields point at the head itself.
    pub fn init_detached(&self) {
        let me = self.as_ptr();
        self.prev.store(me, Ordering::Release);
        self.next.store(me, Ordering::Release);
    }

    /// The node's own address as a `NodePtr`.
    #[inline]
    pub(crate) fn as_ptr(&self) -> NodePtr {
        self as *const LinkNode as NodePtr
    }

    /// Advisory check for the detached state.
    ///
    /// Exact only while no other thread can be operating on the node; under
    /// concurrency the answer may be stale by the time the caller acts on it.
    /// The lock primitives re-verify under the lock.
    #[inline]
    pub fn is_detached_hint(&self) -> bool {
        self.load_next() == self.as_ptr()
    }

    // =========================================================================
    // Atomic field accessors
    // =========================================================================
    //
    // Every acquisition is an exchange: the swap both installs BUSY and
    // reports what the field held, so probing and locking are one step.
    // Restores of non-BUSY values are plain release stores.

    /// Load next pointer (Acquire ordering)
    #[inline]
    pub(crate) fn load_next(&self) -> NodePtr {
        self.next.load(Ordering::Acquire)
    }

    /// Load prev pointer (Acquire ordering)
    #[inline]
    pub(crate) fn load_prev(&self) -> NodePtr {
        self.prev.load(Ordering::Acquire)
    }

    /// Swap next pointer (Acquire ordering)
    #[inline]
    pub(crate) fn swap_next(&self, ptr: NodePtr) -> NodePtr {
        self.next.swap(ptr, Ordering::Acquire)
    }

    /// Swap prev pointer (Acquire ordering)
    #[inline]
    pub(crate) fn swap_prev(&self, ptr: NodePtr) -> NodePtr {
        self.prev.swap(ptr, Ordering::Acquire)
    }

    /// Store next pointer (Release ordering)
    #[inline]
    pub(crate) fn store_next(&self, ptr: NodePtr) {
        self.next.store(ptr, Ordering::Release)
    }

    /// Store prev pointer (Release ordering)
    #[inline]
    pub(crate) fn store_prev(&self, ptr: NodePtr) {
        self.prev.store(ptr, Ordering::Release)
    }
}

impl Default for LinkNode {
    fn default() -> Self {
        Self::new()
    }
}
