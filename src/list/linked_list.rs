//! The list head and the composite operations built on the link primitives.

use std::ptr;

use crate::backoff::Backoff;

use super::link_lock::{self, LinkEnds};
use super::node::{is_busy, LinkNode, NodePtr, BUSY};

/// A concurrent doubly-linked list synchronized by per-link locking.
///
/// The list owns nothing but its head node; members are caller-allocated
/// [`LinkNode`]s embedded in caller payloads. All member-taking operations
/// are `unsafe`: the caller vouches that the pointers it passes stay
/// allocated while any thread can still reach them through the list, and
/// that each node is in the state the operation's contract requires.
///
/// Contention is invisible to callers except as latency. Conflicting
/// acquisitions roll back and retry with [`Backoff`]; no thread sleeps
/// while holding a cut link end.
#[derive(Debug)]
pub struct LinkList {
    head: NodePtr,
}

// The head is an owned heap allocation and all field access is atomic.
unsafe impl Send for LinkList {}
unsafe impl Sync for LinkList {}

impl LinkList {
    /// Create an empty list. The head starts as a self-loop.
    pub fn new() -> Self {
        let head = Box::into_raw(Box::new(LinkNode::new()));
        unsafe { (*head).init_detached() };
        LinkList { head }
    }

    #[inline]
    pub(crate) fn head(&self) -> NodePtr {
        self.head
    }

    /// Advisory emptiness check. Exact only at quiescence.
    pub fn is_empty(&self) -> bool {
        let next = unsafe { (*self.head).load_next() };
        next == self.head
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Splice `e` in immediately before the head, i.e. at the tail.
    ///
    /// This is the trusting variant: `e` must be exclusively owned by the
    /// caller and not reachable by any other thread; whatever its fields
    /// held is overwritten.
    ///
    /// # Safety
    ///
    /// `e` is caller-owned, unpublished, and stays allocated while linked.
    pub unsafe fn append(&self, e: NodePtr) {
        self.append_before(self.head, e)
    }

    /// Splice `e` in immediately after the head, i.e. at the front.
    ///
    /// # Safety
    ///
    /// Same contract as [`append`](LinkList::append).
    pub unsafe fn insert(&self, e: NodePtr) {
        self.insert_after(self.head, e)
    }

    /// Splice `e` in immediately before the member `l`.
    ///
    /// # Safety
    ///
    /// `e` as in [`append`](LinkList::append); `l` must be the head or a
    /// current member of this list and stay one until the call returns.
    pub unsafe fn append_before(&self, l: NodePtr, e: NodePtr) {
        let mut backoff = Backoff::new();
        // Cut T -> L, where T is l's current predecessor.
        let t = (*l).lock_prev_link(&mut backoff);
        (*e).store_prev(t);
        (*e).store_next(l);
        (*t).store_next(e);
        (*l).store_prev(e);
    }

    /// Splice `e` in immediately after the member `l`.
    ///
    /// # Safety
    ///
    /// Same contract as [`append_before`](LinkList::append_before).
    pub unsafe fn insert_after(&self, l: NodePtr, e: NodePtr) {
        let mut backoff = Backoff::new();
        let b = (*l).lock_next_link(&mut backoff);
        (*e).store_next(b);
        (*e).store_prev(l);
        (*b).store_prev(e);
        (*l).store_next(e);
    }

    /// Append `e` only if it is currently detached.
    ///
    /// The element is claimed by atomically transitioning it from the
    /// self-loop to fully-locked; if `e` turns out to be linked, mid-claim
    /// by another thread, or anything else, the claim is rolled back and
    /// `false` is returned with `e` unmodified.
    ///
    /// # Safety
    ///
    /// `e` must stay allocated for the duration of the call and, on
    /// success, while linked. Unlike [`append`](LinkList::append), `e` may
    /// be visible to other threads attempting their own `try_` claims.
    pub unsafe fn try_append(&self, e: NodePtr) -> bool {
        if !try_claim_detached(e) {
            return false;
        }
        // e is ours and private now; the splice is the trusting path.
        self.append_before(self.head, e);
        true
    }

    /// Insert-at-front variant of [`try_append`](LinkList::try_append).
    ///
    /// # Safety
    ///
    /// Same contract as [`try_append`](LinkList::try_append).
    pub unsafe fn try_insert(&self, e: NodePtr) -> bool {
        if !try_claim_detached(e) {
            return false;
        }
        self.insert_after(self.head, e);
        true
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Detach and return the first element, or `None` if the list is empty.
    ///
    /// The returned node is in the detached state and exclusively owned by
    /// the caller.
    ///
    /// # Safety
    ///
    /// All members must stay allocated while linked.
    pub unsafe fn pop(&self) -> Option<NodePtr> {
        let mut backoff = Backoff::new();
        loop {
            // Cut head -> first.
            let first = match (*self.head).try_lock_next_link() {
                Some(b) => b,
                None => {
                    backoff.snooze();
                    continue;
                }
            };
            if first == self.head {
                // Empty: the cut link was the head's self-loop.
                link_lock::unlock_next_link(self.head, first);
                return None;
            }
            // Cut first -> second; on conflict release everything first.
            let second = match (*first).try_lock_next_link() {
                Some(c) => c,
                None => {
                    link_lock::unlock_next_link(self.head, first);
                    backoff.snooze();
                    continue;
                }
            };
            link_lock::unlock_link(LinkEnds {
                prev: self.head,
                next: second,
            });
            link_lock::unlock_self(first);
            return Some(first);
        }
    }

    /// Detach the entire chain after the head, leaving the list empty.
    ///
    /// Returns the first node of the chain, or `None` if the list was
    /// empty. The chain is terminated rather than cyclic: the first node's
    /// `prev` points at the former last node and the last node's `next` is
    /// null, so the caller can walk it in either direction.
    ///
    /// # Concurrency restriction
    ///
    /// `behead` isolates the head, so it is safe against every concurrent
    /// operation that goes through a head link: `insert`, `append`,
    /// `try_insert`, `try_append`, `pop`, other `behead`s. It is NOT safe
    /// against concurrent `delete` (or locked-iteration removal) of chain
    /// members: those lock the member's own links without touching the
    /// head and can interleave with the chain hand-over.
    ///
    /// # Safety
    ///
    /// All members must stay allocated while linked, and no concurrent
    /// member deletes may be in flight (see above).
    pub unsafe fn behead(&self) -> Option<NodePtr> {
        let mut backoff = Backoff::new();
        let head = self.head;
        let ends = (*head).lock_elem(&mut backoff);
        if ends.next == head {
            link_lock::unlock_elem(head, ends);
            return None;
        }
        let first = ends.next;
        let last = ends.prev;
        (*first).store_prev(last);
        (*last).store_next(ptr::null_mut());
        link_lock::unlock_self(head);
        Some(first)
    }
}

impl Default for LinkList {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LinkList {
    fn drop(&mut self) {
        // Only the head is ours. Members belong to their allocators and a
        // list must be drained before being dropped if they are to remain
        // usable.
        unsafe { drop(Box::from_raw(self.head)) };
    }
}

/// Detach `e` from whatever list it is in.
///
/// Returns `true` if `e` was linked and is now detached, `false` if it was
/// already detached. In both cases `e` ends in the self-loop state.
///
/// This operation is head-less: it needs no reference to the containing
/// list, only the element.
///
/// # Safety
///
/// `e` and its current neighbors must stay allocated for the duration of
/// the call.
pub unsafe fn delete(e: NodePtr) -> bool {
    let mut backoff = Backoff::new();
    match (*e).lock_full(&mut backoff) {
        None => false,
        Some(ends) => {
            link_lock::unlock_link(ends);
            link_lock::unlock_self(e);
            true
        }
    }
}

/// Atomically transition `e` from detached (self-loop) to fully-locked.
///
/// Any other observation rolls back completely and returns `false` with
/// `e` unmodified: a linked `e`, or an `e` some other thread is currently
/// claiming or locking.
///
/// # Safety
///
/// `e` must stay allocated for the duration of the call.
unsafe fn try_claim_detached(e: NodePtr) -> bool {
    let n = (*e).swap_next(BUSY);
    if is_busy(n) {
        return false;
    }
    if n != e {
        (*e).store_next(n);
        return false;
    }
    let p = (*e).swap_prev(BUSY);
    if is_busy(p) {
        (*e).store_next(n);
        return false;
    }
    if p != e {
        (*e).store_prev(p);
        (*e).store_next(n);
        return false;
    }
    true
}

// ============================================================================
// Tests - single-threaded semantics
// ============================================================================
// Concurrent behavior is covered by common_tests and the stress suites.
