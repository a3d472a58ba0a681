//! Link acquisition and release primitives.
//!
//! A *link* is the edge from node A's `next` to node B's `prev`. Owning a
//! link means having swapped both of those fields to [`BUSY`]; the prior
//! values are the link contents the owner must preserve to put the list
//! back together. Every acquisition below is built from single atomic
//! exchanges that probe and lock in one step, and every multi-step
//! acquisition rolls back in LIFO order the moment one exchange reports a
//! conflict, so no thread ever waits while holding a cut end.
//!
//! See [`link_protocol`](super::link_protocol) for the full protocol
//! narrative and the deadlock argument.

use crate::backoff::Backoff;

use super::node::{is_busy, LinkNode, NodePtr, BUSY};

/// Saved endpoints around a locked element: `prev` is the predecessor the
/// element was reached from, `next` its successor. Whoever holds them is
/// obliged to write them back (or splice past them) before forgetting them.
#[derive(Debug, Copy, Clone)]
pub(crate) struct LinkEnds {
    pub(crate) prev: NodePtr,
    pub(crate) next: NodePtr,
}

/// Outcome of a single full-lock probe.
pub(crate) enum FullLockAttempt {
    /// Element plus both adjacent links are owned by the caller.
    Locked(LinkEnds),
    /// The element is a self-loop; nothing was left locked.
    Detached,
    /// Some end was already cut; everything acquired was rolled back.
    Contended,
}

impl LinkNode {
    // =========================================================================
    // Single-shot probes
    // =========================================================================

    /// Try once to own the link leaving this node.
    ///
    /// On success the successor is returned and both `self.next` and
    /// `successor.prev` are left BUSY. On conflict nothing remains locked.
    ///
    /// # Safety
    ///
    /// `self` must be a member (or head) of a well-formed ring whose nodes
    /// stay allocated for the duration of the call.
    pub(crate) unsafe fn try_lock_next_link(&self) -> Option<NodePtr> {
        let b = self.swap_next(BUSY);
        if is_busy(b) {
            // Already cut by another thread; we changed nothing.
            return None;
        }
        let back = (*b).swap_prev(BUSY);
        if is_busy(back) {
            // The far end is being locked from another direction.
            self.store_next(b);
            return None;
        }
        debug_assert_eq!(back, self.as_ptr());
        Some(b)
    }

    /// Mirror of [`try_lock_next_link`]: try once to own the link arriving
    /// at this node, returning the predecessor.
    ///
    /// This is the non-blocking probe the public surface documents as
    /// `try_lock_prev`: under contention it returns `None` instead of
    /// retrying, and no field is left cut.
    ///
    /// # Safety
    ///
    /// Same ring-membership and liveness contract as
    /// [`try_lock_next_link`].
    ///
    /// [`try_lock_next_link`]: LinkNode::try_lock_next_link
    pub unsafe fn try_lock_prev(&self) -> Option<NodePtr> {
        let a = self.swap_prev(BUSY);
        if is_busy(a) {
            return None;
        }
        let fwd = (*a).swap_next(BUSY);
        if is_busy(fwd) {
            self.store_prev(a);
            return None;
        }
        debug_assert_eq!(fwd, self.as_ptr());
        Some(a)
    }

    /// Try once to isolate just this element, leaving its neighbors
    /// untouched and fully functional.
    ///
    /// Returns the saved field contents; the caller must eventually restore
    /// them via [`unlock_elem`] or transfer them elsewhere.
    ///
    /// # Safety
    ///
    /// Same contract as [`try_lock_next_link`](LinkNode::try_lock_next_link).
    pub(crate) unsafe fn try_lock_elem(&self) -> Option<LinkEnds> {
        let n = self.swap_next(BUSY);
        if is_busy(n) {
            return None;
        }
        let p = self.swap_prev(BUSY);
        if is_busy(p) {
            self.store_next(n);
            return None;
        }
        Some(LinkEnds { prev: p, next: n })
    }

    /// Try once to own this element plus both adjacent links.
    ///
    /// Acquisition order matters for the rollback argument: the incoming
    /// link first, the outgoing link second. A conflict in the second stage
    /// releases the first stage too, so a failed probe leaves no field cut.
    ///
    /// A detached element is recognized by the self-reference in `prev` and
    /// reported instead of locked; locking a self-loop with this sequence
    /// would conflict with itself.
    ///
    /// # Safety
    ///
    /// Same contract as [`try_lock_next_link`](LinkNode::try_lock_next_link).
    pub(crate) unsafe fn try_lock_full(&self) -> FullLockAttempt {
        // Stage 1: incoming link A -> self.
        let a = self.swap_prev(BUSY);
        if is_busy(a) {
            return FullLockAttempt::Contended;
        }
        if a == self.as_ptr() {
            self.store_prev(a);
            return FullLockAttempt::Detached;
        }
        let back = (*a).swap_next(BUSY);
        if is_busy(back) {
            self.store_prev(a);
            return FullLockAttempt::Contended;
        }
        debug_assert_eq!(back, self.as_ptr());

        // Stage 2: outgoing link self -> C.
        let c = self.swap_next(BUSY);
        if is_busy(c) {
            (*a).store_next(self.as_ptr());
            self.store_prev(a);
            return FullLockAttempt::Contended;
        }
        let fwd = (*c).swap_prev(BUSY);
        if is_busy(fwd) {
            self.store_next(c);
            (*a).store_next(self.as_ptr());
            self.store_prev(a);
            return FullLockAttempt::Contended;
        }
        debug_assert_eq!(fwd, self.as_ptr());

        FullLockAttempt::Locked(LinkEnds { prev: a, next: c })
    }

    // =========================================================================
    // Blocking wrappers
    // =========================================================================

    /// Own the link leaving this node, retrying with back-off until it is
    /// acquired. No field is held during a back-off step.
    ///
    /// # Safety
    ///
    /// Same contract as [`try_lock_next_link`](LinkNode::try_lock_next_link).
    pub(crate) unsafe fn lock_next_link(&self, backoff: &mut Backoff) -> NodePtr {
        loop {
            if let Some(b) = self.try_lock_next_link() {
                return b;
            }
            backoff.snooze();
        }
    }

    /// Own the link arriving at this node, retrying with back-off.
    ///
    /// # Safety
    ///
    /// Same contract as [`try_lock_next_link`](LinkNode::try_lock_next_link).
    pub(crate) unsafe fn lock_prev_link(&self, backoff: &mut Backoff) -> NodePtr {
        loop {
            if let Some(a) = self.try_lock_prev() {
                return a;
            }
            backoff.snooze();
        }
    }

    /// Isolate this element, retrying with back-off.
    ///
    /// # Safety
    ///
    /// Same contract as [`try_lock_next_link`](LinkNode::try_lock_next_link).
    pub(crate) unsafe fn lock_elem(&self, backoff: &mut Backoff) -> LinkEnds {
        loop {
            if let Some(ends) = self.try_lock_elem() {
                return ends;
            }
            backoff.snooze();
        }
    }

    /// Fully lock this element, retrying with back-off. `None` means the
    /// element turned out to be detached; nothing is locked in that case.
    ///
    /// # Safety
    ///
    /// Same contract as [`try_lock_next_link`](LinkNode::try_lock_next_link).
    pub(crate) unsafe fn lock_full(&self, backoff: &mut Backoff) -> Option<LinkEnds> {
        loop {
            match self.try_lock_full() {
                FullLockAttempt::Locked(ends) => return Some(ends),
                FullLockAttempt::Detached => return None,
                FullLockAttempt::Contended => backoff.snooze(),
            }
        }
    }
}

// =============================================================================
// Release operations
// =============================================================================
//
// All of these are plain release-ordered stores of non-BUSY values into
// fields the caller previously swapped to BUSY. Restores happen in reverse
// order of acquisition.

/// Reconnect a link acquired by `try_lock_next_link(a)`.
///
/// # Safety
///
/// The caller must own the link, i.e. `a.next` and `b.prev` are BUSY from
/// its own acquisition, and `b` was the value returned by it.
pub(crate) unsafe fn unlock_next_link(a: NodePtr, b: NodePtr) {
    (*b).store_prev(a);
    (*a).store_next(b);
}

/// Reconnect a link acquired by `try_lock_prev(e)`.
///
/// # Safety
///
/// The caller must own the link: `e.prev` and `a.next` are BUSY from its
/// own acquisition, and `a` was the predecessor returned by it.
pub unsafe fn unlock_prev_link(e: NodePtr, a: NodePtr) {
    (*a).store_next(e);
    (*e).store_prev(a);
}

/// Restore an element isolated by `try_lock_elem`.
///
/// # Safety
///
/// `ends` must be the saved contents returned by the caller's own
/// `try_lock_elem(e)`, unmodified.
pub(crate) unsafe fn unlock_elem(e: NodePtr, ends: LinkEnds) {
    (*e).store_prev(ends.prev);
    (*e).store_next(ends.next);
}

/// Reconnect the two outer ends to each other, bypassing the element they
/// were saved from. This is what deletes an element after a full lock.
///
/// # Safety
///
/// The caller must own both outer ends (`ends.prev.next` and
/// `ends.next.prev` BUSY); the bypassed element's own fields remain BUSY
/// and still belong to the caller afterwards.
pub(crate) unsafe fn unlock_link(ends: LinkEnds) {
    (*ends.next).store_prev(ends.prev);
    (*ends.prev).store_next(ends.next);
}

/// Reinstall a fully locked element between its saved neighbors.
///
/// # Safety
///
/// The caller must own the full lock on `e` with saved endpoints `ends`.
pub(crate) unsafe fn unlock_full(e: NodePtr, ends: LinkEnds) {
    (*ends.next).store_prev(e);
    (*e).store_next(ends.next);
    (*ends.prev).store_next(e);
    (*e).store_prev(ends.prev);
}

/// Write the detached self-loop into an element whose both fields the
/// caller owns.
///
/// # Safety
///
/// `e.prev` and `e.next` must be BUSY from the caller's own acquisition
/// (or `e` must be unpublished).
pub(crate) unsafe fn unlock_self(e: NodePtr) {
    (*e).store_next(e);
    (*e).store_prev(e);
}

#[cfg(test)]
mod tests {
    use super::super::node::{is_busy, LinkNode};
    use super::*;

    // Build a ring head <-> x <-> y by hand.
    fn ring2() -> (Box<LinkNode>, Box<LinkNode>, Box<LinkNode>) {
        let head = Box::new(LinkNode::new());
        let x = Box::new(LinkNode::new());
        let y = Box::new(LinkNode::new());
        head.store_next(x.as_ptr());
        head.store_prev(y.as_ptr());
        x.store_prev(head.as_ptr());
        x.store_next(y.as_ptr());
        y.store_prev(x.as_ptr());
        y.store_next(head.as_ptr());
        (head, x, y)
    }

    #[test]
    fn next_link_lock_cuts_both_ends() {
        let (head, x, _y) = ring2();
        unsafe {
            let b = head.try_lock_next_link().expect("uncontended");
            assert_eq!(b, x.as_ptr());
            assert!(is_busy(head.load_next()));
            assert!(is_busy(x.load_prev()));
            unlock_next_link(head.as_ptr(), b);
        }
        assert_eq!(head.load_next(), x.as_ptr());
        assert_eq!(x.load_prev(), head.as_ptr());
    }

    #[test]
    fn contended_probe_rolls_back() {
        let (head, x, _y) = ring2();
        unsafe {
            // Cut x.prev from the far side, as a competing locker would.
            let a = x.try_lock_prev().expect("uncontended");
            assert_eq!(a, head.as_ptr());

            // Now the head's outgoing probe must fail without leaving
            // head.next cut.
            assert!(head.try_lock_next_link().is_none());
            assert!(is_busy(head.load_next()));

            unlock_prev_link(x.as_ptr(), a);
        }
        assert_eq!(head.load_next(), x.as_ptr());
        assert_eq!(x.load_prev(), head.as_ptr());
    }

    #[test]
    fn elem_lock_leaves_neighbors_functional() {
        let (head, x, y) = ring2();
        unsafe {
            let ends = x.try_lock_elem().expect("uncontended");
            assert_eq!(ends.prev, head.as_ptr());
            assert_eq!(ends.next, y.as_ptr());
            // Neighbors still point at x and are not cut.
            assert_eq!(head.load_next(), x.as_ptr());
            assert_eq!(y.load_prev(), x.as_ptr());
            unlock_elem(x.as_ptr(), ends);
        }
        assert_eq!(x.load_prev(), head.as_ptr());
        assert_eq!(x.load_next(), y.as_ptr());
    }

    #[test]
    fn full_lock_then_splice_deletes() {
        let (head, x, y) = ring2();
        unsafe {
            let ends = match x.try_lock_full() {
                FullLockAttempt::Locked(ends) => ends,
                _ => panic!("expected full lock"),
            };
            unlock_link(ends);
            unlock_self(x.as_ptr());
        }
        assert_eq!(head.load_next(), y.as_ptr());
        assert_eq!(y.load_prev(), head.as_ptr());
        assert!(x.is_detached_hint());
        assert_eq!(x.load_prev(), x.as_ptr());
    }

    #[test]
    fn full_lock_reports_detached() {
        let e = Box::new(LinkNode::new());
        e.init_detached();
        unsafe {
            assert!(matches!(e.try_lock_full(), FullLockAttempt::Detached));
        }
        // Nothing left cut.
        assert!(e.is_detached_hint());
        assert_eq!(e.load_prev(), e.as_ptr());
    }

    #[test]
    fn full_lock_reinstall_restores_ring() {
        let (head, x, y) = ring2();
        unsafe {
            let ends = match x.try_lock_full() {
                FullLockAttempt::Locked(ends) => ends,
                _ => panic!("expected full lock"),
            };
            unlock_full(x.as_ptr(), ends);
        }
        assert_eq!(head.load_next(), x.as_ptr());
        assert_eq!(x.load_prev(), head.as_ptr());
        assert_eq!(x.load_next(), y.as_ptr());
        assert_eq!(y.load_prev(), x.as_ptr());
    }
}
