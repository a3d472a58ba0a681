//! Iteration over a live list.
//!
//! Both styles drive the caller's body closure from inside the iterator so
//! that every exit path, including an early `ControlFlow::Break`, runs the
//! cleanup that releases whatever is cut. While a body executes, the
//! iterator holds exactly one link-triple:
//!
//! ```text
//! head ─ … ─ A ║ ITEM ║ C ─ … ─ head
//! ```
//!
//! where `║` marks a cut link (both facing ends BUSY). Advancement cuts
//! C's outgoing link first and only then releases the A side, so the
//! iterator never loses its grip on the region it is walking.
//!
//! Concurrent operations elsewhere in the list proceed untouched; anything
//! trying to lock A, ITEM, or C backs off until the window moves past.
//!
//! The body must return normally. Unwinding out of it abandons the cut
//! fields, after which every thread that touches this region spins
//! forever: memory safety is preserved, the list is lost. Bodies should
//! not panic.

use std::ops::ControlFlow;

use crate::backoff::Backoff;

use super::link_lock::{self, LinkEnds};
use super::linked_list::LinkList;
use super::node::{NodePtr, BUSY};

/// One step of a locked-item iteration.
///
/// The current item is fully locked: both its fields and both facing
/// neighbor ends hold BUSY, so no other thread can observe or move it.
pub struct LockedEntry {
    node: NodePtr,
    ends: LinkEnds,
    removed: bool,
}

impl LockedEntry {
    /// The current item.
    #[inline]
    pub fn node(&self) -> NodePtr {
        self.node
    }

    /// Saved neighbor endpoints `(prev, next)` of the current item.
    #[inline]
    pub fn neighbors(&self) -> (NodePtr, NodePtr) {
        (self.ends.prev, self.ends.next)
    }

    /// Remove the current item from the list.
    ///
    /// The cleanup phase splices the neighbors together and leaves the
    /// item detached; after the enclosing `for_each_locked` call moves on,
    /// the caller owns the node exclusively.
    #[inline]
    pub fn remove(&mut self) {
        self.removed = true;
    }
}

/// One step of an unlocked-item iteration.
///
/// The current item is detached (a self-loop); the neighbors keep one BUSY
/// end each, facing the gap the item came out of. Because the item is
/// detached, the body may hand it to another list via a trusting insert by
/// calling [`take`](UnlockedEntry::take).
pub struct UnlockedEntry {
    node: NodePtr,
    ends: LinkEnds,
    taken: bool,
}

impl UnlockedEntry {
    /// The current item, currently detached.
    #[inline]
    pub fn node(&self) -> NodePtr {
        self.node
    }

    /// The neighbors `(prev, next)` the item will be reattached between.
    #[inline]
    pub fn neighbors(&self) -> (NodePtr, NodePtr) {
        (self.ends.prev, self.ends.next)
    }

    /// Keep the item out of the list and assume ownership of it.
    ///
    /// The cleanup phase closes the gap instead of reattaching. The
    /// returned pointer is the detached item; the caller may free it,
    /// reuse it, or splice it into another list.
    #[inline]
    pub fn take(&mut self) -> NodePtr {
        self.taken = true;
        self.node
    }
}

impl LinkList {
    /// Iterate with each item fully locked inside the body.
    ///
    /// The body may call [`LockedEntry::remove`] to delete the current
    /// item and may stop early by returning `ControlFlow::Break(())`.
    /// An empty list runs the body zero times. A body that unwinds
    /// wedges this region of the list for good (see module docs).
    ///
    /// # Safety
    ///
    /// All members must stay allocated while linked.
    pub unsafe fn for_each_locked<F>(&self, mut body: F)
    where
        F: FnMut(&mut LockedEntry) -> ControlFlow<()>,
    {
        let head = self.head();
        let mut backoff = Backoff::new();

        // Cut head -> first.
        let first = loop {
            match (*head).try_lock_next_link() {
                Some(b) => break b,
                None => backoff.snooze(),
            }
        };
        if first == head {
            link_lock::unlock_next_link(head, first);
            return;
        }
        // Cut first's outgoing link. Holding head -> first across these
        // retries is the licensed iterator hold: every competing primitive
        // rolls back rather than waits.
        let mut succ = loop {
            match (*first).try_lock_next_link() {
                Some(c) => break c,
                None => backoff.snooze(),
            }
        };

        let mut pred = head;
        let mut item = first;
        loop {
            let mut entry = LockedEntry {
                node: item,
                ends: LinkEnds {
                    prev: pred,
                    next: succ,
                },
                removed: false,
            };
            let flow = body(&mut entry);
            let removed = entry.removed;

            if matches!(flow, ControlFlow::Break(())) || succ == head {
                let ends = LinkEnds {
                    prev: pred,
                    next: succ,
                };
                if removed {
                    link_lock::unlock_link(ends);
                    link_lock::unlock_self(item);
                } else {
                    link_lock::unlock_full(item, ends);
                }
                return;
            }

            // Advance: cut succ's outgoing link before releasing anything.
            let next_succ = loop {
                match (*succ).try_lock_next_link() {
                    Some(d) => break d,
                    None => backoff.snooze(),
                }
            };
            if removed {
                // pred.next stays cut; it is released pointing past the
                // removed item when the window moves on or terminates.
                link_lock::unlock_self(item);
            } else {
                (*item).store_prev(pred);
                (*pred).store_next(item);
                pred = item;
            }
            item = succ;
            succ = next_succ;
        }
    }

    /// Iterate with each item detached and only its neighbors locked.
    ///
    /// The body may call [`UnlockedEntry::take`] to keep the item out of
    /// the list and may stop early by returning `ControlFlow::Break(())`.
    /// An empty list runs the body zero times. A body that unwinds
    /// wedges this region of the list for good (see module docs).
    ///
    /// # Safety
    ///
    /// All members must stay allocated while linked. If the item's
    /// payload is shared with other threads, coordinating reads of it is
    /// the caller's business; the list only guarantees the linkage is
    /// consistent.
    pub unsafe fn for_each_unlocked<F>(&self, mut body: F)
    where
        F: FnMut(&mut UnlockedEntry) -> ControlFlow<()>,
    {
        let head = self.head();
        let mut backoff = Backoff::new();

        let first = loop {
            match (*head).try_lock_next_link() {
                Some(b) => break b,
                None => backoff.snooze(),
            }
        };
        if first == head {
            link_lock::unlock_next_link(head, first);
            return;
        }
        let mut succ = loop {
            match (*first).try_lock_next_link() {
                Some(c) => break c,
                None => backoff.snooze(),
            }
        };
        // Lift the first item out; the gap keeps BUSY at head.next and
        // succ.prev.
        link_lock::unlock_self(first);

        let mut pred = head;
        let mut item = first;
        loop {
            let mut entry = UnlockedEntry {
                node: item,
                ends: LinkEnds {
                    prev: pred,
                    next: succ,
                },
                taken: false,
            };
            let flow = body(&mut entry);
            let taken = entry.taken;

            if matches!(flow, ControlFlow::Break(())) || succ == head {
                if taken {
                    link_lock::unlock_link(LinkEnds {
                        prev: pred,
                        next: succ,
                    });
                } else {
                    (*item).store_prev(pred);
                    (*item).store_next(succ);
                    (*succ).store_prev(item);
                    (*pred).store_next(item);
                }
                return;
            }

            // Advance: cut succ's outgoing link first.
            let next_succ = loop {
                match (*succ).try_lock_next_link() {
                    Some(d) => break d,
                    None => backoff.snooze(),
                }
            };
            if !taken {
                // Reattach the old item behind the moving gap. Its next
                // field faces the gap, so it is installed already cut.
                (*item).store_prev(pred);
                (*item).store_next(BUSY);
                (*pred).store_next(item);
                pred = item;
            }
            // succ becomes the new detached item.
            link_lock::unlock_self(succ);
            item = succ;
            succ = next_succ;
        }
    }
}
