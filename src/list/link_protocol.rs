//! # Link-Locking Protocol
//!
//! Design document for the locking discipline used by [`LinkList`].
//!
//! ## Problem
//!
//! A doubly-linked list guarded by one mutex serializes every operation on
//! it. Most operations only touch three adjacent nodes, so threads working
//! on disjoint regions have no real conflict; the single lock is pure
//! overhead.
//!
//! ## Solution: cut the link, own the link
//!
//! Instead of an external lock, a thread briefly *cuts* the one or two
//! links it needs by swapping the pointer fields at both ends to the
//! reserved value `BUSY`:
//!
//! ```text
//! At rest:        A.next ──► B     B.prev ──► A
//!
//! After cutting:  A.next = BUSY    B.prev = BUSY
//!                 (owner remembers: the link was A -> B)
//! ```
//!
//! The swap is the whole trick. It is one atomic instruction that both
//! *probes* (the returned value says whether the field was already cut)
//! and *acquires* (the field now holds BUSY either way). Whoever gets a
//! non-BUSY value back owns that end and is the only thread allowed to
//! write a non-BUSY value into it again.
//!
//! ## Acquisition recipes
//!
//! ```text
//! lock_next_link(A):            lock_full(E):
//!     swap A.next -> BUSY, get B        swap E.prev -> BUSY, get A
//!     swap B.prev -> BUSY, get A        swap A.next -> BUSY, get E
//!                                       swap E.next -> BUSY, get C
//!                                       swap C.prev -> BUSY, get E
//! ```
//!
//! Any swap that returns BUSY is a conflict: some other thread got there
//! first. The loser restores every field it cut, in reverse order of
//! acquisition, with release stores, and retries after a back-off delay.
//!
//! ## Deadlock argument
//!
//! Two threads that race for overlapping links each win their first swap
//! and observe BUSY on a later one. Both roll back completely before
//! sleeping, so neither holds anything while waiting: there is no
//! hold-and-wait, hence no cycle. Exponential back-off with jitter
//! de-synchronizes the contenders so that one of them eventually runs the
//! entire recipe inside the other's sleep.
//!
//! One exception is licensed: the iterators keep their current link-triple
//! while acquiring the next link forward. Every non-iterator primitive
//! always rolls back rather than waiting, and iterators only reach forward
//! (never across the head), so a waiting iterator is always behind the
//! holder it waits for and the wait chain cannot close into a cycle.
//!
//! ## Interleaving scenario: delete vs. delete on neighbors
//!
//! ```text
//! Ring: A <-> B <-> C <-> D.   T1 deletes B, T2 deletes C.
//!
//! T1: swap B.prev -> BUSY      gets A        (stage 1 begins)
//! T2: swap C.prev -> BUSY      gets B
//! T1: swap A.next -> BUSY      gets B        (incoming link owned)
//! T2: swap B.next -> BUSY      gets C        (incoming link owned)
//! T1: swap B.next -> BUSY      BUSY! roll back A.next, B.prev; sleep
//! T2: swap C.next -> BUSY      gets D
//! T2: swap D.prev -> BUSY      gets C        (full lock on C)
//! T2: splice B -> D, C -> self-loop, release
//! T1: retry succeeds: ring is now A <-> B <-> D
//! ```
//!
//! ## Why the detached state is a self-loop
//!
//! A removed node must end in a state that (a) cannot be confused with
//! membership, (b) lets `try_append`/`try_insert` claim it with the same
//! swap-probe used everywhere else, and (c) keeps `delete` idempotent.
//! The self-loop does all three: `lock_full` recognizes the self-reference
//! the moment it reads `prev` and reports "already detached" without
//! locking anything.
//!
//! ## Memory ordering
//!
//! Swaps installing BUSY are `Acquire`: they synchronize with the release
//! store of the value they read, so the owner sees the pointed-to node
//! fully constructed. Restores and reconnections are `Release` stores.
//! No total order across independent links exists or is needed; the
//! happens-before edges run per-field, from each release of a field to
//! the next acquire-swap of that same field.
//!
//! [`LinkList`]: super::LinkList
