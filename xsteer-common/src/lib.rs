#![no_std]

//! Types shared between the xsteer XDP program and userspace: the socket
//! table capacity, the per-frame verdict, and the bounded queue → socket
//! registry mutated by the control plane and read by the redirect decision.

use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// Capacity of the queue → socket table, and therefore the highest receive
/// queue index (exclusive) that can carry a binding. Must match the
/// `max_entries` of the `XSK_SOCKETS` map in the XDP program.
pub const MAX_BOUND_QUEUES: u32 = 64;

/// Disposition of a single received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Hand the frame to the ordinary network stack.
    Pass,
    /// Hand the frame to the socket bound at this receive queue index.
    Redirect(u32),
}

impl Verdict {
    #[inline]
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    #[inline]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Verdict::Redirect(_))
    }

    /// Queue index the frame is dispatched on, if it is redirected at all.
    #[inline]
    pub fn target_queue(&self) -> Option<u32> {
        match self {
            Verdict::Pass => None,
            Verdict::Redirect(queue) => Some(*queue),
        }
    }
}

/// A control-plane mutation the socket table refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    /// The queue index does not fit in the fixed-capacity table. Existing
    /// bindings are left untouched.
    CapacityExceeded { queue: u32 },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::CapacityExceeded { queue } => write!(
                f,
                "queue {queue} is outside the {MAX_BOUND_QUEUES}-slot socket table"
            ),
        }
    }
}

impl core::error::Error for BindError {}

/// Slot layout: bit 32 marks the slot occupied, bits 0..32 hold the socket id.
const OCCUPIED: u64 = 1 << 32;

/// Bounded queue → socket table.
///
/// One slot per receive queue index, pre-allocated at fixed capacity. Each
/// slot packs an occupancy bit and the bound socket id into a single atomic
/// word, so a reader observes either the old binding or the new one, never a
/// mix of the two.
///
/// Discipline: a single writer (the control plane) against any number of
/// readers, one per active queue. No operation blocks, loops over other
/// slots (except [`len`](Self::len)), or allocates.
pub struct QueueRegistry {
    slots: [AtomicU64; MAX_BOUND_QUEUES as usize],
}

impl QueueRegistry {
    /// An empty table. All queues resolve to [`Verdict::Pass`].
    pub const fn new() -> Self {
        QueueRegistry {
            slots: [const { AtomicU64::new(0) }; MAX_BOUND_QUEUES as usize],
        }
    }

    /// Socket currently bound to `queue`. Absence is a normal outcome, not
    /// an error; out-of-range queues are simply never bound.
    #[inline]
    pub fn lookup(&self, queue: u32) -> Option<u32> {
        let slot = self.slots.get(queue as usize)?.load(Ordering::Acquire);
        (slot & OCCUPIED != 0).then_some(slot as u32)
    }

    /// Decide the disposition of a frame that arrived on `rx_queue`.
    ///
    /// Total and allocation-free. A bound queue yields
    /// [`Verdict::Redirect`] carrying the same index the frame arrived on;
    /// everything else, including a lookup miss, yields [`Verdict::Pass`].
    #[inline]
    pub fn decide(&self, rx_queue: u32) -> Verdict {
        match self.lookup(rx_queue) {
            Some(_) => Verdict::Redirect(rx_queue),
            None => Verdict::Pass,
        }
    }

    /// Bind `socket` to `queue`, replacing any previous binding for that
    /// queue (the replaced socket is returned). Rejects queues beyond the
    /// table capacity without touching existing entries; there is no
    /// eviction.
    pub fn bind(&self, queue: u32, socket: u32) -> Result<Option<u32>, BindError> {
        let slot = self
            .slots
            .get(queue as usize)
            .ok_or(BindError::CapacityExceeded { queue })?;
        let prev = slot.swap(OCCUPIED | u64::from(socket), Ordering::AcqRel);
        Ok((prev & OCCUPIED != 0).then_some(prev as u32))
    }

    /// Remove the binding for `queue`, returning the socket that was bound.
    pub fn unbind(&self, queue: u32) -> Option<u32> {
        let prev = self.slots.get(queue as usize)?.swap(0, Ordering::AcqRel);
        (prev & OCCUPIED != 0).then_some(prev as u32)
    }

    /// Number of bound queues. Walks the whole table; meant for the control
    /// plane, not the per-frame path.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.load(Ordering::Acquire) & OCCUPIED != 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        QueueRegistry::new()
    }
}

impl fmt::Debug for QueueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for queue in 0..MAX_BOUND_QUEUES {
            if let Some(socket) = self.lookup(queue) {
                map.entry(&queue, &socket);
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::format;

    use super::*;

    #[test]
    fn verdict_accessors() {
        assert!(Verdict::Pass.is_pass());
        assert!(!Verdict::Pass.is_redirect());
        assert_eq!(Verdict::Pass.target_queue(), None);

        let redirect = Verdict::Redirect(3);
        assert!(redirect.is_redirect());
        assert!(!redirect.is_pass());
        assert_eq!(redirect.target_queue(), Some(3));
    }

    #[test]
    fn empty_table_passes_everything() {
        let registry = QueueRegistry::new();
        assert!(registry.is_empty());
        for queue in [0, 5, 63, 64, u32::MAX] {
            assert_eq!(registry.lookup(queue), None);
            assert_eq!(registry.decide(queue), Verdict::Pass);
        }
    }

    #[test]
    fn bound_queue_redirects_to_its_own_index() {
        let registry = QueueRegistry::new();
        registry.bind(3, 7).unwrap();

        assert_eq!(registry.decide(3), Verdict::Redirect(3));
        assert_eq!(registry.lookup(3), Some(7));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unbound_queue_passes() {
        let registry = QueueRegistry::new();
        registry.bind(3, 7).unwrap();

        assert_eq!(registry.decide(5), Verdict::Pass);
        assert_eq!(registry.lookup(5), None);
    }

    #[test]
    fn rebind_is_last_write_wins() {
        let registry = QueueRegistry::new();
        assert_eq!(registry.bind(2, 9).unwrap(), None);
        assert_eq!(registry.bind(2, 11).unwrap(), Some(9));

        assert_eq!(registry.lookup(2), Some(11));
        assert_eq!(registry.decide(2), Verdict::Redirect(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unbind_removes_visibility() {
        let registry = QueueRegistry::new();
        registry.bind(4, 8).unwrap();
        assert_eq!(registry.decide(4), Verdict::Redirect(4));

        assert_eq!(registry.unbind(4), Some(8));
        assert_eq!(registry.decide(4), Verdict::Pass);
        assert_eq!(registry.lookup(4), None);

        // A second unbind finds nothing to remove.
        assert_eq!(registry.unbind(4), None);
    }

    #[test]
    fn full_table_rejects_out_of_range_queue() {
        let registry = QueueRegistry::new();
        for queue in 0..MAX_BOUND_QUEUES {
            registry.bind(queue, 100 + queue).unwrap();
        }
        assert_eq!(registry.len(), registry.capacity());

        assert_eq!(
            registry.bind(64, 500),
            Err(BindError::CapacityExceeded { queue: 64 })
        );
        assert_eq!(
            registry.bind(u32::MAX, 500),
            Err(BindError::CapacityExceeded { queue: u32::MAX })
        );

        // Every prior binding is still intact and resolves on its own index.
        for queue in 0..MAX_BOUND_QUEUES {
            assert_eq!(registry.lookup(queue), Some(100 + queue));
            assert_eq!(registry.decide(queue), Verdict::Redirect(queue));
        }
        assert_eq!(registry.len(), 64);
    }

    #[test]
    fn unbind_out_of_range_is_a_miss() {
        let registry = QueueRegistry::new();
        assert_eq!(registry.unbind(64), None);
        assert_eq!(registry.unbind(u32::MAX), None);
    }

    #[test]
    fn decision_is_deterministic_for_a_fixed_table() {
        let registry = QueueRegistry::new();
        registry.bind(3, 7).unwrap();

        for _ in 0..1000 {
            assert_eq!(registry.decide(3), Verdict::Redirect(3));
            assert_eq!(registry.decide(5), Verdict::Pass);
        }
    }

    #[test]
    fn socket_id_zero_is_a_valid_binding() {
        let registry = QueueRegistry::new();
        registry.bind(0, 0).unwrap();

        assert_eq!(registry.lookup(0), Some(0));
        assert_eq!(registry.decide(0), Verdict::Redirect(0));
    }

    #[test]
    fn debug_lists_bound_entries() {
        let registry = QueueRegistry::new();
        registry.bind(1, 10).unwrap();
        registry.bind(63, 20).unwrap();

        assert_eq!(format!("{registry:?}"), "{1: 10, 63: 20}");
    }

    #[test]
    fn bind_error_names_the_offending_queue() {
        let err = BindError::CapacityExceeded { queue: 64 };
        assert_eq!(
            format!("{err}"),
            "queue 64 is outside the 64-slot socket table"
        );
    }
}
