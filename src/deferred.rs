//! Deferred-mutation layer over an `OrderedRegistry`.
//!
//! While the owner reports that mutation is unsafe (a dispatch walk is in
//! progress), inserts and removals are queued as `PendingOp`s and replayed in
//! FIFO order once the owner says it is safe again. The layer never decides
//! on its own that a walk is running; every mutating call takes a
//! `MutationGate` from the owner.
//!
//! The registry and the queue live in separate cells. Queuing only ever
//! touches the queue, so a caller may hold a read guard from
//! [`entries`](DeferredRegistry::entries) across any number of mutations.
//! An open-gate mutation that finds the registry still being read is queued
//! as if the gate were closed and applied by the next flush.

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;

use crate::registry::{Entry, OrderedRegistry};

/// Whether the owner currently allows direct registry mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationGate {
    /// Apply immediately.
    Open,
    /// Queue until the next `process_pending`.
    Deferred,
}

/// A structural change that could not be applied when it was requested.
#[derive(Debug, Clone)]
pub enum PendingOp<H> {
    /// Insert an entry.
    Insert(Entry<H>),
    /// Remove the first entry with this handle.
    Remove(H),
    /// Drop every entry. Only queued when `clear` finds the registry being
    /// read; it is always the first op in the queue.
    Clear,
}

/// An `OrderedRegistry` plus its queue of deferred operations.
#[derive(Debug)]
pub struct DeferredRegistry<H> {
    registry: RefCell<OrderedRegistry<H>>,
    pending: RefCell<VecDeque<PendingOp<H>>>,
}

impl<H> Default for DeferredRegistry<H> {
    fn default() -> Self {
        Self {
            registry: RefCell::new(OrderedRegistry::new()),
            pending: RefCell::new(VecDeque::new()),
        }
    }
}

impl<H: PartialEq> DeferredRegistry<H> {
    /// Creates an empty layer with room for `capacity` entries and as many
    /// queued operations.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: RefCell::new(OrderedRegistry::with_capacity(capacity)),
            pending: RefCell::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Inserts `entry`, or queues the insert if the gate is closed.
    pub fn add(&self, entry: Entry<H>, gate: MutationGate) {
        self.apply(PendingOp::Insert(entry), gate);
    }

    /// Removes the first entry for `handle`, or queues the removal if the
    /// gate is closed.
    pub fn remove(&self, handle: H, gate: MutationGate) {
        self.apply(PendingOp::Remove(handle), gate);
    }

    /// Replays every queued operation in the order it was requested.
    ///
    /// Must only be called while mutation is safe. If the registry is still
    /// borrowed by a read guard the queue is left untouched for a later flush.
    pub fn process_pending(&self) {
        if self.pending.borrow().is_empty() {
            return;
        }
        if let Ok(mut registry) = self.registry.try_borrow_mut() {
            drain(&mut registry, &mut self.pending.borrow_mut());
        }
    }

    /// Current registry contents.
    ///
    /// With an open gate, queued operations are applied first. With a
    /// deferred gate the registry is returned as-is so a walk in progress
    /// keeps stable indices.
    pub fn entries(&self, gate: MutationGate) -> Ref<'_, OrderedRegistry<H>> {
        if gate == MutationGate::Open {
            self.process_pending();
        }
        self.registry.borrow()
    }

    fn apply(&self, op: PendingOp<H>, gate: MutationGate) {
        if gate == MutationGate::Open {
            if let Ok(mut registry) = self.registry.try_borrow_mut() {
                // Older queued ops go first so FIFO order holds across the gate.
                let mut pending = self.pending.borrow_mut();
                drain(&mut registry, &mut pending);
                apply_op(&mut registry, op);
                return;
            }
        }
        self.pending.borrow_mut().push_back(op);
    }
}

impl<H> DeferredRegistry<H> {
    /// Registry contents without flushing.
    pub fn registry(&self) -> Ref<'_, OrderedRegistry<H>> {
        self.registry.borrow()
    }

    /// Number of queued operations.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Drops all entries and queued operations.
    ///
    /// If the registry is being read, the entries are dropped by the next
    /// flush instead.
    pub fn clear(&self) {
        let mut pending = self.pending.borrow_mut();
        pending.clear();
        match self.registry.try_borrow_mut() {
            Ok(mut registry) => registry.clear(),
            Err(_) => pending.push_back(PendingOp::Clear),
        }
    }
}

fn drain<H: PartialEq>(registry: &mut OrderedRegistry<H>, pending: &mut VecDeque<PendingOp<H>>) {
    while let Some(op) = pending.pop_front() {
        apply_op(registry, op);
    }
}

fn apply_op<H: PartialEq>(registry: &mut OrderedRegistry<H>, op: PendingOp<H>) {
    match op {
        PendingOp::Insert(entry) => registry.insert(entry),
        PendingOp::Remove(handle) => {
            registry.remove_by_handle(&handle);
        }
        PendingOp::Clear => registry.clear(),
    }
}
