//! Priority-ordered, reentrancy-safe event dispatcher.
//!
//! A `Dispatcher` owns one event identity and a `DeferredRegistry` of
//! listener handles. Each `invoke` moves through
//! `Idle -> Flushing -> Iterating -> Idle`:
//!
//! - **Flushing** replays subscribe/unsubscribe requests queued during the
//!   previous cycle.
//! - **Iterating** walks the registry by index. Any subscribe/unsubscribe a
//!   listener issues now is queued, so the walk delivers to exactly the
//!   snapshot that existed when the cycle started.
//!
//! Every method takes `&self` so a listener holding an `Rc<Dispatcher<P>>`
//! can call back into the dispatcher that is delivering to it. No interior
//! borrow is held while a listener runs. A guard returned by
//! [`listeners`](Dispatcher::listeners) counts as a walk for mutation
//! purposes: subscribe, unsubscribe and clear issued while it is alive are
//! queued and applied by the next flush.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::deferred::{DeferredRegistry, MutationGate};
use crate::error::{FrameBusResult, ListenerFault};
use crate::event::EventId;
use crate::fault::{self, FaultSink, TracingFaultSink};
use crate::listener::{EventListener, ListenerHandle};
use crate::registry::{Entry, OrderedRegistry, Priority};

/// Priority used by `subscribe`.
pub const DEFAULT_PRIORITY: Priority = 0;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Entries (and queued operations) to reserve up front.
    pub initial_capacity: usize,
    /// When true, listener faults are swallowed without reaching the sink.
    pub suppress_fault_logging: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 8,
            suppress_fault_logging: false,
        }
    }
}

impl DispatcherConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> FrameBusResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Where a dispatcher is in its invocation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// No invocation in progress; mutations apply immediately.
    Idle,
    /// Replaying queued mutations at the start of an invocation.
    Flushing,
    /// Walking listeners; mutations are queued.
    Iterating,
}

/// Event dispatcher for one event identity.
///
/// `P` is the payload type; use `Dispatcher<()>` (the default) for events
/// without a payload and call [`invoke`](Dispatcher::invoke).
pub struct Dispatcher<P = ()> {
    id: Cell<EventId>,
    layer: DeferredRegistry<ListenerHandle<P>>,
    state: Cell<DispatchState>,
    depth: Cell<u32>,
    suppress_fault_logging: Cell<bool>,
    fault_sink: RefCell<Option<Rc<dyn FaultSink>>>,
}

impl<P> Dispatcher<P> {
    /// Creates a dispatcher with default configuration.
    #[must_use]
    pub fn new(id: impl Into<EventId>) -> Self {
        Self::with_config(id, &DispatcherConfig::default())
    }

    /// Creates a dispatcher with explicit configuration.
    #[must_use]
    pub fn with_config(id: impl Into<EventId>, cfg: &DispatcherConfig) -> Self {
        Self {
            id: Cell::new(id.into()),
            layer: DeferredRegistry::with_capacity(cfg.initial_capacity),
            state: Cell::new(DispatchState::Idle),
            depth: Cell::new(0),
            suppress_fault_logging: Cell::new(cfg.suppress_fault_logging),
            fault_sink: RefCell::new(None),
        }
    }

    /// The event identity handed to listeners.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id.get()
    }

    /// Current position in the invocation cycle.
    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.state.get()
    }

    /// Returns true while a walk over the listeners is in progress.
    #[must_use]
    pub fn is_iterating(&self) -> bool {
        self.state.get() == DispatchState::Iterating
    }

    /// Replaces the fault sink. `None` restores the default `tracing` sink.
    pub fn set_fault_sink(&self, sink: Option<Rc<dyn FaultSink>>) {
        *self.fault_sink.borrow_mut() = sink;
    }

    /// Enables or disables fault reporting.
    pub fn set_suppress_fault_logging(&self, suppress: bool) {
        self.suppress_fault_logging.set(suppress);
    }

    /// Returns true if listener faults are currently swallowed silently.
    #[must_use]
    pub fn suppresses_fault_logging(&self) -> bool {
        self.suppress_fault_logging.get()
    }

    /// Registers `listener` at the default priority.
    pub fn subscribe<L>(&self, listener: &Rc<L>)
    where
        L: EventListener<P> + 'static,
    {
        self.subscribe_with_priority(listener, DEFAULT_PRIORITY);
    }

    /// Registers `listener` at `priority`. Lower priorities are delivered
    /// first; equal priorities in registration order.
    ///
    /// Registering the same listener twice creates two independent entries.
    pub fn subscribe_with_priority<L>(&self, listener: &Rc<L>, priority: Priority)
    where
        L: EventListener<P> + 'static,
    {
        self.subscribe_handle(ListenerHandle::new(listener), priority);
    }

    /// Registers an existing handle at `priority`.
    pub fn subscribe_handle(&self, handle: ListenerHandle<P>, priority: Priority) {
        let gate = self.gate();
        self.layer.add(Entry::new(handle, priority), gate);
    }

    /// Removes one registration of `listener`, whatever priority it was
    /// registered at.
    pub fn unsubscribe<L>(&self, listener: &Rc<L>)
    where
        L: EventListener<P> + 'static,
    {
        self.unsubscribe_handle(ListenerHandle::new(listener));
    }

    /// Removes one registration of `handle`.
    pub fn unsubscribe_handle(&self, handle: ListenerHandle<P>) {
        let gate = self.gate();
        self.layer.remove(handle, gate);
    }

    /// Returns true if `listener` has at least one registration.
    ///
    /// Outside of a walk, queued operations are applied first.
    #[must_use]
    pub fn is_subscribed<L>(&self, listener: &Rc<L>) -> bool
    where
        L: EventListener<P> + 'static,
    {
        self.is_handle_subscribed(&ListenerHandle::new(listener))
    }

    /// Handle-based variant of [`is_subscribed`](Self::is_subscribed).
    #[must_use]
    pub fn is_handle_subscribed(&self, handle: &ListenerHandle<P>) -> bool {
        let gate = self.gate();
        self.layer.entries(gate).contains(handle)
    }

    /// Current registrations in delivery order.
    ///
    /// Outside of a walk, queued operations are applied first. While the
    /// returned guard is alive, subscribe and unsubscribe are queued as they
    /// would be during a walk.
    pub fn listeners(&self) -> Ref<'_, OrderedRegistry<ListenerHandle<P>>> {
        self.layer.entries(self.gate())
    }

    /// Number of current registrations (see [`listeners`](Self::listeners)).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Number of subscribe/unsubscribe requests waiting for the next flush.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.layer.pending_len()
    }

    /// Drops every registration and every queued operation.
    ///
    /// Calling this from a listener of this same dispatcher cuts the current
    /// walk short.
    pub fn clear(&self) {
        self.layer.clear();
        tracing::debug!(event = self.id.get().get(), "dispatcher cleared");
    }

    /// Recycle hook: clears the dispatcher and gives it a new identity.
    pub fn reset(&self, id: impl Into<EventId>) {
        let id = id.into();
        self.layer.clear();
        self.id.set(id);
        tracing::debug!(event = id.get(), "dispatcher reset");
    }

    /// Delivers `payload` to every listener registered when this call
    /// starts, in priority order.
    ///
    /// Listener failures are isolated and reported to the fault sink; they
    /// never reach the caller. A re-entrant call from inside a listener
    /// walks the same registry without flushing; nothing guards against
    /// unbounded self-triggering.
    pub fn invoke_with(&self, payload: &P) {
        let walk = Walk::enter(self);
        let event = self.id.get();

        let count = self.layer.registry().len();
        for index in 0..count {
            let Some(handle) = self
                .layer
                .registry()
                .get(index)
                .map(|entry| entry.handle.clone())
            else {
                break;
            };

            let outcome = fault::guard(event, || handle.deliver(event, payload).unwrap_or(Ok(())));
            if let Err(fault) = outcome {
                self.report(&fault);
            }
        }

        drop(walk);
    }

    fn gate(&self) -> MutationGate {
        match self.state.get() {
            DispatchState::Iterating => MutationGate::Deferred,
            DispatchState::Idle | DispatchState::Flushing => MutationGate::Open,
        }
    }

    fn report(&self, fault: &ListenerFault) {
        if self.suppress_fault_logging.get() {
            return;
        }
        let sink = self.fault_sink.borrow().clone();
        match sink {
            Some(sink) => sink.report(fault),
            None => TracingFaultSink.report(fault),
        }
    }
}

impl Dispatcher<()> {
    /// Delivers a payload-less event.
    pub fn invoke(&self) {
        self.invoke_with(&());
    }
}

impl<P> fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.id.get())
            .field("state", &self.state.get())
            .field("depth", &self.depth.get())
            .field("listeners", &self.layer.registry().len())
            .field("pending", &self.layer.pending_len())
            .field("suppress_fault_logging", &self.suppress_fault_logging.get())
            .finish_non_exhaustive()
    }
}

/// Tracks one (possibly nested) walk and restores `Idle` when the outermost
/// walk ends, even if a fault sink unwinds.
struct Walk<'a, P> {
    dispatcher: &'a Dispatcher<P>,
}

impl<'a, P> Walk<'a, P> {
    fn enter(dispatcher: &'a Dispatcher<P>) -> Self {
        let depth = dispatcher.depth.get() + 1;
        dispatcher.depth.set(depth);
        // Guard exists before any state change so every exit restores Idle.
        let walk = Self { dispatcher };
        if depth == 1 {
            dispatcher.state.set(DispatchState::Flushing);
            dispatcher.layer.process_pending();
        }
        dispatcher.state.set(DispatchState::Iterating);
        walk
    }
}

impl<P> Drop for Walk<'_, P> {
    fn drop(&mut self) {
        let depth = self.dispatcher.depth.get().saturating_sub(1);
        self.dispatcher.depth.set(depth);
        if depth == 0 {
            self.dispatcher.state.set(DispatchState::Idle);
        }
    }
}
