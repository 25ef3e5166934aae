//! Free-list pool of dispatchers.
//!
//! Hosts that create and drop dispatchers every frame can recycle them
//! through `DispatcherPool` instead. Released dispatchers are reset (no
//! registrations, no queued operations, configured fault behaviour) before
//! they are handed out again, so a recycled dispatcher is indistinguishable
//! from a fresh one apart from its retained capacity.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::dispatcher::{DispatchState, Dispatcher, DispatcherConfig};
use crate::error::{FrameBusResult, PoolError};
use crate::event::EventId;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of idle dispatchers kept for reuse.
    pub capacity: usize,
    /// Configuration applied to every dispatcher the pool creates or recycles.
    pub dispatcher: DispatcherConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 32,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl PoolConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> FrameBusResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Returns a pooled object to its freshly-constructed state.
///
/// Called by the pool on every release and again on acquire with the
/// identity the new owner asked for. Implementations must leave no trace of
/// the previous owner: no registrations, no queued operations and the
/// configured fault behaviour.
pub trait Recycle {
    /// Resets `self` to identity `id` under configuration `cfg`.
    fn recycle(&self, id: EventId, cfg: &DispatcherConfig);
}

impl<P> Recycle for Dispatcher<P> {
    fn recycle(&self, id: EventId, cfg: &DispatcherConfig) {
        self.reset(id);
        self.set_suppress_fault_logging(cfg.suppress_fault_logging);
        self.set_fault_sink(None);
    }
}

/// Pool of reusable dispatchers for one payload type.
#[derive(Debug)]
pub struct DispatcherPool<P = ()> {
    cfg: PoolConfig,
    free: Vec<Rc<Dispatcher<P>>>,
}

impl<P> DispatcherPool<P> {
    /// Creates an empty pool.
    pub fn new(cfg: PoolConfig) -> FrameBusResult<Self> {
        if cfg.capacity == 0 {
            return Err(PoolError::ZeroCapacity.into());
        }
        let free = Vec::with_capacity(cfg.capacity);
        Ok(Self { cfg, free })
    }

    /// Hands out an idle dispatcher with identity `id`, creating one if the
    /// pool is empty.
    pub fn acquire(&mut self, id: impl Into<EventId>) -> Rc<Dispatcher<P>> {
        let id = id.into();
        match self.free.pop() {
            Some(dispatcher) => {
                dispatcher.recycle(id, &self.cfg.dispatcher);
                tracing::trace!(event = id.get(), idle = self.free.len(), "dispatcher recycled");
                dispatcher
            }
            None => Rc::new(Dispatcher::with_config(id, &self.cfg.dispatcher)),
        }
    }

    /// Returns a dispatcher to the pool.
    ///
    /// A dispatcher that someone else still references, or that is
    /// mid-dispatch, is declined untouched: it keeps its registrations and
    /// identity. Otherwise it is recycled and kept if the pool has room, or
    /// dropped if not. Returns true if it was kept.
    pub fn release(&mut self, dispatcher: Rc<Dispatcher<P>>) -> bool {
        if Rc::strong_count(&dispatcher) != 1 || dispatcher.state() != DispatchState::Idle {
            return false;
        }

        dispatcher.recycle(EventId::default(), &self.cfg.dispatcher);

        if self.free.len() >= self.cfg.capacity {
            return false;
        }
        self.free.push(dispatcher);
        tracing::trace!(idle = self.free.len(), "dispatcher released");
        true
    }

    /// Number of idle dispatchers ready to be acquired.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.cfg
    }
}
