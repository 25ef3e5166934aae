//! # framebus - low-allocation event dispatch for frame loops
//!
//! framebus delivers events to long-lived listener objects in a fixed,
//! priority-driven order without allocating on the invocation path. It is
//! built for per-frame update loops where allocation churn is unacceptable.
//!
//! ## Core Concepts
//!
//! - **Dispatcher**: owns one event identity and its registered listeners
//! - **Listener**: an object implementing [`EventListener`], registered through a non-owning handle
//! - **Priority**: lower values are delivered first; ties keep registration order
//! - **Deferred mutation**: subscribe/unsubscribe from inside a listener take effect on the next invoke
//! - **Fault isolation**: a failing or panicking listener never stops delivery to the others
//!
//! ## Usage
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use framebus::{Dispatcher, EventId, EventListener, ListenerResult};
//!
//! struct Counter(Cell<u32>);
//!
//! impl EventListener for Counter {
//!     fn on_event(&self, _event: EventId, _payload: &()) -> ListenerResult {
//!         self.0.set(self.0.get() + 1);
//!         Ok(())
//!     }
//! }
//!
//! let on_tick: Dispatcher = Dispatcher::new(42);
//! let counter = Rc::new(Counter(Cell::new(0)));
//! on_tick.subscribe_with_priority(&counter, 10);
//! on_tick.invoke();
//! assert_eq!(counter.0.get(), 1);
//! on_tick.unsubscribe(&counter);
//! ```
//!
//! Dispatchers are single-threaded (`!Send`): confine each one to the thread
//! that drives its update loop.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod deferred;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod fault;
pub mod listener;
pub mod pool;
pub mod registry;

// Re-export primary types at crate root for convenience
pub use deferred::{DeferredRegistry, MutationGate, PendingOp};
pub use dispatcher::{DispatchState, Dispatcher, DispatcherConfig, DEFAULT_PRIORITY};
pub use error::{
	FrameBusError, FrameBusResult, ListenerError, ListenerFault, ListenerResult, PoolError,
	RegistryError,
};
pub use event::EventId;
pub use fault::{FaultSink, TracingFaultSink};
pub use listener::{EventListener, ListenerHandle};
pub use pool::{DispatcherPool, PoolConfig, Recycle};
pub use registry::{Entry, OrderedRegistry, Priority};
