//! Error types for framebus.
//!
//! All errors in framebus are strongly typed using thiserror.
//! Listener failures never escape `Dispatcher::invoke_with`; they are
//! captured as `ListenerFault`s and handed to the fault sink instead.

use thiserror::Error;

use crate::event::EventId;

/// Error returned by a listener's delivery method.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single delivery to a listener.
pub type ListenerResult = Result<(), ListenerError>;

/// A failure raised by one listener during a dispatch.
///
/// Faults are isolated per listener: the walk continues with the next entry
/// and the caller of `invoke` never observes them.
#[derive(Debug, Error)]
pub enum ListenerFault {
    #[error("Listener for event {event} failed: {source}")]
    Failed {
        event: EventId,
        #[source]
        source: ListenerError,
    },

    #[error("Listener for event {event} panicked: {message}")]
    Panicked {
        event: EventId,
        message: String,
    },
}

impl ListenerFault {
    /// The event identity that was being delivered when the fault occurred.
    #[must_use]
    pub const fn event(&self) -> EventId {
        match self {
            Self::Failed { event, .. } | Self::Panicked { event, .. } => *event,
        }
    }

    /// Returns true if the listener unwound instead of returning an error.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// Positional access errors on an `OrderedRegistry`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Index {index} is out of range for registry of length {len}")]
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
}

/// Pool configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("Pool capacity must be at least 1")]
    ZeroCapacity,
}

/// Top-level error type for framebus.
#[derive(Debug, Error)]
pub enum FrameBusError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },
}

impl FrameBusError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this is a registry error.
    #[must_use]
    pub const fn is_registry(&self) -> bool {
        matches!(self, Self::Registry(_))
    }

    /// Returns true if this is a pool error.
    #[must_use]
    pub const fn is_pool(&self) -> bool {
        matches!(self, Self::Pool(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

impl From<serde_json::Error> for FrameBusError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(err.to_string())
    }
}

/// Result type alias for framebus operations.
pub type FrameBusResult<T> = Result<T, FrameBusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_fault_failed() {
        let err = ListenerFault::Failed {
            event: EventId::new(7),
            source: "boom".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("event 7"));
        assert!(msg.contains("boom"));
        assert_eq!(err.event(), EventId::new(7));
        assert!(!err.is_panic());
    }

    #[test]
    fn test_listener_fault_source_chain() {
        use std::error::Error as _;

        let err = ListenerFault::Failed {
            event: EventId::new(1),
            source: "inner".into(),
        };
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("inner"));
    }

    #[test]
    fn test_listener_fault_panicked() {
        let err = ListenerFault::Panicked {
            event: EventId::new(-3),
            message: "index out of bounds".to_string(),
        };
        assert!(err.is_panic());
        assert!(format!("{err}").contains("panicked"));
        assert_eq!(err.event().get(), -3);
    }

    #[test]
    fn test_registry_error_index() {
        let err = RegistryError::IndexOutOfRange { index: 4, len: 2 };
        let msg = format!("{err}");
        assert!(msg.contains('4'));
        assert!(msg.contains("length 2"));
    }

    #[test]
    fn test_framebus_error_from_registry() {
        let err: FrameBusError = RegistryError::IndexOutOfRange { index: 0, len: 0 }.into();
        assert!(err.is_registry());
        assert!(!err.is_pool());
    }

    #[test]
    fn test_framebus_error_from_pool() {
        let err: FrameBusError = PoolError::ZeroCapacity.into();
        assert!(err.is_pool());
        assert!(format!("{err}").contains("at least 1"));
    }

    #[test]
    fn test_framebus_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: FrameBusError = json_err.into();
        assert!(err.is_config());
    }
}
