//! Event identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-assigned identity of an event.
///
/// The dispatcher never interprets this value; it only hands it back to
/// listeners so that one listener can serve several dispatchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i32);

impl EventId {
    /// Wraps a raw event identity.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw identity.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for EventId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<EventId> for i32 {
    fn from(id: EventId) -> Self {
        id.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
