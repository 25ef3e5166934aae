//! Listener fault capture and reporting.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{ListenerFault, ListenerResult};
use crate::event::EventId;

/// Outward report channel for listener faults.
///
/// The dispatcher calls `report` once per faulting listener, after the
/// listener has returned or unwound, and only when fault logging is not
/// suppressed.
pub trait FaultSink {
    /// Records one listener fault.
    fn report(&self, fault: &ListenerFault);
}

/// Default sink: emits one `tracing` warning per fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFaultSink;

impl FaultSink for TracingFaultSink {
    fn report(&self, fault: &ListenerFault) {
        tracing::warn!(
            event = fault.event().get(),
            panicked = fault.is_panic(),
            error = %fault,
            "listener fault during dispatch"
        );
    }
}

/// Runs one delivery, turning both `Err` returns and panics into a
/// `ListenerFault`.
///
/// The success path does not allocate.
pub(crate) fn guard<F>(event: EventId, deliver: F) -> Result<(), ListenerFault>
where
    F: FnOnce() -> ListenerResult,
{
    match panic::catch_unwind(AssertUnwindSafe(deliver)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(ListenerFault::Failed { event, source }),
        Err(payload) => Err(ListenerFault::Panicked {
            event,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_ok() {
        assert!(guard(EventId::new(1), || Ok(())).is_ok());
    }

    #[test]
    fn test_guard_err() {
        let fault = guard(EventId::new(2), || Err("nope".into())).unwrap_err();
        assert!(matches!(fault, ListenerFault::Failed { .. }));
        assert_eq!(fault.event(), EventId::new(2));
    }

    #[test]
    fn test_guard_panic_str() {
        let fault = guard(EventId::new(3), || panic!("static message")).unwrap_err();
        match fault {
            ListenerFault::Panicked { message, .. } => assert_eq!(message, "static message"),
            other => panic!("expected panic fault, got {other:?}"),
        }
    }

    #[test]
    fn test_guard_panic_formatted() {
        let n = 9;
        let fault = guard(EventId::new(3), || panic!("value {n}")).unwrap_err();
        match fault {
            ListenerFault::Panicked { message, .. } => assert_eq!(message, "value 9"),
            other => panic!("expected panic fault, got {other:?}"),
        }
    }

    #[test]
    fn test_panic_message_fallback() {
        let payload: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_tracing_sink_without_subscriber() {
        let fault = ListenerFault::Panicked {
            event: EventId::new(0),
            message: "x".to_string(),
        };
        TracingFaultSink.report(&fault);
    }
}
