//! Dispatch results.
//!
//! Dispatch never fails from the caller's point of view. What happened is
//! described by a [`DispatchOutcome`], which always carries a
//! [`DispatchReport`] with per-handler failures.

use hookline_core::SubscriptionId;
use hookline_events::TriggeredEvent;
use serde::Serialize;

use crate::errors::HandlerError;

/// A handler that returned an error or panicked during dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HandlerFailure {
    /// Chain level of the stream that ran the handler; 0 is the stream
    /// `dispatch` was called on.
    pub depth: usize,
    /// Registration the handler was attached under.
    pub subscription_id: SubscriptionId,
    /// Tag of the event being dispatched.
    pub event_type: String,
    /// Rendered error.
    pub error: String,
}

/// What one dispatch call did across the chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Tag of the dispatched event.
    pub event_type: String,
    /// Handlers invoked, failed ones included.
    pub invoked: usize,
    /// Streams that delivered the event to their subscribers.
    pub levels: usize,
    /// Handlers that failed, in invocation order.
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    pub(crate) fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_owned(),
            ..Self::default()
        }
    }

    pub(crate) fn record_failure(
        &mut self,
        depth: usize,
        subscription_id: SubscriptionId,
        error: &HandlerError,
    ) {
        self.failures.push(HandlerFailure {
            depth,
            subscription_id,
            event_type: self.event_type.clone(),
            error: error.to_string(),
        });
    }

    /// True when no handler failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Handlers that completed without error.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.invoked - self.failures.len()
    }
}

/// Why a stream refused to dispatch an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RefusalReason {
    /// Too many dispatch frames were already active on the stream.
    NestingLimit {
        /// The configured limit.
        limit: usize,
    },
}

impl std::fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NestingLimit { limit } => write!(f, "nesting limit of {limit} reached"),
        }
    }
}

/// Result of dispatching one event.
#[derive(Debug)]
pub enum DispatchOutcome<E> {
    /// Every stream in the chain delivered the event; here it is back with
    /// all responses attached.
    Delivered {
        /// The dispatched event.
        event: TriggeredEvent<E>,
        /// What happened along the way.
        report: DispatchReport,
    },

    /// A Closed stream buffered the event. It comes back out of that
    /// stream's `open`.
    Captured {
        /// Chain level of the stream holding the event.
        depth: usize,
        /// Deliveries that happened before the event was buffered.
        report: DispatchReport,
    },

    /// A stream refused to deliver the event; nothing at or below that
    /// level ran.
    Refused {
        /// The event, with responses from the levels above.
        event: TriggeredEvent<E>,
        /// Chain level of the refusing stream.
        depth: usize,
        /// Why it refused.
        reason: RefusalReason,
        /// Deliveries that happened before the refusal.
        report: DispatchReport,
    },
}

impl<E> DispatchOutcome<E> {
    /// The report, whatever the outcome.
    #[must_use]
    pub fn report(&self) -> &DispatchReport {
        match self {
            Self::Delivered { report, .. }
            | Self::Captured { report, .. }
            | Self::Refused { report, .. } => report,
        }
    }

    /// The event, unless a stream is holding it.
    #[must_use]
    pub fn event(&self) -> Option<&TriggeredEvent<E>> {
        match self {
            Self::Delivered { event, .. } | Self::Refused { event, .. } => Some(event),
            Self::Captured { .. } => None,
        }
    }

    /// Mutable access to the event, unless a stream is holding it.
    pub fn event_mut(&mut self) -> Option<&mut TriggeredEvent<E>> {
        match self {
            Self::Delivered { event, .. } | Self::Refused { event, .. } => Some(event),
            Self::Captured { .. } => None,
        }
    }

    /// Take the event back, unless a stream is holding it.
    #[must_use]
    pub fn into_event(self) -> Option<TriggeredEvent<E>> {
        match self {
            Self::Delivered { event, .. } | Self::Refused { event, .. } => Some(event),
            Self::Captured { .. } => None,
        }
    }

    /// Whether the whole chain delivered the event.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Whether a Closed stream buffered the event.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        matches!(self, Self::Captured { .. })
    }

    /// Whether a stream refused the event.
    #[must_use]
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Refused { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookline_events::NamedEvent;

    #[test]
    fn empty_report_is_clean() {
        let report = DispatchReport::new("T");
        assert!(report.is_clean());
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.event_type, "T");
    }

    #[test]
    fn failures_carry_event_type() {
        let mut report = DispatchReport::new("T");
        report.invoked = 3;
        report.record_failure(
            1,
            SubscriptionId::from_sequence(2),
            &HandlerError::failed("nope"),
        );

        assert!(!report.is_clean());
        assert_eq!(report.succeeded(), 2);
        let failure = &report.failures[0];
        assert_eq!(failure.depth, 1);
        assert_eq!(failure.event_type, "T");
        assert_eq!(failure.subscription_id.to_string(), "sub_2");
        assert_eq!(failure.error, "handler failed: nope");
    }

    #[test]
    fn captured_outcome_has_no_event() {
        let outcome: DispatchOutcome<NamedEvent> = DispatchOutcome::Captured {
            depth: 0,
            report: DispatchReport::new("T"),
        };
        assert!(outcome.is_captured());
        assert!(outcome.event().is_none());
        assert!(outcome.into_event().is_none());
    }

    #[test]
    fn delivered_outcome_returns_event() {
        let mut event = TriggeredEvent::named("T");
        event.respond(true);
        let outcome = DispatchOutcome::Delivered {
            event,
            report: DispatchReport::new("T"),
        };
        assert!(outcome.is_delivered());
        assert_eq!(outcome.report().event_type, "T");
        let mut event = outcome.into_event().unwrap();
        assert_eq!(event.response(), Some(true.into()));
    }

    #[test]
    fn refusal_reason_display() {
        let reason = RefusalReason::NestingLimit { limit: 4 };
        assert_eq!(reason.to_string(), "nesting limit of 4 reached");
    }

    #[test]
    fn report_serializes() {
        let mut report = DispatchReport::new("T");
        report.invoked = 1;
        report.record_failure(0, SubscriptionId::from_sequence(1), &HandlerError::failed("x"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["subscription_id"], "sub_1");
    }
}
