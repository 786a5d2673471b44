//! The triggered event envelope.
//!
//! A [`TriggeredEvent`] is created by a producer, moved through a stream's
//! dispatch, and handed back with whatever responses the subscribers
//! attached. Responses are [`Value`]s kept in the order they were given.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::{EventKind, NamedEvent};

/// An event in flight, plus the responses subscribers attached to it.
///
/// The event type tag is read from the kind once, at construction, and routes
/// the event from then on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggeredEvent<E = NamedEvent> {
    #[serde(rename = "eventType")]
    event_type: String,
    kind: E,
    responses: VecDeque<Arc<Value>>,
}

impl TriggeredEvent<NamedEvent> {
    /// Create an event identified only by `tag`.
    #[must_use]
    pub fn named(tag: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        Self::new(NamedEvent::new(tag))
    }
}

impl<E: EventKind> TriggeredEvent<E> {
    /// Wrap `kind` with an empty response list.
    #[must_use]
    pub fn new(kind: E) -> Self {
        Self {
            event_type: kind.event_type().to_owned(),
            kind,
            responses: VecDeque::new(),
        }
    }

    /// The event type tag this event dispatches under.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Borrow the event kind and its payload.
    #[must_use]
    pub fn kind(&self) -> &E {
        &self.kind
    }

    /// Mutably borrow the payload.
    ///
    /// Replacing the kind does not retag the event: [`event_type`](Self::event_type)
    /// keeps the tag taken at construction.
    pub fn kind_mut(&mut self) -> &mut E {
        &mut self.kind
    }

    /// Consume the envelope, returning the kind and dropping unread responses.
    #[must_use]
    pub fn into_kind(self) -> E {
        self.kind
    }

    /// Attach a response for the producer.
    pub fn respond(&mut self, value: impl Into<Value>) {
        self.responses.push_back(Arc::new(value.into()));
    }

    /// Attach a response the caller keeps a handle to, so it can later be
    /// found by identity with [`any_response_is`](Self::any_response_is).
    pub fn respond_shared(&mut self, value: Arc<Value>) {
        self.responses.push_back(value);
    }

    /// Take the oldest unread response, or `None` once all are consumed.
    pub fn response(&mut self) -> Option<Value> {
        self.responses.pop_front().map(Arc::unwrap_or_clone)
    }

    /// Unread responses, oldest first.
    pub fn responses(&self) -> impl ExactSizeIterator<Item = &Value> + DoubleEndedIterator {
        self.responses.iter().map(Arc::as_ref)
    }

    /// Number of unread responses.
    #[must_use]
    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    /// Take every unread response at once, oldest first.
    pub fn drain_responses(&mut self) -> Vec<Value> {
        self.responses.drain(..).map(Arc::unwrap_or_clone).collect()
    }

    /// Whether some response equals `target`. Does not consume anything.
    ///
    /// Scalars compare by value, so `"Kevin"` and `"kevin"` differ and `1` and
    /// `1.0` differ. Objects and arrays compare by identity: a freshly built
    /// one never matches. Use [`any_response_is`](Self::any_response_is) with
    /// the handle given to [`respond_shared`](Self::respond_shared) for those.
    pub fn any_response_equals(&self, target: impl Into<Value>) -> bool {
        let target = target.into();
        if matches!(target, Value::Object(_) | Value::Array(_)) {
            return false;
        }
        self.responses.iter().any(|r| **r == target)
    }

    /// Whether `target` itself (not an equal copy) is among the responses.
    #[must_use]
    pub fn any_response_is(&self, target: &Arc<Value>) -> bool {
        self.responses.iter().any(|r| Arc::ptr_eq(r, target))
    }

    /// Whether `predicate` holds for some response. Does not consume anything.
    pub fn any_response_with(&self, predicate: impl Fn(&Value) -> bool) -> bool {
        self.responses.iter().any(|r| predicate(r.as_ref()))
    }

    /// Whether `predicate` holds for every response (vacuously true when empty).
    pub fn all_responses_with(&self, predicate: impl Fn(&Value) -> bool) -> bool {
        self.responses.iter().all(|r| predicate(r.as_ref()))
    }
}
