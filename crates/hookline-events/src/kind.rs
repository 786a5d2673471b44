//! Event kinds and their type tags.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A value that knows which event type tag it dispatches under.
///
/// The tag is the routing key: streams deliver an event to the subscribers
/// attached under exactly this string. Implementations must return the same
/// tag for the lifetime of the value.
pub trait EventKind {
    /// The event type tag.
    fn event_type(&self) -> &str;
}

/// An event kind identified only by an explicit tag.
///
/// Useful for one-off events that do not warrant a declared variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedEvent(Cow<'static, str>);

impl NamedEvent {
    /// Create a kind with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self(tag.into())
    }

    /// The tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EventKind for NamedEvent {
    fn event_type(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for NamedEvent {
    fn from(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }
}

impl From<String> for NamedEvent {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}
