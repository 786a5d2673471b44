//! # hookline-events
//!
//! The event side of a trigger stream.
//!
//! - [`EventKind`]: anything that can name its own event type tag
//! - [`define_trigger_events!`]: declares an enum whose variants each carry a
//!   constant wire tag, so tags are checked at compile time
//! - [`NamedEvent`]: an ad hoc kind with an explicit tag, for one-off events
//! - [`TriggeredEvent`]: the envelope that travels through dispatch and
//!   collects subscriber responses for the producer
//!
//! ```
//! use hookline_events::TriggeredEvent;
//!
//! let mut event = TriggeredEvent::named("EventType1");
//! event.respond(true);
//! event.respond("Kevin");
//! assert!(event.any_response_equals(true));
//! assert_eq!(event.response(), Some(true.into()));
//! ```

#![deny(unsafe_code)]

pub mod event;
pub mod kind;
mod macros;

pub use event::TriggeredEvent;
pub use kind::{EventKind, NamedEvent};

/// Response values attached to events.
pub use serde_json::Value;
