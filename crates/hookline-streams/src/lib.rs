//! # hookline-streams
//!
//! Synchronous, in-process trigger streams.
//!
//! Components attach callbacks to event type tags on a [`TriggerStream`].
//! Dispatching a [`TriggeredEvent`](hookline_events::TriggeredEvent) runs
//! every callback for its tag, in registration order, and then hands the same
//! event to the stream's downstream stream, if one is chained. Callbacks talk
//! back to the producer by attaching responses to the event.
//!
//! ## Flow
//!
//! - **Open** streams deliver immediately.
//! - **Closed** ("bottled") streams capture events until [`TriggerStream::open`]
//!   or [`TriggerStream::chain_into`] replays them in arrival order.
//!
//! ## Fail-Open
//!
//! Handler errors and panics never reach the producer. They are logged at
//! WARN and listed in the outcome's [`DispatchReport`].
//!
//! ```
//! use hookline_events::TriggeredEvent;
//! use hookline_streams::TriggerStream;
//!
//! let child: TriggerStream = TriggerStream::bottled();
//! let parent: TriggerStream = TriggerStream::new();
//! let _a = child.attach_fn("EventType1", |event| event.respond("child"));
//! let _b = parent.attach_fn("EventType1", |event| event.respond("parent"));
//!
//! assert!(child.dispatch(TriggeredEvent::named("EventType1")).is_captured());
//!
//! let replayed = child.chain_into(&parent).unwrap();
//! let event = replayed.into_iter().next().unwrap().into_event().unwrap();
//! assert!(event.any_response_equals("child"));
//! assert!(event.any_response_equals("parent"));
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod registry;
pub mod report;
pub mod settings;
pub mod stream;
pub mod subscription;

pub use errors::{HandlerError, SettingsError, StreamError};
pub use registry::{SubscriberRegistry, TriggerCallback};
pub use report::{DispatchOutcome, DispatchReport, HandlerFailure, RefusalReason};
pub use settings::{StreamSettings, load_settings_from_path};
pub use stream::TriggerStream;
pub use subscription::Subscription;

pub use hookline_core::SubscriptionId;
