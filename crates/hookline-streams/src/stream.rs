//! The trigger stream.
//!
//! A [`TriggerStream`] is either Open (delivering immediately) or Closed
//! (capturing events for later). Opening is one-way and replays the captured
//! events in order. A stream may forward everything it delivers into one
//! downstream stream; chaining into a parent opens the child.
//!
//! Delivery is synchronous on the caller's stack. All subscribers of one level
//! run, in registration order, before the event moves to the next level.
//! Handler errors and panics are recorded and logged, never propagated.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use hookline_core::SubscriptionId;
use hookline_events::{EventKind, NamedEvent, TriggeredEvent};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::errors::{HandlerError, StreamError};
use crate::registry::{SubscriberRegistry, TriggerCallback};
use crate::report::{DispatchOutcome, DispatchReport, RefusalReason};
use crate::settings::StreamSettings;
use crate::subscription::{Detach, Subscription};

struct StreamState<E> {
    registry: SubscriberRegistry<E>,
    flowing: bool,
    captured: VecDeque<TriggeredEvent<E>>,
    downstream: Option<Weak<StreamShared<E>>>,
}

struct StreamShared<E> {
    state: Mutex<StreamState<E>>,
    settings: StreamSettings,
}

impl<E: Send + 'static> Detach for StreamShared<E> {
    fn detach_id(&self, id: &SubscriptionId) -> bool {
        let removed = self.state.lock().registry.detach(id);
        if removed {
            debug!(subscription_id = %id, "detached trigger subscription");
        }
        removed
    }
}

thread_local! {
    /// Dispatch frames running on this thread, keyed by stream address.
    static ACTIVE_FRAMES: RefCell<HashMap<usize, usize>> = RefCell::new(HashMap::new());
}

/// One dispatch frame of a stream on the current thread.
///
/// Only frames on the same call stack count toward `max_nesting`, so
/// unrelated dispatches from other threads never refuse each other. Dropping
/// the frame (panics included) releases it.
struct NestingFrame {
    stream: usize,
}

impl NestingFrame {
    fn enter<E>(shared: &StreamShared<E>, limit: usize) -> Option<Self> {
        let stream = std::ptr::from_ref(shared).addr();
        ACTIVE_FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            let active = frames.entry(stream).or_insert(0);
            if *active >= limit {
                return None;
            }
            *active += 1;
            Some(Self { stream })
        })
    }

    #[cfg(test)]
    fn active<E>(shared: &StreamShared<E>) -> usize {
        let stream = std::ptr::from_ref(shared).addr();
        ACTIVE_FRAMES.with(|frames| frames.borrow().get(&stream).copied().unwrap_or(0))
    }
}

impl Drop for NestingFrame {
    fn drop(&mut self) {
        // try_with: the thread may already be tearing down its locals
        let _ = ACTIVE_FRAMES.try_with(|frames| {
            let mut frames = frames.borrow_mut();
            if let Some(active) = frames.get_mut(&self.stream) {
                *active -= 1;
                if *active == 0 {
                    let _ = frames.remove(&self.stream);
                }
            }
        });
    }
}

/// A synchronous publish-subscribe stream of triggered events.
///
/// Cloning yields another handle to the same stream.
///
/// ```
/// use hookline_events::TriggeredEvent;
/// use hookline_streams::TriggerStream;
///
/// let stream: TriggerStream = TriggerStream::new();
/// let _sub = stream.attach_fn("EventType1", |event| event.respond(true));
///
/// let mut event = stream.dispatch(TriggeredEvent::named("EventType1")).into_event().unwrap();
/// assert_eq!(event.response(), Some(true.into()));
/// ```
pub struct TriggerStream<E = NamedEvent> {
    shared: Arc<StreamShared<E>>,
}

impl<E> Clone for TriggerStream<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: EventKind + Send + 'static> Default for TriggerStream<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EventKind + Send + 'static> TriggerStream<E> {
    /// An Open stream with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(StreamSettings::default())
    }

    /// A Closed stream: everything dispatched is captured until it opens.
    #[must_use]
    pub fn bottled() -> Self {
        Self::with_settings(StreamSettings::bottled())
    }

    /// A stream starting Open or Closed per `flowing`.
    #[must_use]
    pub fn with_flow(flowing: bool) -> Self {
        Self::with_settings(StreamSettings {
            flowing,
            ..StreamSettings::default()
        })
    }

    /// A stream configured by `settings`.
    ///
    /// A `max_nesting` of 0 is treated as 1.
    #[must_use]
    pub fn with_settings(mut settings: StreamSettings) -> Self {
        settings.max_nesting = settings.max_nesting.max(1);
        Self {
            shared: Arc::new(StreamShared {
                state: Mutex::new(StreamState {
                    registry: SubscriberRegistry::new(),
                    flowing: settings.flowing,
                    captured: VecDeque::new(),
                    downstream: None,
                }),
                settings,
            }),
        }
    }

    /// Settings this stream was built with.
    #[must_use]
    pub fn settings(&self) -> &StreamSettings {
        &self.shared.settings
    }

    // ── Subscriptions ───────────────────────────────────────────────

    /// Register `callback` for events tagged `event_type`.
    ///
    /// Callbacks run in registration order. Returning an error (or panicking)
    /// marks the delivery as failed in the [`DispatchReport`] without
    /// affecting other subscribers.
    pub fn attach<F>(&self, event_type: impl AsRef<str>, callback: F) -> Subscription
    where
        F: Fn(&mut TriggeredEvent<E>, &SubscriptionId) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        let event_type = event_type.as_ref();
        let callback: TriggerCallback<E> = Arc::new(callback);
        let id = self.shared.state.lock().registry.attach(event_type, callback);
        debug!(event_type, subscription_id = %id, "attached trigger subscription");

        let weak: Weak<StreamShared<E>> = Arc::downgrade(&self.shared);
        Subscription::new(id, weak)
    }

    /// Register a callback that cannot fail and does not need its id.
    pub fn attach_fn<F>(&self, event_type: impl AsRef<str>, callback: F) -> Subscription
    where
        F: Fn(&mut TriggeredEvent<E>) + Send + Sync + 'static,
    {
        self.attach(event_type, move |event, _id| {
            callback(event);
            Ok(())
        })
    }

    /// Remove the registration `id`. Unknown or already removed ids are a
    /// no-op returning `false`.
    pub fn detach(&self, id: &SubscriptionId) -> bool {
        self.shared.detach_id(id)
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Deliver `event` to this stream's subscribers and then down the chain.
    ///
    /// A Closed stream captures the event instead. Never fails; see
    /// [`DispatchOutcome`] for what came of it.
    pub fn dispatch(&self, event: TriggeredEvent<E>) -> DispatchOutcome<E> {
        let report = DispatchReport::new(event.event_type());
        dispatch_at(&self.shared, event, 0, report)
    }

    /// Wrap `kind` in a fresh event and dispatch it.
    pub fn trigger(&self, kind: E) -> DispatchOutcome<E> {
        self.dispatch(TriggeredEvent::new(kind))
    }

    /// Open the stream and replay captured events in arrival order.
    ///
    /// Irreversible. Returns one outcome per replayed event so the responses
    /// attached during the replay can be read. Opening an Open stream with
    /// nothing captured returns an empty list.
    pub fn open(&self) -> Vec<DispatchOutcome<E>> {
        let (was_flowing, pending) = {
            let mut state = self.shared.state.lock();
            let was_flowing = state.flowing;
            state.flowing = true;
            (was_flowing, state.captured.len())
        };
        if !was_flowing {
            debug!(captured = pending, "trigger stream opened");
        }

        let mut drained = Vec::with_capacity(pending);
        // one at a time: a replayed handler may dispatch into this stream
        while let Some(event) = self.pop_captured() {
            drained.push(self.dispatch(event));
        }
        drained
    }

    /// Same as [`open`](Self::open).
    pub fn tap(&self) -> Vec<DispatchOutcome<E>> {
        self.open()
    }

    fn pop_captured(&self) -> Option<TriggeredEvent<E>> {
        self.shared.state.lock().captured.pop_front()
    }

    // ── Chaining ────────────────────────────────────────────────────

    /// Forward everything this stream delivers into `parent`, then open this
    /// stream, replaying what it captured through `parent` as well.
    ///
    /// The link does not keep `parent` alive. It can be set once; a stream
    /// whose previous parent was dropped may be chained again.
    pub fn chain_into(&self, parent: &Self) -> Result<Vec<DispatchOutcome<E>>, StreamError> {
        if self.ptr_eq(parent) {
            return Err(StreamError::SelfChain);
        }
        {
            let mut state = self.shared.state.lock();
            if state
                .downstream
                .as_ref()
                .is_some_and(|existing| existing.strong_count() > 0)
            {
                return Err(StreamError::AlreadyChained);
            }
            state.downstream = Some(Arc::downgrade(&parent.shared));
        }
        debug!("trigger stream chained into downstream");
        Ok(self.open())
    }

    /// Take over `child`'s events: `child` forwards into `self` from now on.
    ///
    /// Same as `child.chain_into(self)`.
    pub fn siphon(&self, child: &Self) -> Result<Vec<DispatchOutcome<E>>, StreamError> {
        child.chain_into(self)
    }

    // ── Introspection ───────────────────────────────────────────────

    /// Whether the stream is Open.
    #[must_use]
    pub fn is_flowing(&self) -> bool {
        self.shared.state.lock().flowing
    }

    /// Events waiting for the stream to open.
    #[must_use]
    pub fn captured_len(&self) -> usize {
        self.shared.state.lock().captured.len()
    }

    /// Whether a live downstream stream is linked.
    #[must_use]
    pub fn has_downstream(&self) -> bool {
        self.live_downstream().is_some()
    }

    /// Whether this stream forwards directly into `other`.
    #[must_use]
    pub fn flows_into(&self, other: &Self) -> bool {
        self.live_downstream()
            .is_some_and(|downstream| Arc::ptr_eq(&downstream, &other.shared))
    }

    fn live_downstream(&self) -> Option<Arc<StreamShared<E>>> {
        self.shared
            .state
            .lock()
            .downstream
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Subscriptions ever minted by this stream.
    #[must_use]
    pub fn subscription_count(&self) -> u64 {
        self.shared.state.lock().registry.subscription_count()
    }

    /// Live subscribers for `event_type`.
    #[must_use]
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.shared.state.lock().registry.subscriber_count(event_type)
    }

    /// Live subscribers across all event types.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.shared.state.lock().registry.total_subscribers()
    }

    /// Event types with a bucket, including emptied ones and types that were
    /// dispatched with nobody listening. Sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.shared.state.lock().registry.event_types()
    }

    /// Whether `self` and `other` are handles to the same stream.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

fn dispatch_at<E: EventKind + Send + 'static>(
    shared: &StreamShared<E>,
    mut event: TriggeredEvent<E>,
    depth: usize,
    mut report: DispatchReport,
) -> DispatchOutcome<E> {
    {
        let mut state = shared.state.lock();
        if !state.flowing {
            state.captured.push_back(event);
            trace!(
                event_type = %report.event_type,
                depth,
                captured = state.captured.len(),
                "stream closed, event captured"
            );
            return DispatchOutcome::Captured { depth, report };
        }
    }

    let limit = shared.settings.max_nesting;
    // held across the downstream call so a chain cycle runs into the limit
    let Some(_frame) = NestingFrame::enter(shared, limit) else {
        warn!(
            event_type = %report.event_type,
            depth,
            limit,
            "trigger dispatch nesting limit reached, refusing event"
        );
        return DispatchOutcome::Refused {
            event,
            depth,
            reason: RefusalReason::NestingLimit { limit },
            report,
        };
    };

    // Open never reverts to Closed
    let (callbacks, downstream) = {
        let mut state = shared.state.lock();
        let callbacks = state.registry.snapshot(&report.event_type);
        (callbacks, state.downstream.clone())
    };

    report.levels += 1;
    for (id, callback) in callbacks {
        report.invoked += 1;
        let result = panic::catch_unwind(AssertUnwindSafe(|| callback(&mut event, &id)))
            .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

        if let Err(error) = result {
            if shared.settings.warn_on_handler_failure {
                warn!(
                    event_type = %report.event_type,
                    subscription_id = %id,
                    depth,
                    error = %error,
                    "trigger callback failed; ignoring"
                );
            }
            report.record_failure(depth, id, &error);
        }
    }
    trace!(event_type = %report.event_type, depth, invoked = report.invoked, "event delivered");

    match downstream {
        None => DispatchOutcome::Delivered { event, report },
        Some(weak) => match weak.upgrade() {
            Some(parent) => dispatch_at(&parent, event, depth + 1, report),
            None => {
                debug!(depth, "downstream stream was dropped, stopping here");
                DispatchOutcome::Delivered { event, report }
            }
        },
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}

impl<E> std::fmt::Debug for TriggerStream<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TriggerStream")
            .field("flowing", &state.flowing)
            .field("captured", &state.captured.len())
            .field("registry", &state.registry)
            .field(
                "has_downstream",
                &state.downstream.as_ref().is_some_and(|w| w.strong_count() > 0),
            )
            .finish()
    }
}
