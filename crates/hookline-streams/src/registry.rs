//! Subscriber registry.
//!
//! Buckets of callbacks keyed by event type tag. Within a bucket callbacks
//! are ordered by [`SubscriptionId`], and ids are minted from a monotonically
//! increasing counter, so bucket order is registration order. A side index
//! from id to tag makes detaching a direct lookup instead of a scan.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use hookline_core::SubscriptionId;
use hookline_events::TriggeredEvent;

use crate::errors::HandlerError;

/// A subscriber callback.
///
/// Receives the event being dispatched and the id it was registered under.
pub type TriggerCallback<E> =
    Arc<dyn Fn(&mut TriggeredEvent<E>, &SubscriptionId) -> Result<(), HandlerError> + Send + Sync>;

/// Callbacks for one event type, in registration order.
type Bucket<E> = BTreeMap<SubscriptionId, TriggerCallback<E>>;

/// Registry of subscriber callbacks for one stream.
pub struct SubscriberRegistry<E> {
    buckets: HashMap<String, Bucket<E>>,
    index: HashMap<SubscriptionId, String>,
    subscription_count: u64,
}

impl<E> Default for SubscriberRegistry<E> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            index: HashMap::new(),
            subscription_count: 0,
        }
    }
}

impl<E> SubscriberRegistry<E> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `event_type` and return its fresh id.
    ///
    /// The bucket is created on first use.
    pub fn attach(&mut self, event_type: &str, callback: TriggerCallback<E>) -> SubscriptionId {
        self.subscription_count += 1;
        let id = SubscriptionId::from_sequence(self.subscription_count);
        let _ = self.bucket_mut(event_type).insert(id, callback);
        let _ = self.index.insert(id, event_type.to_owned());
        id
    }

    /// Remove the registration for `id`.
    ///
    /// Returns `false` when the id is unknown or already detached. An emptied
    /// bucket stays in place.
    pub fn detach(&mut self, id: &SubscriptionId) -> bool {
        let Some(event_type) = self.index.remove(id) else {
            return false;
        };
        self.buckets
            .get_mut(&event_type)
            .and_then(|bucket| bucket.remove(id))
            .is_some()
    }

    /// Bucket for `event_type`, created empty if nobody listened yet.
    fn bucket_mut(&mut self, event_type: &str) -> &mut Bucket<E> {
        self.buckets.entry(event_type.to_owned()).or_default()
    }

    /// Clone out the callbacks for `event_type`, in invocation order.
    ///
    /// Callers run the snapshot without holding the registry, so callbacks may
    /// attach or detach while a dispatch is in progress; those changes apply
    /// from the next dispatch on.
    pub fn snapshot(&mut self, event_type: &str) -> Vec<(SubscriptionId, TriggerCallback<E>)> {
        self.bucket_mut(event_type)
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect()
    }

    /// Number of subscriptions ever minted (the counter, not the live count).
    #[must_use]
    pub fn subscription_count(&self) -> u64 {
        self.subscription_count
    }

    /// Live subscribers for `event_type`.
    #[must_use]
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.buckets.get(event_type).map_or(0, BTreeMap::len)
    }

    /// Live subscribers across all types.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.index.len()
    }

    /// Whether `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: &SubscriptionId) -> bool {
        self.index.contains_key(id)
    }

    /// Event type tags that have a bucket, including emptied ones, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.buckets.keys().cloned().collect();
        types.sort();
        types
    }

    /// Whether no bucket exists at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl<E> std::fmt::Debug for SubscriberRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("event_types", &self.event_types())
            .field("subscribers", &self.total_subscribers())
            .field("subscription_count", &self.subscription_count)
            .finish()
    }
}
