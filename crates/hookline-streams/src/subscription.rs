//! Subscription handles.

use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use hookline_core::SubscriptionId;

/// Something registrations can be removed from by id.
pub(crate) trait Detach: Send + Sync {
    fn detach_id(&self, id: &SubscriptionId) -> bool;
}

/// Handle to one registration on one stream.
///
/// Dropping the handle does not cancel the registration; call
/// [`cancel`](Self::cancel). The handle does not keep its stream alive.
pub struct Subscription {
    id: SubscriptionId,
    stream: Weak<dyn Detach>,
    cancelled: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, stream: Weak<dyn Detach>) -> Self {
        Self {
            id,
            stream,
            cancelled: AtomicBool::new(false),
        }
    }

    /// The id the stream minted for this registration.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the registration.
    ///
    /// Idempotent. Returns `true` only for the call that actually removed it;
    /// `false` if it was already gone (cancelled before, detached by id, or
    /// the stream was dropped).
    pub fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.stream
            .upgrade()
            .is_some_and(|stream| stream.detach_id(&self.id))
    }

    /// Whether [`cancel`](Self::cancel) has been called on this handle.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
