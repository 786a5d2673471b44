//! Subscription identifiers.
//!
//! A [`SubscriptionId`] is minted by the stream that accepted the
//! subscription, from that stream's own counter. Ids are unique within one
//! stream and are never reused; two streams will happily hand out `sub_1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const PREFIX: &str = "sub_";

/// Identifier of one registration on one stream, rendered as `sub_<n>`.
///
/// Ordering follows the minting sequence, which is also registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Build the id for the `seq`-th subscription of a stream.
    #[must_use]
    pub const fn from_sequence(seq: u64) -> Self {
        Self(seq)
    }

    /// The sequence number this id was minted from.
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

impl FromStr for SubscriptionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(PREFIX)
            .and_then(|n| n.parse().ok())
            .map(Self)
            .ok_or_else(|| format!("invalid subscription id: {s}"))
    }
}

impl From<SubscriptionId> for String {
    fn from(id: SubscriptionId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SubscriptionId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
