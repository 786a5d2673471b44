//! # hookline-core
//!
//! Shared vocabulary for the hookline crates:
//!
//! - **Subscription ids**: [`SubscriptionId`], minted per stream as `sub_<n>`
//! - **Logging**: [`logging::init_subscriber`] and the [`logging::capture_logs`]
//!   test layer used to assert on dispatch warnings

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;

pub use ids::SubscriptionId;
