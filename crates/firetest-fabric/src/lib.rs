//! Change notification fabric for Firetest.
//!
//! Every successful mutation of the tree becomes a [`ChangeEvent`] that is
//! broadcast to the subscriptions whose prefix covers the changed path.
//!
//! # Delivery Rules
//!
//! 1. Broadcasts run detached from the mutation that caused them.
//! 2. Each subscriber gets a bounded window to accept an event; misses are
//!    dropped, never queued or retried.
//! 3. One slow subscriber never delays delivery to the others beyond that
//!    window.
//! 4. `unwatch` removes and closes a subscription atomically with respect to
//!    in-flight broadcasts.

pub mod event;
pub mod hlc;
pub mod notifier;

pub use event::{ChangeEvent, EventKind};
pub use hlc::HybridLogicalClock;
pub use notifier::{
    ChangeNotifier, DeliveryReport, NotifierConfig, PrefixMatch, Subscription, SubscriptionId,
    DEFAULT_DELIVERY_TIMEOUT,
};
