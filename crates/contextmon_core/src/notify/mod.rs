//! Change notification for provider addresses.
//!
//! # Responsibility
//! - Define the publish contract used by the provider after mutations.
//! - Provide a synchronous in-process observer registry.
//!
//! # Invariants
//! - Publishing never fails; the outcome only reports how many observers ran.
//! - Observers are invoked outside the registry lock, so an observer may
//!   register or unregister other observers.

mod observer;
mod registry;

pub use observer::{ChangeFlag, ChangeObserver};
pub use registry::ObserverRegistry;

/// Handle returned by [`ChangeNotifier::register_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub u64);

/// Result of one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Number of observers that received the change.
    pub delivered: usize,
}

/// Publish/subscribe transport for "data at this address may have changed".
///
/// Implementations may dispatch synchronously, over a channel or to an
/// external bus; the provider only relies on this contract.
pub trait ChangeNotifier: Send + Sync {
    /// Publishes a change for `address`.
    fn notify_change(&self, address: &str) -> NotifyOutcome;

    /// Registers `observer` for `address`.
    ///
    /// With `notify_for_descendants`, changes published for child addresses
    /// (e.g. one item under a collection) reach the observer too.
    fn register_observer(
        &self,
        address: &str,
        notify_for_descendants: bool,
        observer: std::sync::Arc<dyn ChangeObserver>,
    ) -> ObserverId;

    /// Removes a registration. Returns `false` when the id is unknown.
    fn unregister_observer(&self, id: ObserverId) -> bool;
}
