//! In-process observer registry with synchronous dispatch.

use super::{ChangeNotifier, ChangeObserver, NotifyOutcome, ObserverId};
use crate::provider::address::CONTENT_SCHEME;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

struct Registration {
    address: String,
    notify_for_descendants: bool,
    observer: Arc<dyn ChangeObserver>,
}

impl Registration {
    /// Delivery rule: exact match, any descendant of the published address,
    /// or an ancestor that asked for descendant changes.
    fn matches(&self, published: &str) -> bool {
        if self.address == published {
            return true;
        }
        if is_descendant(&self.address, published) {
            return true;
        }
        self.notify_for_descendants && is_descendant(published, &self.address)
    }
}

/// Synchronous observer registry keyed by address.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    registrations: Mutex<BTreeMap<ObserverId, Registration>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ObserverId, Registration>> {
        // Observers run outside the lock; a poisoned map is still consistent.
        self.registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChangeNotifier for ObserverRegistry {
    fn notify_change(&self, address: &str) -> NotifyOutcome {
        let published = normalize_address(address);
        let targets: Vec<Arc<dyn ChangeObserver>> = self
            .lock()
            .values()
            .filter(|registration| registration.matches(published))
            .map(|registration| Arc::clone(&registration.observer))
            .collect();

        for observer in &targets {
            observer.on_change(address);
        }

        debug!(
            "event=notify_change module=notify status=ok delivered={}",
            targets.len()
        );
        NotifyOutcome {
            delivered: targets.len(),
        }
    }

    fn register_observer(
        &self,
        address: &str,
        notify_for_descendants: bool,
        observer: Arc<dyn ChangeObserver>,
    ) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(
            id,
            Registration {
                address: normalize_address(address).to_string(),
                notify_for_descendants,
                observer,
            },
        );
        id
    }

    fn unregister_observer(&self, id: ObserverId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if !removed {
            warn!(
                "event=unregister_observer module=notify status=error error_code=unknown_observer id={}",
                id.0
            );
        }
        removed
    }
}

/// Matching key for an address: scheme and trailing slash removed, so
/// `content://a/b` and `a/b/` name the same resource.
fn normalize_address(address: &str) -> &str {
    let address = address.strip_prefix(CONTENT_SCHEME).unwrap_or(address);
    trim_trailing_slash(address)
}

fn trim_trailing_slash(address: &str) -> &str {
    address.strip_suffix('/').unwrap_or(address)
}

/// Whether `candidate` lies strictly below `ancestor` in the path hierarchy.
fn is_descendant(candidate: &str, ancestor: &str) -> bool {
    let ancestor = trim_trailing_slash(ancestor);
    candidate
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
}

#[cfg(test)]
mod tests {
    use super::{is_descendant, normalize_address, ObserverRegistry};
    use crate::notify::{ChangeFlag, ChangeNotifier, ChangeObserver};
    use std::sync::{Arc, Mutex};

    const COLLECTION: &str = "content://edu.unt.sell.contextmon/broadcasts";
    const ITEM: &str = "content://edu.unt.sell.contextmon/broadcasts/7";

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl ChangeObserver for Recorder {
        fn on_change(&self, address: &str) {
            self.seen
                .lock()
                .expect("recorder lock")
                .push(address.to_string());
        }
    }

    #[test]
    fn descendant_check_respects_segment_boundaries() {
        assert!(is_descendant(ITEM, COLLECTION));
        assert!(!is_descendant(COLLECTION, ITEM));
        assert!(!is_descendant(
            "content://edu.unt.sell.contextmon/broadcasts_old",
            COLLECTION
        ));
        assert!(!is_descendant(COLLECTION, COLLECTION));
    }

    #[test]
    fn scheme_and_trailing_slash_do_not_affect_matching() {
        assert_eq!(normalize_address(COLLECTION), "edu.unt.sell.contextmon/broadcasts");
        assert_eq!(
            normalize_address("edu.unt.sell.contextmon/broadcasts/"),
            "edu.unt.sell.contextmon/broadcasts"
        );

        let registry = ObserverRegistry::new();
        let bare = Arc::new(ChangeFlag::new());
        let slashed = Arc::new(ChangeFlag::new());
        registry.register_observer("edu.unt.sell.contextmon/broadcasts", true, bare.clone());
        registry.register_observer(&format!("{COLLECTION}/"), false, slashed.clone());

        assert_eq!(registry.notify_change(COLLECTION).delivered, 2);
        assert_eq!(
            registry
                .notify_change("edu.unt.sell.contextmon/broadcasts/7")
                .delivered,
            1
        );
        assert_eq!(bare.deliveries(), 2);
        assert_eq!(slashed.deliveries(), 1);
    }

    #[test]
    fn exact_registration_receives_change() {
        let registry = ObserverRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.register_observer(COLLECTION, false, recorder.clone());

        let outcome = registry.notify_change(COLLECTION);

        assert_eq!(outcome.delivered, 1);
        assert_eq!(
            recorder.seen.lock().expect("recorder lock").as_slice(),
            [COLLECTION.to_string()]
        );
    }

    #[test]
    fn ancestor_receives_item_change_only_when_watching_descendants() {
        let registry = ObserverRegistry::new();
        let shallow = Arc::new(ChangeFlag::new());
        let deep = Arc::new(ChangeFlag::new());
        registry.register_observer(COLLECTION, false, shallow.clone());
        registry.register_observer(COLLECTION, true, deep.clone());

        let outcome = registry.notify_change(ITEM);

        assert_eq!(outcome.delivered, 1);
        assert!(!shallow.is_set());
        assert!(deep.is_set());
    }

    #[test]
    fn item_observer_receives_collection_change() {
        let registry = ObserverRegistry::new();
        let flag = Arc::new(ChangeFlag::new());
        registry.register_observer(ITEM, false, flag.clone());

        registry.notify_change(COLLECTION);

        assert!(flag.is_set());
    }

    #[test]
    fn unrelated_item_is_not_notified() {
        let registry = ObserverRegistry::new();
        let flag = Arc::new(ChangeFlag::new());
        registry.register_observer(ITEM, true, flag.clone());

        let outcome = registry.notify_change("content://edu.unt.sell.contextmon/broadcasts/8");

        assert_eq!(outcome.delivered, 0);
        assert!(!flag.is_set());
    }

    #[test]
    fn unregister_stops_delivery_and_rejects_unknown_ids() {
        let registry = ObserverRegistry::new();
        let flag = Arc::new(ChangeFlag::new());
        let id = registry.register_observer(COLLECTION, true, flag.clone());
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister_observer(id));
        assert!(!registry.unregister_observer(id));
        assert!(registry.is_empty());

        assert_eq!(registry.notify_change(COLLECTION).delivered, 0);
        assert!(!flag.is_set());
    }

    #[test]
    fn change_flag_counts_and_resets() {
        let flag = ChangeFlag::new();
        flag.on_change(COLLECTION);
        flag.on_change(ITEM);

        assert_eq!(flag.deliveries(), 2);
        assert!(flag.reset());
        assert!(!flag.is_set());
        assert!(!flag.reset());
    }
}
