#![allow(dead_code)]

use contextmon_core::{
    ChangeNotifier, ChangeObserver, NotifyOutcome, ObserverId, ObserverRegistry,
    DEFAULT_AUTHORITY,
};
use std::sync::{Arc, Mutex};

pub const COLLECTION: &str = "content://edu.unt.sell.contextmon/broadcasts";

pub fn item(id: i64) -> String {
    format!("{COLLECTION}/{id}")
}

pub fn authority() -> &'static str {
    DEFAULT_AUTHORITY
}

/// Notifier that records every publish and delegates observers to a registry.
#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<String>>,
    registry: ObserverRegistry,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }

    pub fn observer_count(&self) -> usize {
        self.registry.len()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn notify_change(&self, address: &str) -> NotifyOutcome {
        self.published.lock().unwrap().push(address.to_string());
        self.registry.notify_change(address)
    }

    fn register_observer(
        &self,
        address: &str,
        notify_for_descendants: bool,
        observer: Arc<dyn ChangeObserver>,
    ) -> ObserverId {
        self.registry
            .register_observer(address, notify_for_descendants, observer)
    }

    fn unregister_observer(&self, id: ObserverId) -> bool {
        self.registry.unregister_observer(id)
    }
}
