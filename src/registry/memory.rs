//! In-memory registry backend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use http::uri::Authority;

use super::{same_listener, EndpointListener, RegistryClient, RegistryFactory};
use crate::{
    locator::{ReferenceDescriptor, ServiceLocator},
    record::EndpointRecord,
};

/// A process-local registry that holds endpoint sets fed to it directly.
///
/// Useful for tests and single-process wiring; production deployments plug in
/// a real discovery backend behind [`RegistryClient`] instead. Deliveries
/// happen synchronously on the thread that calls [`update`] (for pushes) or
/// [`subscribe`] (for the initial snapshot).
///
/// A subscriber receives the current snapshot immediately if the service is
/// already known, i.e. [`update`] has been called for it at least once.
/// Re-subscribing an already-subscribed listener does not duplicate the
/// subscription but re-delivers the current snapshot, which is exactly the
/// re-check a resolver `refresh()` asks for.
///
/// [`update`]: MemoryRegistry::update
/// [`subscribe`]: RegistryClient::subscribe
#[derive(Default)]
pub struct MemoryRegistry {
    topics: Mutex<HashMap<ReferenceDescriptor, Topic>>,
}

#[derive(Default)]
struct Topic {
    // None until the first update; an empty Some is "known, zero instances".
    endpoints: Option<Vec<EndpointRecord>>,
    subscribers: Vec<Arc<dyn EndpointListener>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the endpoint set for `reference` and pushes it to every
    /// subscriber.
    pub fn update(&self, reference: &ReferenceDescriptor, endpoints: Vec<EndpointRecord>) {
        let subscribers = {
            let mut topics = self.lock();
            let topic = topics.entry(reference.clone()).or_default();
            topic.endpoints = Some(endpoints.clone());
            topic.subscribers.clone()
        };
        #[cfg(feature = "log")]
        tracing::debug!(
            service = %reference,
            endpoints = endpoints.len(),
            subscribers = subscribers.len(),
            "pushing endpoint update"
        );
        for subscriber in &subscribers {
            subscriber.endpoints_changed(&endpoints);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ReferenceDescriptor, Topic>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RegistryClient for MemoryRegistry {
    fn subscribe(&self, locator: &ServiceLocator, listener: Arc<dyn EndpointListener>) {
        let snapshot = {
            let mut topics = self.lock();
            let topic = topics.entry(locator.reference().clone()).or_default();
            if !topic
                .subscribers
                .iter()
                .any(|existing| same_listener(existing, &listener))
            {
                topic.subscribers.push(listener.clone());
            }
            topic.endpoints.clone()
        };
        // Snapshot delivery stays outside the lock so a listener may
        // re-enter the registry.
        if let Some(endpoints) = snapshot {
            listener.endpoints_changed(&endpoints);
        }
    }

    fn unsubscribe(&self, locator: &ServiceLocator, listener: &Arc<dyn EndpointListener>) {
        let mut topics = self.lock();
        if let Some(topic) = topics.get_mut(locator.reference()) {
            topic.subscribers.retain(|existing| !same_listener(existing, listener));
        }
    }
}

impl RegistryFactory for Arc<MemoryRegistry> {
    fn registry(&self, _authority: &Authority) -> Arc<dyn RegistryClient> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::ResolverOptions;

    #[derive(Default)]
    struct Counting {
        pushes: Mutex<Vec<Vec<EndpointRecord>>>,
    }

    impl EndpointListener for Counting {
        fn endpoints_changed(&self, endpoints: &[EndpointRecord]) {
            self.pushes
                .lock()
                .unwrap()
                .push(endpoints.to_vec());
        }
    }

    fn locator() -> ServiceLocator {
        ServiceLocator::new("10.1.1.1:8500", &ResolverOptions::new("greeter")).unwrap()
    }

    #[test]
    fn unknown_service_stays_silent_on_subscribe() {
        let registry = MemoryRegistry::new();
        let listener = Arc::new(Counting::default());
        registry.subscribe(&locator(), listener.clone());
        assert!(listener.pushes.lock().unwrap().is_empty());
    }

    #[test]
    fn known_service_snapshot_on_subscribe() {
        let registry = MemoryRegistry::new();
        let locator = locator();
        registry.update(
            locator.reference(),
            vec![EndpointRecord::new("10.0.0.1", 50051, "grpc")],
        );
        let listener = Arc::new(Counting::default());
        registry.subscribe(&locator, listener.clone());
        let pushes = listener.pushes.lock().unwrap();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].len(), 1);
    }

    #[test]
    fn update_fans_out_to_subscribers() {
        let registry = MemoryRegistry::new();
        let locator = locator();
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        registry.subscribe(&locator, a.clone());
        registry.subscribe(&locator, b.clone());
        registry.update(
            locator.reference(),
            vec![EndpointRecord::new("10.0.0.1", 50051, "grpc")],
        );
        assert_eq!(a.pushes.lock().unwrap().len(), 1);
        assert_eq!(b.pushes.lock().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_subscribe_delivers_once_per_push() {
        let registry = MemoryRegistry::new();
        let locator = locator();
        let listener = Arc::new(Counting::default());
        registry.subscribe(&locator, listener.clone());
        registry.subscribe(&locator, listener.clone());
        registry.update(
            locator.reference(),
            vec![EndpointRecord::new("10.0.0.1", 50051, "grpc")],
        );
        // One snapshot redelivery from the second subscribe would be fine,
        // but the push itself must arrive exactly once.
        assert_eq!(listener.pushes.lock().unwrap().len(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let registry = MemoryRegistry::new();
        let locator = locator();
        let listener = Arc::new(Counting::default());
        registry.subscribe(&locator, listener.clone());
        let handle: Arc<dyn EndpointListener> = listener.clone();
        registry.unsubscribe(&locator, &handle);
        registry.update(
            locator.reference(),
            vec![EndpointRecord::new("10.0.0.1", 50051, "grpc")],
        );
        assert!(listener.pushes.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_of_unknown_listener_is_noop() {
        let registry = MemoryRegistry::new();
        let listener: Arc<dyn EndpointListener> = Arc::new(Counting::default());
        registry.unsubscribe(&locator(), &listener);
    }
}
