//! The registry side of name resolution.
//!
//! A registry is a push-based discovery backend: a resolver registers
//! interest in a service once and the registry delivers the full endpoint
//! set whenever it changes, on a delivery thread of the registry's choosing.
//! The backend protocol (Consul, etcd, ...) lives outside this crate; what
//! is fixed here is the subscription contract resolvers consume.

use std::sync::Arc;

use http::uri::Authority;

use crate::{locator::ServiceLocator, record::EndpointRecord};

mod memory;
pub use memory::MemoryRegistry;

/// Receives endpoint-set changes for one subscription.
///
/// Invoked by the registry on its own delivery thread, once per change, with
/// the complete current set (not a delta). An empty slice means the service
/// currently has zero live instances.
pub trait EndpointListener: Send + Sync {
    /// Delivers the current endpoint set for the subscribed service.
    fn endpoints_changed(&self, endpoints: &[EndpointRecord]);
}

/// Subscription contract a discovery backend exposes to resolvers.
///
/// Both operations register or cancel interest and return immediately; the
/// discovery work itself happens out of band.
pub trait RegistryClient: Send + Sync {
    /// Registers `listener` for changes to the service named by `locator`.
    ///
    /// Subscribing the same listener value again must not error; backends
    /// either deduplicate or tolerate the duplicate.
    fn subscribe(&self, locator: &ServiceLocator, listener: Arc<dyn EndpointListener>);

    /// Cancels a subscription.
    ///
    /// Unsubscribing a listener that was never subscribed is a no-op.
    fn unsubscribe(&self, locator: &ServiceLocator, listener: &Arc<dyn EndpointListener>);
}

/// Resolves the registry a locator's authority points at.
///
/// Consumed once at resolver construction, so resolvers never hard-code a
/// backend.
pub trait RegistryFactory: Send + Sync {
    /// Returns the registry client serving `authority`.
    fn registry(&self, authority: &Authority) -> Arc<dyn RegistryClient>;
}

/// Whether two subscription handles are the same callback value.
///
/// Compares the data addresses only; vtable pointers are not stable enough
/// to take part in identity.
pub(crate) fn same_listener(a: &Arc<dyn EndpointListener>, b: &Arc<dyn EndpointListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
