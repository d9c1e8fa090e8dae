//! The dynamic resolver core.
//!
//! [`DynamicResolver`] bridges one RPC channel's name-resolution needs to
//! one registry subscription: the channel drives the one-shot lifecycle
//! through the [`NameResolver`] interface, the registry pushes endpoint sets
//! asynchronously, and each push is translated into exactly one
//! [`ResolutionListener`] call.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use arc_swap::ArcSwapOption;

use crate::{
    channel::{AddressGroup, Attributes, NameResolver, ResolutionListener, Status},
    locator::{ResolverOptions, ServiceLocator},
    record::EndpointRecord,
    registry::{EndpointListener, RegistryClient, RegistryFactory},
};

/// Errors surfaced synchronously by resolver construction and lifecycle
/// operations.
///
/// Resolution-time absence of instances is never one of these; it is
/// delivered to the listener as a [`Status`] instead, because the resolver's
/// job is to keep running and keep reporting.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The target name has no parseable `host[:port]` authority.
    #[error("target '{0}' does not contain a valid host[:port] authority")]
    InvalidTarget(String),
    /// The target name has no port and no default port was configured.
    #[error("target '{0}' does not contain a port, and no default port is configured")]
    MissingPort(String),
    /// `start` was called on a resolver that is past the created state.
    #[error("resolver already started")]
    AlreadyStarted,
    /// `refresh` was called before `start`.
    #[error("resolver not started")]
    NotStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Started,
    ShutDown,
}

// State shared with the registry-facing callback. The callback holds only
// this, never the resolver itself.
struct Shared {
    locator: ServiceLocator,
    // Written once by start(), read lock-free on the delivery thread.
    listener: ArcSwapOption<Box<dyn ResolutionListener>>,
    // Monotonic; Relaxed is enough, the requirement is "eventually stop
    // delivering", not an exact last-event cut.
    shutdown: AtomicBool,
}

/// Registry-facing subscription callback.
///
/// One value per resolver, created at construction so that `subscribe` and
/// `unsubscribe` always present the same callback identity to the registry.
struct EndpointWatch {
    shared: Arc<Shared>,
}

impl EndpointListener for EndpointWatch {
    fn endpoints_changed(&self, endpoints: &[EndpointRecord]) {
        // Unsubscribe is best-effort, so a push can still arrive after
        // shutdown() has returned. Policy: drop it here; the channel never
        // sees a stray event for a resolver it considers detached.
        if self.shared.shutdown.load(Ordering::Relaxed) {
            #[cfg(feature = "log")]
            {
                let service = self.shared.locator.reference();
                tracing::debug!(%service, "dropping endpoint push after shutdown");
            }
            return;
        }
        let Some(listener) = self.shared.listener.load_full() else {
            return;
        };

        let addresses: Vec<SocketAddr> = endpoints
            .iter()
            .filter_map(|record| match record.socket_addr() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    #[cfg(feature = "log")]
                    {
                        let host = record.host();
                        tracing::trace!(%e, host, "skipping endpoint with non-literal host");
                    }
                    #[cfg(not(feature = "log"))]
                    let _ = e;
                    None
                }
            })
            .collect();

        if addresses.is_empty() {
            listener.on_error(Status::not_found(format!(
                "no instances registered for {}",
                self.shared.locator.reference()
            )));
        } else {
            #[cfg(feature = "log")]
            {
                let service = self.shared.locator.reference();
                tracing::debug!(%service, addresses = addresses.len(), "forwarding endpoint update");
            }
            listener.on_update(vec![AddressGroup::new(addresses)], Attributes::empty());
        }
    }
}

/// Resolves a logical service name into a live set of endpoints by
/// subscribing to a registry, under the channel's one-shot lifecycle.
///
/// Lifecycle: `Created --start()--> Started --shutdown()--> ShutDown`, with
/// `refresh()` a self-loop on `Started`. The three lifecycle operations are
/// serialized against each other; registry pushes arrive on the registry's
/// own delivery thread and are guarded independently by the shutdown flag.
pub struct DynamicResolver {
    registry: Arc<dyn RegistryClient>,
    watch: Arc<EndpointWatch>,
    lifecycle: Mutex<Lifecycle>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for DynamicResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicResolver")
            .field("locator", &self.shared.locator.reference())
            .finish_non_exhaustive()
    }
}

impl DynamicResolver {
    /// Builds a resolver for `target` (syntax `host[:port]`, no scheme).
    ///
    /// The parsed authority selects the registry through `factory`; the
    /// options name the service whose instances are requested. Fails with
    /// [`ResolveError::InvalidTarget`] or [`ResolveError::MissingPort`]
    /// without touching the registry subscription state.
    pub fn new(
        target: &str,
        options: &ResolverOptions,
        factory: &dyn RegistryFactory,
    ) -> Result<Self, ResolveError> {
        let locator = ServiceLocator::new(target, options)?;
        let registry = factory.registry(locator.authority());
        let shared = Arc::new(Shared {
            locator,
            listener: ArcSwapOption::empty(),
            shutdown: AtomicBool::new(false),
        });
        Ok(Self {
            registry,
            watch: Arc::new(EndpointWatch {
                shared: shared.clone(),
            }),
            lifecycle: Mutex::new(Lifecycle::Created),
            shared,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Issues a subscription unless the resolver is already shut down. The
    // shutdown check closes the race where a refresh() overtaken by a
    // concurrent shutdown() would resurrect the subscription.
    fn resolve(&self) {
        if self.shared.shutdown.load(Ordering::Relaxed) {
            return;
        }
        self.registry
            .subscribe(&self.shared.locator, self.watch.clone());
    }
}

impl NameResolver for DynamicResolver {
    fn service_authority(&self) -> &str {
        self.shared.locator.authority().as_str()
    }

    fn start(&self, listener: Box<dyn ResolutionListener>) -> Result<(), ResolveError> {
        let mut lifecycle = self.lock();
        if *lifecycle != Lifecycle::Created {
            return Err(ResolveError::AlreadyStarted);
        }
        self.shared.listener.store(Some(Arc::new(listener)));
        *lifecycle = Lifecycle::Started;
        self.resolve();
        Ok(())
    }

    fn refresh(&self) -> Result<(), ResolveError> {
        let lifecycle = self.lock();
        match *lifecycle {
            Lifecycle::Created => Err(ResolveError::NotStarted),
            // After shutdown the listener is still set, so the precondition
            // holds; resolve() itself declines to subscribe.
            Lifecycle::Started | Lifecycle::ShutDown => {
                self.resolve();
                Ok(())
            }
        }
    }

    fn shutdown(&self) {
        {
            let mut lifecycle = self.lock();
            if self.shared.shutdown.swap(true, Ordering::Relaxed) {
                return;
            }
            *lifecycle = Lifecycle::ShutDown;
        }
        // The registry's unsubscribe may block; it runs outside the
        // lifecycle lock so it cannot deadlock against a delivery.
        let watch: Arc<dyn EndpointListener> = self.watch.clone();
        self.registry.unsubscribe(&self.shared.locator, &watch);
    }
}
