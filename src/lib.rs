#![deny(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

/*!
Dynamic service-name resolution for RPC channels backed by a pluggable
registry.

# Introduction

An RPC client is asked to connect to a logical target such as
`consul-host:8500` with a service name like `greeter`. Between that target
name and the live set of network endpoints sits a name resolver: it parses
the target into a [`ServiceLocator`], subscribes to a discovery registry,
and feeds every endpoint-set change to the channel's connection layer
without a client restart.

[`DynamicResolver`] is that bridge. The channel drives it through the
[`NameResolver`] lifecycle (started exactly once, refreshed idempotently,
shut down exactly once), the registry pushes [`EndpointRecord`] sets through
a standing subscription, and each push becomes exactly one call on the
channel's [`ResolutionListener`]: a non-empty set is delivered as a single
[`AddressGroup`] of socket addresses, while a service with zero live
instances is surfaced as an explicit `NOT_FOUND` [`Status`], never as an
empty success.

```rust
use std::sync::Arc;
use registry_resolver::{
    registry::MemoryRegistry, DynamicResolver, NameResolver, ResolverOptions,
};

let registry = Arc::new(MemoryRegistry::new());
let resolver = DynamicResolver::new(
    "consul-host",
    &ResolverOptions::new("greeter").default_port(8500).group("prod"),
    &registry,
)?;
assert_eq!(resolver.service_authority(), "consul-host:8500");
// resolver.start(listener) subscribes; the registry pushes from here on.
# Ok::<(), registry_resolver::ResolveError>(())
```

# Pluggable Registries

The discovery backend is not part of this crate. Resolvers consume the
[`RegistryClient`] subscription contract and obtain their backend through a
[`RegistryFactory`] at construction time, so any push-based registry
(Consul, etcd, a control plane of your own) can sit behind them.
[`MemoryRegistry`] is a process-local implementation for tests and
single-process wiring.

[`RegistryClient`]: registry::RegistryClient
[`RegistryFactory`]: registry::RegistryFactory
[`MemoryRegistry`]: registry::MemoryRegistry
*/

mod channel;
pub use channel::{AddressGroup, Attributes, Code, NameResolver, ResolutionListener, Status};

mod locator;
pub use locator::{ReferenceDescriptor, ResolverOptions, ServiceLocator, DEFAULT_PROTOCOL};

mod record;
pub use record::EndpointRecord;

pub mod registry;

mod resolver;
pub use resolver::{DynamicResolver, ResolveError};
