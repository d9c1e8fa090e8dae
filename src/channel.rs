//! The channel-facing surface of name resolution.
//!
//! These are the types an RPC channel's connection layer consumes: resolved
//! [`AddressGroup`]s delivered through a [`ResolutionListener`], and the
//! [`NameResolver`] capability interface the channel drives the resolver
//! through. The resolver produces into this surface; it never depends on how
//! the channel load-balances over the result.

use std::{collections::BTreeMap, fmt, net::SocketAddr};

use crate::resolver::ResolveError;

/// Opaque bag of string key/value attributes attached to resolution output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: BTreeMap<String, String>,
}

impl Attributes {
    /// The empty attribute bag.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds an attribute.
    pub fn with(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    /// Looks up an attribute by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether the bag holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One unit of resolution output: a set of addresses the channel may treat
/// as interchangeable for one logical endpoint. Always holds at least one
/// address; a resolver never delivers an empty group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressGroup {
    addresses: Vec<SocketAddr>,
    attributes: Attributes,
}

impl AddressGroup {
    /// Creates a group over `addresses` with no attributes.
    pub fn new(addresses: Vec<SocketAddr>) -> Self {
        Self {
            addresses,
            attributes: Attributes::empty(),
        }
    }

    /// Gets the group's addresses.
    pub fn addresses(&self) -> &[SocketAddr] {
        &self.addresses
    }

    /// Gets the group's attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Coarse classification of a resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// The registry currently reports zero instances for the service.
    NotFound,
    /// The registry backend could not be reached.
    Unavailable,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::NotFound => f.write_str("NOT_FOUND"),
            Code::Unavailable => f.write_str("UNAVAILABLE"),
        }
    }
}

/// A resolution failure delivered to a [`ResolutionListener`].
///
/// Statuses are results, not raised errors: the resolver keeps running and
/// keeps reporting, and the channel decides whether and when to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: Code,
    description: String,
}

impl Status {
    /// Creates a status from a code and human-readable description.
    pub fn new(code: Code, description: impl ToString) -> Self {
        Self {
            code,
            description: description.to_string(),
        }
    }

    /// Shorthand for a [`Code::NotFound`] status.
    pub fn not_found(description: impl ToString) -> Self {
        Self::new(Code::NotFound, description)
    }

    /// Gets the status code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// Gets the human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

/// Consumes resolution results on behalf of the RPC channel.
///
/// Exactly one of the two methods is invoked per registry push the resolver
/// decides to forward. Invocations arrive on the registry's delivery thread,
/// not on the thread that drives the resolver's lifecycle.
pub trait ResolutionListener: Send + Sync {
    /// Delivers a fresh, non-empty set of address groups.
    fn on_update(&self, groups: Vec<AddressGroup>, attributes: Attributes);

    /// Delivers a resolution failure, e.g. the service has no live instances.
    fn on_error(&self, status: Status);
}

/// The lifecycle contract a channel drives a name resolver through.
///
/// A resolver is started exactly once, may be refreshed idempotently while
/// started, and is shut down exactly once. Implementations serialize the
/// three lifecycle operations against each other.
pub trait NameResolver: Send + Sync {
    /// Returns the authority string of the resolution target.
    ///
    /// Pure; callable at any point in the lifecycle.
    fn service_authority(&self) -> &str;

    /// Registers `listener` and triggers the first resolution.
    ///
    /// Fails with [`ResolveError::AlreadyStarted`] if the resolver has
    /// already been started or shut down.
    fn start(&self, listener: Box<dyn ResolutionListener>) -> Result<(), ResolveError>;

    /// Requests a fresh resolution on top of the existing subscription.
    ///
    /// Fails with [`ResolveError::NotStarted`] before [`start`] has
    /// succeeded. After shutdown it is a no-op.
    ///
    /// [`start`]: NameResolver::start
    fn refresh(&self) -> Result<(), ResolveError>;

    /// Releases the registry subscription and makes the resolver terminal.
    ///
    /// Idempotent; later calls do nothing. Pushes already in flight when
    /// shutdown completes are dropped, they never reach the listener.
    fn shutdown(&self);
}
