//! Service locators: what a resolver has been asked to resolve.

use std::fmt;

use http::uri::Authority;

use crate::resolver::ResolveError;

/// Protocol tag recorded in reference descriptors.
pub const DEFAULT_PROTOCOL: &str = "grpc";

/// Construction-time options for a resolver.
///
/// `service_name` is required; the group and version tags narrow which
/// instances the registry reports. `default_port` fills in the port when the
/// target name omits one.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    service_name: String,
    default_port: Option<u16>,
    group: Option<String>,
    version: Option<String>,
}

impl ResolverOptions {
    /// Creates options for resolving `service_name`.
    pub fn new(service_name: impl ToString) -> Self {
        Self {
            service_name: service_name.to_string(),
            default_port: None,
            group: None,
            version: None,
        }
    }

    /// Sets the port used when the target name does not carry one.
    pub fn default_port(self, port: u16) -> Self {
        Self {
            default_port: Some(port),
            ..self
        }
    }

    /// Sets the service group tag.
    pub fn group(self, group: impl ToString) -> Self {
        Self {
            group: Some(group.to_string()),
            ..self
        }
    }

    /// Sets the service version tag.
    pub fn version(self, version: impl ToString) -> Self {
        Self {
            version: Some(version.to_string()),
            ..self
        }
    }
}

/// Identifies which logical service's instances are being requested from the
/// registry: the tuple (protocol, service name, group, version).
///
/// Registries key subscriptions by this value, so it is `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceDescriptor {
    protocol: String,
    service_name: String,
    group: Option<String>,
    version: Option<String>,
}

impl ReferenceDescriptor {
    /// Creates a descriptor for `service_name` under the default protocol.
    pub fn new(service_name: impl ToString) -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL.to_string(),
            service_name: service_name.to_string(),
            group: None,
            version: None,
        }
    }

    /// Sets the group tag.
    pub fn group(self, group: impl ToString) -> Self {
        Self {
            group: Some(group.to_string()),
            ..self
        }
    }

    /// Sets the version tag.
    pub fn version(self, version: impl ToString) -> Self {
        Self {
            version: Some(version.to_string()),
            ..self
        }
    }

    /// Gets the protocol tag.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Gets the service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Gets the group tag, if any.
    pub fn group_tag(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Gets the version tag, if any.
    pub fn version_tag(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for ReferenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.service_name)?;
        match (&self.group, &self.version) {
            (Some(group), Some(version)) => write!(f, "?group={group}&version={version}"),
            (Some(group), None) => write!(f, "?group={group}"),
            (None, Some(version)) => write!(f, "?version={version}"),
            (None, None) => Ok(()),
        }
    }
}

/// What one resolver instance resolves: the registry authority to subscribe
/// against and the reference descriptor naming the service.
///
/// Built once at construction and never mutated; it lives for the resolver's
/// full lifetime.
#[derive(Debug, Clone)]
pub struct ServiceLocator {
    authority: Authority,
    reference: ReferenceDescriptor,
}

impl ServiceLocator {
    /// Builds a locator from a `host[:port]` target name and options.
    ///
    /// When the target carries no port, `options.default_port` is used;
    /// absence of both is a construction failure. Deterministic: the same
    /// inputs always produce the same locator.
    pub fn new(target: &str, options: &ResolverOptions) -> Result<Self, ResolveError> {
        let authority = parse_target(target, options.default_port)?;
        let mut reference = ReferenceDescriptor::new(&options.service_name);
        if let Some(group) = &options.group {
            reference = reference.group(group);
        }
        if let Some(version) = &options.version {
            reference = reference.version(version);
        }
        Ok(Self {
            authority,
            reference,
        })
    }

    /// Gets the registry authority, always of the form `host:port`.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Gets the reference descriptor for the requested service.
    pub fn reference(&self) -> &ReferenceDescriptor {
        &self.reference
    }
}

fn parse_target(target: &str, default_port: Option<u16>) -> Result<Authority, ResolveError> {
    let authority: Authority = target
        .parse()
        .map_err(|_| ResolveError::InvalidTarget(target.to_string()))?;
    if authority.host().is_empty() {
        return Err(ResolveError::InvalidTarget(target.to_string()));
    }
    if authority.port_u16().is_some() {
        return Ok(authority);
    }
    let port = default_port.ok_or_else(|| ResolveError::MissingPort(target.to_string()))?;
    format!("{}:{}", authority.host(), port)
        .parse()
        .map_err(|_| ResolveError::InvalidTarget(target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_port_passes_through() {
        let options = ResolverOptions::new("greeter");
        let locator = ServiceLocator::new("10.0.0.5:8080", &options).unwrap();
        assert_eq!(locator.authority().as_str(), "10.0.0.5:8080");
    }

    #[test]
    fn default_port_fills_in() {
        let options = ResolverOptions::new("greeter").default_port(8500);
        let locator = ServiceLocator::new("consul-host", &options).unwrap();
        assert_eq!(locator.authority().as_str(), "consul-host:8500");
    }

    #[test]
    fn missing_port_without_default_fails() {
        let options = ResolverOptions::new("greeter");
        let err = ServiceLocator::new("consul-host", &options).unwrap_err();
        assert!(matches!(err, ResolveError::MissingPort(_)));
    }

    #[test]
    fn garbage_target_fails() {
        let options = ResolverOptions::new("greeter").default_port(8500);
        for target in ["", "host:notaport", "a b c", "http://host/"] {
            let err = ServiceLocator::new(target, &options).unwrap_err();
            assert!(matches!(err, ResolveError::InvalidTarget(_)), "{target}");
        }
    }

    #[test]
    fn same_inputs_same_locator() {
        let options = ResolverOptions::new("greeter").default_port(8500).group("prod");
        let a = ServiceLocator::new("consul-host", &options).unwrap();
        let b = ServiceLocator::new("consul-host", &options).unwrap();
        assert_eq!(a.authority(), b.authority());
        assert_eq!(a.reference(), b.reference());
    }

    #[test]
    fn descriptor_display_includes_tags() {
        let descriptor = ReferenceDescriptor::new("greeter").group("prod").version("1.0");
        assert_eq!(descriptor.to_string(), "grpc/greeter?group=prod&version=1.0");
        assert_eq!(ReferenceDescriptor::new("greeter").to_string(), "grpc/greeter");
    }

    #[test]
    fn options_tags_reach_the_descriptor() {
        let options = ResolverOptions::new("greeter")
            .default_port(8500)
            .group("prod")
            .version("2.1");
        let locator = ServiceLocator::new("consul-host", &options).unwrap();
        assert_eq!(locator.reference().service_name(), "greeter");
        assert_eq!(locator.reference().group_tag(), Some("prod"));
        assert_eq!(locator.reference().version_tag(), Some("2.1"));
        assert_eq!(locator.reference().protocol(), DEFAULT_PROTOCOL);
    }
}
