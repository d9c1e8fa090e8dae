//! Registry endpoint records.

use std::{
    collections::BTreeMap,
    net::{AddrParseError, IpAddr, SocketAddr},
};

/// One entry in a registry's endpoint set for a service.
///
/// Records are immutable values produced by the registry layer; two records
/// with the same fields are the same endpoint. The `host` field is a literal
/// IP address in string form, as published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    host: String,
    port: u16,
    protocol: String,
    params: BTreeMap<String, String>,
}

impl EndpointRecord {
    /// Creates a record for an instance reachable at `host:port`.
    pub fn new(host: impl ToString, port: u16, protocol: impl ToString) -> Self {
        Self {
            host: host.to_string(),
            port,
            protocol: protocol.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Attaches a free-form registry parameter to the record.
    pub fn param(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Gets the record's host, a literal IP address in string form.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Gets the record's port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Gets the record's protocol tag.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Gets the record's free-form parameters.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Parses the record into the socket address the RPC layer dials.
    ///
    /// Fails if `host` is not a literal IPv4 or IPv6 address; hostnames are
    /// not resolved here, the registry is expected to publish addresses.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
