//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single registered backend server
//! - Parse and validate administrative address strings
//! - Expose the pieces the dispatcher needs (scheme, authority, base path)

use std::fmt;
use std::time::SystemTime;
use url::Url;

use crate::load_balancer::RegistryError;

/// Stable identifier of a backend: its position in the registry.
///
/// Positions are never reused because the registry is append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(usize);

impl BackendId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index.
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend-{}", self.0)
    }
}

/// A parsed forwarding target, not yet registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    url: Url,
}

impl BackendTarget {
    /// Parse an administrative address string.
    ///
    /// Accepts `http://host[:port][/path][?query]`, or a bare `host[:port]`
    /// which is treated as plain HTTP.
    pub fn parse(address: &str) -> Result<Self, RegistryError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(RegistryError::invalid(address, "address is empty"));
        }
        if trimmed.starts_with('/') {
            return Err(RegistryError::invalid(address, "address has no host"));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let url = Url::parse(&candidate)
            .map_err(|e| RegistryError::invalid(address, e.to_string()))?;

        if url.scheme() != "http" {
            return Err(RegistryError::invalid(
                address,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(RegistryError::invalid(address, "address has no host"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(RegistryError::invalid(address, "credentials are not allowed"));
        }
        if url.fragment().is_some() {
            return Err(RegistryError::invalid(address, "fragments are not allowed"));
        }

        Ok(Self { url })
    }

    /// The parsed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// A registered backend server.
#[derive(Debug, Clone)]
pub struct Backend {
    id: BackendId,
    url: Url,
    registered_at: SystemTime,
}

impl Backend {
    pub(crate) fn new(id: BackendId, target: BackendTarget) -> Self {
        Self {
            id,
            url: target.url,
            registered_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> BackendId {
        self.id
    }

    /// The backend's base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn registered_at(&self) -> SystemTime {
        self.registered_at
    }

    /// `host[:port]` as it should appear in the `Host` header.
    ///
    /// The port is omitted when it is the scheme default, matching how the
    /// URL was normalised at parse time.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Path prefix every forwarded request is joined onto.
    pub fn base_path(&self) -> &str {
        self.url.path()
    }

    /// Query string baked into the backend address, if any.
    pub fn base_query(&self) -> Option<&str> {
        self.url.query().filter(|q| !q.is_empty())
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
