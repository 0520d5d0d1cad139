//! Control endpoint resolution.
//!
//! A listen specification has the form `[host ":"] port`. When none is given
//! the persisted port record is consulted (unless a fresh port is required),
//! and failing that the endpoint defaults to `127.0.0.1:0`, letting the OS pick.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial implementation

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use tracing::{debug, error};

use crate::control::store::PortStore;
use crate::error::{ControlError, Result};

/// Interface used when the listen specification names no host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port 0: any free port.
pub const DEFAULT_PORT: u16 = 0;

/// A parsed but not yet resolved `[host:]port` specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenSpec {
    pub host: String,
    pub port: u16,
}

impl Default for ListenSpec {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl FromStr for ListenSpec {
    type Err = ControlError;

    /// Split on the first colon; a bare value is a port on the default host.
    fn from_str(spec: &str) -> Result<Self> {
        let (host, port) = spec.split_once(':').unwrap_or(("", spec));
        let host = if host.is_empty() { DEFAULT_HOST } else { host };
        let port = port.parse::<u16>().map_err(|_| ControlError::InvalidPort {
            spec: spec.to_string(),
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ListenSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl ListenSpec {
    /// Resolve the host to a socket address.
    pub fn resolve(&self) -> Result<ControlEndpoint> {
        let unknown = || ControlError::UnknownHost {
            spec: self.to_string(),
        };
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| unknown())?
            .next()
            .ok_or_else(unknown)?;

        Ok(ControlEndpoint {
            host: self.host.clone(),
            addr,
        })
    }
}

/// The resolved (host, port) a server listens on and a client connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEndpoint {
    host: String,
    addr: SocketAddr,
}

impl ControlEndpoint {
    /// Host as written in the listen specification; this is what gets persisted.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl fmt::Display for ControlEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.addr.port())
    }
}

/// Resolve the control endpoint, surfacing the reason on failure.
///
/// `listen_spec` takes precedence. Without it, the persisted record is used
/// unless `select_new_port` is set; the default `127.0.0.1:0` is the last resort.
pub fn try_resolve_endpoint(
    listen_spec: Option<&str>,
    select_new_port: bool,
    store: &dyn PortStore,
) -> Result<ControlEndpoint> {
    let persisted = if listen_spec.is_none() && !select_new_port {
        let record = store.read();
        if let Some(ref record) = record {
            debug!(record = %record, store = %store.describe(), "using persisted control port");
        }
        record
    } else {
        None
    };

    let spec = match listen_spec.map(str::to_string).or(persisted) {
        Some(raw) => raw.parse::<ListenSpec>()?,
        None => ListenSpec::default(),
    };

    spec.resolve()
}

/// Resolve the control endpoint; failures are logged and yield `None`.
pub fn resolve_endpoint(
    listen_spec: Option<&str>,
    select_new_port: bool,
    store: &dyn PortStore,
) -> Option<ControlEndpoint> {
    match try_resolve_endpoint(listen_spec, select_new_port, store) {
        Ok(endpoint) => Some(endpoint),
        Err(e) => {
            error!(error = %e, "invalid control address");
            None
        }
    }
}
