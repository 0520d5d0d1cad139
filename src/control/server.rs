//! TCP control server.
//!
//! Binds the resolved endpoint on a dedicated background thread and serves
//! connections one at a time: read one command line, dispatch, write one
//! response line, close. `stop` shuts the host down, acknowledges, and then
//! terminates the process.
//!
//! CHANGELOG:
//! - 10/19/2026 - Persist auto-selected port before accepting connections
//! - 10/19/2026 - Initial implementation

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{error, info, warn};

use crate::control::address::{resolve_endpoint, ControlEndpoint};
use crate::control::protocol::{self, ControlCommand, ControlResponse};
use crate::control::store::PortStore;
use crate::error::{ControlError, Result};

/// The application a control server acts on.
pub trait ControlHost: Send + Sync {
    /// Stop the application. Returns once shutdown has completed.
    fn shutdown(&self);

    /// End the process after a `stop` has been acknowledged.
    fn terminate(&self, code: i32) {
        std::process::exit(code)
    }
}

/// Control server, configured but not yet listening.
pub struct ControlServer {
    host: Arc<dyn ControlHost>,
    store: Arc<dyn PortStore>,
    endpoint: Option<ControlEndpoint>,
    write_port_record: bool,
}

impl ControlServer {
    /// Create a server for `listen_spec`.
    ///
    /// With `select_new_port` the persisted record is ignored during resolution
    /// and the bound port is written back to `store` once listening.
    pub fn new(
        host: Arc<dyn ControlHost>,
        store: Arc<dyn PortStore>,
        listen_spec: Option<&str>,
        select_new_port: bool,
    ) -> Self {
        let endpoint = resolve_endpoint(listen_spec, select_new_port, store.as_ref());
        Self {
            host,
            store,
            endpoint,
            write_port_record: select_new_port,
        }
    }

    /// The resolved endpoint, if any.
    pub fn endpoint(&self) -> Option<&ControlEndpoint> {
        self.endpoint.as_ref()
    }

    /// Start listening on a background thread and return immediately.
    ///
    /// Returns `None` when there is no endpoint to listen on. The thread never
    /// keeps the process alive on its own; callers may drop the handle.
    pub fn start(self) -> Option<JoinHandle<()>> {
        let Some(endpoint) = self.endpoint.clone() else {
            info!("no socket address to listen to");
            return None;
        };

        let spawned = thread::Builder::new()
            .name(format!("control-listener@{}", endpoint))
            .spawn(move || self.run());

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(addr = %endpoint, error = %e, "failed to spawn control listener thread");
                None
            }
        }
    }

    fn run(self) {
        match self.bind() {
            Ok(bound) => bound.serve(),
            Err(e) => error!(error = %e, "failed to start control server"),
        }
    }

    /// Bind the endpoint, persisting the port record when configured to.
    pub fn bind(&self) -> Result<BoundControl> {
        let endpoint = self.endpoint.as_ref().ok_or(ControlError::NoEndpoint)?;

        let listener =
            TcpListener::bind(endpoint.socket_addr()).map_err(|source| ControlError::Bind {
                addr: endpoint.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        if self.write_port_record {
            match self.store.write(endpoint.host(), local_addr.port()) {
                Ok(()) => info!(
                    store = %self.store.describe(),
                    port = local_addr.port(),
                    "control port recorded"
                ),
                Err(e) => warn!(error = %e, "failed to record control port"),
            }
        }

        info!(addr = %local_addr, "control server started");

        Ok(BoundControl {
            listener,
            local_addr,
            host: Arc::clone(&self.host),
        })
    }
}

/// A bound control listener, ready to serve.
pub struct BoundControl {
    listener: TcpListener,
    local_addr: SocketAddr,
    host: Arc<dyn ControlHost>,
}

impl BoundControl {
    /// Address actually bound (the real port when 0 was requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept loop (blocking). Connections are served strictly one at a time.
    ///
    /// Returns after a `stop` has been served or when `accept` fails; the
    /// listening socket is closed on return.
    pub fn serve(self) {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!(addr = %self.local_addr, error = %e, "control accept failed, closing listener");
                    break;
                }
            };

            let peer = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "<unknown>".to_string());

            match self.handle_connection(stream, &peer) {
                Ok(true) => {
                    info!("host shut down, exiting process");
                    self.host.terminate(0);
                    break;
                }
                Ok(false) => {}
                Err(e) => warn!(peer = %peer, error = %e, "control connection aborted"),
            }
        }
    }

    /// Serve one connection. Returns `true` when the host was stopped.
    ///
    /// The stream is owned here and dropped (closed) on every path before the
    /// caller acts on a stop.
    fn handle_connection(&self, stream: TcpStream, peer: &str) -> Result<bool> {
        let mut reader = BufReader::new(&stream);
        let line = protocol::read_line(&mut reader, protocol::MAX_LINE_LEN)?;
        info!(peer = %peer, command = %line, "control command received");

        let (response, stopped) = match ControlCommand::parse(&line) {
            ControlCommand::Stop => {
                self.host.shutdown();
                (ControlResponse::Ok, true)
            }
            ControlCommand::Status => (ControlResponse::Ok, false),
            ControlCommand::Unknown(text) => (ControlResponse::unknown_command(&text), false),
        };

        let mut writer = &stream;
        match protocol::write_line(&mut writer, &response.to_line()) {
            Ok(()) => info!(peer = %peer, response = %response, "control response sent"),
            // the host is already down; the process must still exit
            Err(e) if stopped => {
                warn!(peer = %peer, error = %e, "failed to acknowledge stop");
            }
            Err(e) => return Err(e),
        }

        Ok(stopped)
    }
}
