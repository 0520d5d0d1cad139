//! Control client: send one command, read one reply, map the outcome to an
//! LSB-style exit code.
//!
//! CHANGELOG:
//! - 10/19/2026 - Optional connect/read timeout
//! - 10/19/2026 - Initial implementation

use std::io::BufReader;
use std::net::TcpStream;
use std::process::ExitCode;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::control::address::{resolve_endpoint, ControlEndpoint};
use crate::control::protocol::{self, ControlResponse, COMMAND_STATUS, COMMAND_STOP};
use crate::control::store::PortStore;
use crate::error::Result;

/// Outcome of a control request, as an LSB init-script status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LsbStatus {
    /// A reply was received.
    Running,
    /// Connected, but the exchange failed.
    Dead,
    /// Nothing is listening on the endpoint.
    NotRunning,
    /// No endpoint could be resolved.
    Unknown,
}

impl LsbStatus {
    pub fn code(self) -> u8 {
        match self {
            LsbStatus::Running => 0,
            LsbStatus::Dead => 1,
            LsbStatus::NotRunning => 3,
            LsbStatus::Unknown => 4,
        }
    }
}

impl From<LsbStatus> for ExitCode {
    fn from(status: LsbStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Record of one request: what was sent, where, and what came back.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub command: String,
    pub endpoint: Option<String>,
    pub status: LsbStatus,
    pub response: Option<ControlResponse>,
}

/// Client side of the control channel.
#[derive(Debug, Clone)]
pub struct ControlClient {
    endpoint: Option<ControlEndpoint>,
    timeout: Option<Duration>,
}

impl ControlClient {
    pub fn new(endpoint: Option<ControlEndpoint>) -> Self {
        Self {
            endpoint,
            timeout: None,
        }
    }

    /// Resolve the endpoint from `listen_spec`, falling back to the persisted record.
    pub fn from_spec(listen_spec: Option<&str>, store: &dyn PortStore) -> Self {
        Self::new(resolve_endpoint(listen_spec, false, store))
    }

    /// Bound connect, read and write. `None` or zero blocks indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn endpoint(&self) -> Option<&ControlEndpoint> {
        self.endpoint.as_ref()
    }

    /// Ask the server to shut down its host and exit.
    pub fn request_stop(&self) -> LsbStatus {
        self.send_command(COMMAND_STOP)
    }

    /// Ask whether the server is alive.
    pub fn request_status(&self) -> LsbStatus {
        self.send_command(COMMAND_STATUS)
    }

    /// Send `command` and report the outcome as an LSB status.
    ///
    /// Any reply counts as [`LsbStatus::Running`], including `ERR:` replies;
    /// those are only logged as rejected.
    pub fn send_command(&self, command: &str) -> LsbStatus {
        self.exchange(command).status
    }

    /// Like [`send_command`](Self::send_command), keeping the reply.
    pub fn exchange(&self, command: &str) -> Exchange {
        let Some(endpoint) = self.endpoint.as_ref() else {
            info!(command = %command, "no socket address to send to");
            return Exchange {
                command: command.to_string(),
                endpoint: None,
                status: LsbStatus::Unknown,
                response: None,
            };
        };

        let (status, response) = match self.call(endpoint, command) {
            Ok(response) => {
                if response.is_ok() {
                    info!(command = %command, addr = %endpoint, "control command acknowledged");
                } else {
                    warn!(command = %command, addr = %endpoint, response = %response, "control command rejected");
                }
                (LsbStatus::Running, Some(response))
            }
            Err(e) if e.is_refused() => {
                info!(addr = %endpoint, "no process running");
                (LsbStatus::NotRunning, None)
            }
            Err(e) => {
                error!(command = %command, addr = %endpoint, error = %e, "failed sending control command");
                (LsbStatus::Dead, None)
            }
        };

        Exchange {
            command: command.to_string(),
            endpoint: Some(endpoint.to_string()),
            status,
            response,
        }
    }

    /// One round trip: connect, write the line, read the reply line.
    fn call(&self, endpoint: &ControlEndpoint, command: &str) -> Result<ControlResponse> {
        let addr = endpoint.socket_addr();
        let stream = match self.timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;

        let mut writer = &stream;
        protocol::write_line(&mut writer, command)?;

        let mut reader = BufReader::new(&stream);
        let line = protocol::read_line(&mut reader, protocol::MAX_RESPONSE_LEN)?;

        Ok(ControlResponse::parse(&line))
    }
}
