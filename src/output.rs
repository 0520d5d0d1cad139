//! Output formatting for client commands.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial implementation

use serde::Serialize;
use serde_json::json;

use crate::control::client::{Exchange, LsbStatus};

/// Output control settings from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct OutputControls {
    pub json: bool,
}

/// Serializable view of an [`Exchange`].
#[derive(Debug, Serialize)]
struct ExchangeReport<'a> {
    command: &'a str,
    endpoint: Option<&'a str>,
    status: LsbStatus,
    code: u8,
    response: Option<String>,
}

impl<'a> From<&'a Exchange> for ExchangeReport<'a> {
    fn from(exchange: &'a Exchange) -> Self {
        Self {
            command: &exchange.command,
            endpoint: exchange.endpoint.as_deref(),
            status: exchange.status,
            code: exchange.status.code(),
            response: exchange.response.as_ref().map(|r| r.to_line()),
        }
    }
}

impl OutputControls {
    /// Render an exchange according to output controls.
    pub fn emit(&self, exchange: &Exchange) -> String {
        if self.json {
            let report = ExchangeReport::from(exchange);
            return serde_json::to_string(&report).unwrap_or_else(|_| format_error("serialization failed"));
        }

        let endpoint = exchange.endpoint.as_deref().unwrap_or("<none>");
        match (exchange.status, exchange.response.as_ref()) {
            (LsbStatus::Running, Some(response)) => {
                format!("{} -> {}: {}", exchange.command, endpoint, response)
            }
            (LsbStatus::Running, None) => format!("{} -> {}", exchange.command, endpoint),
            (LsbStatus::Dead, _) => format!("{}: no usable reply from {}", exchange.command, endpoint),
            (LsbStatus::NotRunning, _) => format!("not running at {}", endpoint),
            (LsbStatus::Unknown, _) => "no control address configured".to_string(),
        }
    }

    /// Print an exchange to stdout according to output controls.
    pub fn print(&self, exchange: &Exchange) {
        println!("{}", self.emit(exchange));
    }
}

/// Format error as JSON.
pub fn format_error(error: &str) -> String {
    serde_json::to_string(&json!({
        "error": error,
        "success": false
    }))
    .unwrap_or_else(|_| format!(r#"{{"error":"{}"}}"#, error))
}
