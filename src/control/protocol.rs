//! Control protocol: one command line in, one response line out, per connection.
//!
//! Lines are UTF-8. Responses are terminated with CRLF; incoming lines may end
//! with either LF or CRLF.
//!
//! CHANGELOG:
//! - 10/19/2026 - Bounded line reads
//! - 10/19/2026 - Initial implementation

use std::fmt;
use std::io::{BufRead, Read, Write};

use crate::error::{ControlError, Result};

/// Command asking the host to shut down and the process to exit.
pub const COMMAND_STOP: &str = "stop";

/// Command asking whether the host is alive.
pub const COMMAND_STATUS: &str = "status";

/// Acknowledgement sent for every recognized command.
pub const RESPONSE_OK: &str = "OK";

/// Prefix of the response echoing an unrecognized command.
pub const RESPONSE_ERR_PREFIX: &str = "ERR:";

/// Longest command line accepted, excluding the line terminator.
pub const MAX_LINE_LEN: usize = 4096;

/// Longest response line accepted: an `ERR:` echo of a maximal command.
pub const MAX_RESPONSE_LEN: usize = MAX_LINE_LEN + RESPONSE_ERR_PREFIX.len();

/// A command received by the control server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
    Status,
    /// Anything else, kept verbatim so it can be echoed back.
    Unknown(String),
}

impl ControlCommand {
    /// Interpret a received line. Matching is exact; no trimming beyond the line terminator.
    pub fn parse(line: &str) -> Self {
        match line {
            COMMAND_STOP => ControlCommand::Stop,
            COMMAND_STATUS => ControlCommand::Status,
            other => ControlCommand::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ControlCommand::Stop => COMMAND_STOP,
            ControlCommand::Status => COMMAND_STATUS,
            ControlCommand::Unknown(text) => text,
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response line sent back by the control server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlResponse {
    /// `OK`
    Ok,
    /// `ERR:<command>`
    Error(String),
    /// A line from a peer that does not speak this protocol.
    Other(String),
}

impl ControlResponse {
    /// The response for an unrecognized command.
    pub fn unknown_command(command: &str) -> Self {
        ControlResponse::Error(command.to_string())
    }

    pub fn parse(line: &str) -> Self {
        if line == RESPONSE_OK {
            ControlResponse::Ok
        } else if let Some(echo) = line.strip_prefix(RESPONSE_ERR_PREFIX) {
            ControlResponse::Error(echo.to_string())
        } else {
            ControlResponse::Other(line.to_string())
        }
    }

    /// The wire form, without line terminator.
    pub fn to_line(&self) -> String {
        match self {
            ControlResponse::Ok => RESPONSE_OK.to_string(),
            ControlResponse::Error(echo) => format!("{}{}", RESPONSE_ERR_PREFIX, echo),
            ControlResponse::Other(line) => line.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ControlResponse::Ok)
    }
}

impl fmt::Display for ControlResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Read exactly one line of at most `max_len` bytes, without its terminator.
///
/// A line cut short by EOF is returned as-is; EOF before any byte is
/// [`ControlError::EmptyResponse`].
pub fn read_line<R: BufRead>(reader: &mut R, max_len: usize) -> Result<String> {
    // room for the CRLF terminator
    let limit = (max_len + 2) as u64;
    let mut line = String::new();
    let read = reader.by_ref().take(limit).read_line(&mut line)?;

    if read == 0 {
        return Err(ControlError::EmptyResponse);
    }
    if !line.ends_with('\n') && read as u64 == limit {
        return Err(ControlError::LineTooLong { limit: max_len });
    }

    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    if line.len() > max_len {
        return Err(ControlError::LineTooLong { limit: max_len });
    }

    Ok(line)
}

/// Write one CRLF-terminated line and flush.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\r\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(ControlCommand::parse("stop"), ControlCommand::Stop);
        assert_eq!(ControlCommand::parse("status"), ControlCommand::Status);
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(
            ControlCommand::parse("STOP"),
            ControlCommand::Unknown("STOP".to_string())
        );
        assert_eq!(
            ControlCommand::parse(" status"),
            ControlCommand::Unknown(" status".to_string())
        );
        assert_eq!(ControlCommand::parse(""), ControlCommand::Unknown(String::new()));
    }

    #[test]
    fn test_unknown_command_response() {
        let response = ControlResponse::unknown_command("foo");
        assert_eq!(response.to_line(), "ERR:foo");
        assert!(!response.is_ok());
    }

    #[test]
    fn test_parse_responses() {
        assert_eq!(ControlResponse::parse("OK"), ControlResponse::Ok);
        assert_eq!(
            ControlResponse::parse("ERR:foo bar"),
            ControlResponse::Error("foo bar".to_string())
        );
        assert_eq!(
            ControlResponse::parse("HTTP/1.1 400"),
            ControlResponse::Other("HTTP/1.1 400".to_string())
        );
    }

    #[test]
    fn test_write_line_uses_crlf() {
        let mut out = Vec::new();
        write_line(&mut out, "OK").unwrap();
        assert_eq!(out, b"OK\r\n");
    }

    #[test]
    fn test_read_line_strips_terminators() {
        let mut input = Cursor::new("status\r\nstop\nrest");
        assert_eq!(read_line(&mut input, MAX_LINE_LEN).unwrap(), "status");
        assert_eq!(read_line(&mut input, MAX_LINE_LEN).unwrap(), "stop");
        // unterminated tail at EOF
        assert_eq!(read_line(&mut input, MAX_LINE_LEN).unwrap(), "rest");
        assert!(matches!(read_line(&mut input, MAX_LINE_LEN), Err(ControlError::EmptyResponse)));
    }

    #[test]
    fn test_read_line_rejects_oversized() {
        let long = "x".repeat(MAX_LINE_LEN + 10);
        let mut input = Cursor::new(long);
        assert!(matches!(
            read_line(&mut input, MAX_LINE_LEN),
            Err(ControlError::LineTooLong { .. })
        ));

        let exact = format!("{}\r\n", "y".repeat(MAX_LINE_LEN));
        let mut input = Cursor::new(exact);
        assert_eq!(read_line(&mut input, MAX_LINE_LEN).unwrap().len(), MAX_LINE_LEN);
    }

    #[test]
    fn test_echo_of_longest_command_fits_response_limit() {
        let command = "z".repeat(MAX_LINE_LEN);
        let echo = format!("{}\r\n", ControlResponse::unknown_command(&command).to_line());

        let mut input = Cursor::new(echo.clone());
        assert!(matches!(
            read_line(&mut input, MAX_LINE_LEN),
            Err(ControlError::LineTooLong { .. })
        ));

        let mut input = Cursor::new(echo);
        let line = read_line(&mut input, MAX_RESPONSE_LEN).unwrap();
        assert_eq!(ControlResponse::parse(&line), ControlResponse::Error(command));
    }

    #[test]
    fn test_read_line_rejects_invalid_utf8() {
        let mut input = Cursor::new(vec![0xff, 0xfe, b'\n']);
        assert!(matches!(read_line(&mut input, MAX_LINE_LEN), Err(ControlError::Io(_))));
    }
}
