//! SSDP wire format
//!
//! Builds the M-SEARCH query and parses the unicast HTTP-style replies
//! (`HTTP/1.1 200 OK` status line followed by a header block).

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use thiserror::Error;

/// SSDP multicast group
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// SSDP port
pub const SSDP_PORT: u16 = 1900;

/// Search target answered by Roku devices
pub const ROKU_SEARCH_TARGET: &str = "roku:ecp";

/// Multicast group and port as a socket address
pub fn multicast_target() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(SSDP_MULTICAST_ADDR, SSDP_PORT))
}

/// Why a datagram is not a discovery response
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SsdpParseError {
    #[error("empty datagram")]
    Empty,

    #[error("not a response status line: {0}")]
    NotAResponse(String),

    #[error("invalid status code in: {0}")]
    BadStatus(String),

    #[error("malformed header line: {0}")]
    BadHeader(String),
}

/// A parsed discovery response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpResponse {
    pub version: String,
    pub status_code: u16,
    pub reason: String,
    /// Headers in datagram order, names as sent
    pub headers: Vec<(String, String)>,
}

impl SsdpResponse {
    /// Header list as a map. Names are upper-cased; on duplicates the last
    /// value wins.
    pub fn header_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            map.insert(name.to_ascii_uppercase(), value.clone());
        }
        map
    }
}

/// Build the M-SEARCH datagram
pub fn build_msearch(host: SocketAddr, search_target: &str, mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         \r\n",
        host, mx, search_target
    )
}

/// Parse a datagram as a discovery response
pub fn parse_response(data: &str) -> Result<SsdpResponse, SsdpParseError> {
    let mut lines = data.split('\n').map(|l| l.trim_end_matches('\r'));

    let status_line = lines
        .by_ref()
        .find(|l| !l.trim().is_empty())
        .ok_or(SsdpParseError::Empty)?
        .trim();

    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.to_ascii_uppercase().starts_with("HTTP/") {
        return Err(SsdpParseError::NotAResponse(status_line.to_string()));
    }
    let status_code = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| SsdpParseError::BadStatus(status_line.to_string()))?;
    let reason = parts.next().unwrap_or_default().trim().to_string();

    let mut headers = Vec::new();
    for line in lines {
        // Empty line marks end of headers
        if line.trim().is_empty() {
            break;
        }

        // Split on first ':' only (values may contain ':')
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| SsdpParseError::BadHeader(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SsdpParseError::BadHeader(line.to_string()));
        }
        headers.push((name.to_string(), value.trim().to_string()));
    }

    Ok(SsdpResponse {
        version: version.to_string(),
        status_code,
        reason,
        headers,
    })
}
