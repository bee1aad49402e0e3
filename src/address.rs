//! Network address type and format checks
//!
//! A `NetAddress` is a normalized `host:port` string. Two addresses are
//! equal iff their string forms are equal; all classification (loopback,
//! private, public) is derived from the host portion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

/// Address format errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("missing port in address")]
    MissingPort,
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("empty host")]
    EmptyHost,
    #[error("host is not an IP address: {0}")]
    HostNotIp(String),
}

/// A `host:port` network endpoint.
///
/// Construction does not validate; call [`NetAddress::check_valid`] (or go
/// through the node set, which does) before trusting a peer-supplied value.
/// IPv6 hosts use the bracketed form, e.g. `[::1]:23112`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetAddress(String);

impl NetAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The host portion, with IPv6 brackets stripped.
    pub fn host(&self) -> &str {
        let s = &self.0;
        if let Some(end) = s.rfind("]:") {
            return s[..end].trim_start_matches('[');
        }
        match s.rsplit_once(':') {
            Some((host, _)) => host,
            None => s,
        }
    }

    /// The port portion, if present and parseable.
    pub fn port(&self) -> Option<u16> {
        let s = &self.0;
        let raw = if let Some(end) = s.rfind("]:") {
            &s[end + 2..]
        } else {
            s.rsplit_once(':').map(|(_, p)| p)?
        };
        raw.parse().ok()
    }

    /// Basic format validation: non-empty host and a usable port.
    pub fn check_valid(&self) -> Result<(), AddressError> {
        let s = &self.0;
        let raw_port = if let Some(end) = s.rfind("]:") {
            &s[end + 2..]
        } else {
            match s.rsplit_once(':') {
                Some((_, p)) => p,
                None => return Err(AddressError::MissingPort),
            }
        };
        match raw_port.parse::<u16>() {
            Ok(0) | Err(_) => return Err(AddressError::InvalidPort(raw_port.to_string())),
            Ok(_) => {}
        }
        if self.host().is_empty() {
            return Err(AddressError::EmptyHost);
        }
        Ok(())
    }

    /// The host parsed as an IP literal, if it is one.
    pub fn ip(&self) -> Option<IpAddr> {
        self.host().parse().ok()
    }

    /// True if the host is a loopback IP.
    pub fn is_loopback(&self) -> bool {
        matches!(self.ip(), Some(ip) if ip.is_loopback())
    }

    /// True if the host is a non-loopback private or link-local IP.
    pub fn is_local(&self) -> bool {
        match self.ip() {
            Some(IpAddr::V4(v4)) => {
                v4.is_private() || v4.is_link_local() || v4.is_unspecified()
            }
            Some(IpAddr::V6(v6)) => {
                let seg0 = v6.segments()[0];
                // fc00::/7 unique-local, fe80::/10 link-local
                (seg0 & 0xfe00) == 0xfc00 || (seg0 & 0xffc0) == 0xfe80 || v6.is_unspecified()
            }
            None => false,
        }
    }

    /// True if the host is a publicly routable IP.
    pub fn is_public(&self) -> bool {
        self.ip().is_some() && !self.is_loopback() && !self.is_local()
    }
}

impl fmt::Display for NetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NetAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<std::net::SocketAddr> for NetAddress {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_port() {
        let addr = NetAddress::from("1.2.3.4:23112");
        assert_eq!(addr.host(), "1.2.3.4");
        assert_eq!(addr.port(), Some(23112));

        let v6 = NetAddress::from("[::1]:23112");
        assert_eq!(v6.host(), "::1");
        assert_eq!(v6.port(), Some(23112));
    }

    #[test]
    fn test_check_valid() {
        assert!(NetAddress::from("8.8.8.8:23112").check_valid().is_ok());
        assert!(NetAddress::from("[2001:db8::1]:80").check_valid().is_ok());

        assert_eq!(
            NetAddress::from("8.8.8.8").check_valid(),
            Err(AddressError::MissingPort)
        );
        assert!(matches!(
            NetAddress::from("8.8.8.8:0").check_valid(),
            Err(AddressError::InvalidPort(_))
        ));
        assert!(matches!(
            NetAddress::from("8.8.8.8:notaport").check_valid(),
            Err(AddressError::InvalidPort(_))
        ));
        assert_eq!(
            NetAddress::from(":23112").check_valid(),
            Err(AddressError::EmptyHost)
        );
    }

    #[test]
    fn test_hostname_is_not_ip() {
        let addr = NetAddress::from("seed.example.com:23112");
        assert!(addr.check_valid().is_ok());
        assert!(addr.ip().is_none());
        assert!(!addr.is_public());
    }

    #[test]
    fn test_classification() {
        assert!(NetAddress::from("127.0.0.1:1000").is_loopback());
        assert!(NetAddress::from("[::1]:1000").is_loopback());

        assert!(NetAddress::from("192.168.1.5:1000").is_local());
        assert!(NetAddress::from("10.0.0.1:1000").is_local());
        assert!(NetAddress::from("169.254.0.9:1000").is_local());
        assert!(NetAddress::from("[fd00::1]:1000").is_local());
        assert!(NetAddress::from("[fe80::1]:1000").is_local());

        assert!(NetAddress::from("8.8.8.8:1000").is_public());
        assert!(NetAddress::from("[2001:db8::1]:80").is_public());
        assert!(!NetAddress::from("127.0.0.1:1000").is_public());
        assert!(!NetAddress::from("192.168.1.5:1000").is_public());
    }
}
