//! # Addresses
//!
//! IP addresses are kept in their textual form, exactly as they are exchanged with ESP-AT. No numeric
//! parsing or validation happens here, resolving and validating is left to the modem.
//!
//! ## Example
//!
//! ````
//! use esp_at_socket::address::{parse_ip, TcpAddr};
//!
//! let ip = parse_ip("10.0.0.5");
//! assert_eq!("10.0.0.5", ip.to_string());
//!
//! let remote = TcpAddr::new(ip, 80);
//! assert_eq!(80, remote.port);
//! ````
use alloc::string::{String, ToString};
use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;
use embedded_nal::{Ipv4Addr, SocketAddrV4};

/// Textual IP address, e.g. `10.0.0.1`
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Ip {
    text: String,
}

/// Wraps the given text as IP address. Never fails, as no validation is performed.
pub fn parse_ip(text: &str) -> Ip {
    Ip::parse(text)
}

impl Ip {
    /// Wraps the given text as IP address
    pub fn parse(text: &str) -> Self {
        Self { text: text.into() }
    }

    /// Returns the textual form of the address
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Returns the raw bytes of the textual form
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Interprets the text as IPv4 address. Returns None if the text is not a valid IPv4 address.
    pub fn to_ipv4(&self) -> Option<Ipv4Addr> {
        Ipv4Addr::from_str(self.as_str()).ok()
    }
}

impl FromStr for Ip {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Ip {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<Ipv4Addr> for Ip {
    fn from(address: Ipv4Addr) -> Self {
        Self {
            text: address.to_string(),
        }
    }
}

impl fmt::Display for Ip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint of a UDP socket
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct UdpAddr {
    /// Textual IP address
    pub ip: Ip,

    /// Port number
    pub port: u16,

    /// IPv6 scoped addressing zone. Carried for compatibility, but never sent to ESP-AT.
    pub zone: String,
}

impl UdpAddr {
    /// Creates a new endpoint without zone
    pub fn new(ip: Ip, port: u16) -> Self {
        Self {
            ip,
            port,
            zone: String::new(),
        }
    }

    /// Endpoint which just defines the local port, e.g. for listening
    pub fn with_port(port: u16) -> Self {
        Self::new(Ip::default(), port)
    }
}

impl From<SocketAddrV4> for UdpAddr {
    fn from(address: SocketAddrV4) -> Self {
        Self::new(Ip::from(*address.ip()), address.port())
    }
}

/// Endpoint of a TCP socket
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TcpAddr {
    /// Textual IP address
    pub ip: Ip,

    /// Port number
    pub port: u16,

    /// IPv6 scoped addressing zone. Carried for compatibility, but never sent to ESP-AT.
    pub zone: String,
}

impl TcpAddr {
    /// Creates a new endpoint without zone
    pub fn new(ip: Ip, port: u16) -> Self {
        Self {
            ip,
            port,
            zone: String::new(),
        }
    }
}

impl From<SocketAddrV4> for TcpAddr {
    fn from(address: SocketAddrV4) -> Self {
        Self::new(Ip::from(*address.ip()), address.port())
    }
}
