//! # Socket device
//!
//! ESP-AT is operated in single connection mode, so just one socket may be open at any time. [Device] is
//! the single point of truth for this socket slot: every dial or listen closes the previous socket first,
//! sessions returned earlier are invalidated by this.
//!
//! ## Example
//!
//! ````
//! # use esp_at_socket::example::ExampleTransport;
//! use esp_at_socket::address::{parse_ip, TcpAddr};
//! use esp_at_socket::device::Device;
//!
//! let device = Device::new(ExampleTransport::default());
//!
//! // Creating a TCP connection
//! let mut connection = device.dial_tcp(None, TcpAddr::new(parse_ip("10.0.0.1"), 21)).unwrap();
//!
//! // Sending some data
//! connection.write(b"hallo!").unwrap();
//!
//! // Receiving some data
//! let mut rx_buffer = [0x0; 64];
//! let length = nb::block!(connection.read(&mut rx_buffer)).unwrap();
//! assert_eq!(b"nice to see you!", &rx_buffer[..length]);
//!
//! // Closing socket
//! connection.close();
//! ````
use crate::address::{Ip, TcpAddr, UdpAddr};
use crate::connection::{Connection, TcpConnection, UdpConnection};
use crate::transport::Transport;
use core::cell::{Cell, RefCell, RefMut};
use core::num::ParseIntError;
use embedded_nal::{AddrType, Dns, IpAddr};

/// Socket related errors
#[derive(Clone, Debug, PartialEq)]
pub enum Error<E> {
    /// Error of the underlying transport
    Transport(E),

    /// Port of a `host:port` address could not be parsed
    InvalidPort(ParseIntError),

    /// Socket was closed
    SocketClosed,

    /// Socket was replaced by a newer dial or listen call
    SocketReplaced,

    /// Transport is currently borrowed by another operation
    DeviceBusy,

    /// Resolved address is not a valid IPv4 address
    InvalidAddress,

    /// Requested operation or address type is not supported
    Unsupported,
}

impl<E: core::fmt::Debug> embedded_io::Error for Error<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::SocketClosed => embedded_io::ErrorKind::NotConnected,
            Error::SocketReplaced => embedded_io::ErrorKind::ConnectionAborted,
            Error::InvalidPort(_) | Error::InvalidAddress => embedded_io::ErrorKind::InvalidInput,
            Error::Unsupported => embedded_io::ErrorKind::Unsupported,
            Error::Transport(_) | Error::DeviceBusy => embedded_io::ErrorKind::Other,
        }
    }
}

/// Identifies a single socket opened by dial or listen
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SocketId(u32);

/// State of the single socket slot
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SocketState {
    /// No socket open
    #[default]
    Idle,

    /// The given socket is open
    Open(SocketId),
}

/// Handle to an ESP-AT modem offering exactly one socket at a time
///
/// The device is not [Sync]. Operations of all sessions run sequentially on the calling thread.
pub struct Device<T: Transport> {
    transport: RefCell<T>,

    /// Single socket slot
    state: Cell<SocketState>,

    /// ID assigned to the next opened socket
    next_id: Cell<u32>,
}

impl<T: Transport> Device<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: RefCell::new(transport),
            state: Cell::new(SocketState::Idle),
            next_id: Cell::new(0),
        }
    }

    /// Returns the current state of the socket slot
    pub fn state(&self) -> SocketState {
        self.state.get()
    }

    /// Releases the underlying transport
    pub fn into_transport(self) -> T {
        self.transport.into_inner()
    }

    /// Opens a UDP socket sending to `raddr` and listening on the port of `laddr`.
    /// Any previously opened socket is closed first.
    pub fn dial_udp(&self, laddr: UdpAddr, raddr: UdpAddr) -> Result<UdpConnection<'_, T>, Error<T::Error>> {
        #[cfg(feature = "log")]
        log::debug!("Dialing UDP {}:{} from port {}", raddr.ip, raddr.port, laddr.port);

        let socket = self.open_socket(|transport| {
            transport.connect_udp_socket(raddr.ip.as_str(), raddr.port, laddr.port)
        })?;

        Ok(UdpConnection::new(Connection::new(self, socket), laddr, Some(raddr)))
    }

    /// Opens a UDP socket listening on the port of `laddr` without any fixed peer.
    /// Any previously opened socket is closed first.
    pub fn listen_udp(&self, laddr: UdpAddr) -> Result<UdpConnection<'_, T>, Error<T::Error>> {
        #[cfg(feature = "log")]
        log::debug!("Listening for UDP on port {}", laddr.port);

        let socket = self.open_socket(|transport| transport.connect_udp_socket("0", 0, laddr.port))?;
        Ok(UdpConnection::new(Connection::new(self, socket), laddr, None))
    }

    /// Opens a TCP connection to `raddr`. Any previously opened socket is closed first.
    ///
    /// ESP-AT does not support choosing the local port of TCP connections, so the port of `laddr` is
    /// not transmitted.
    pub fn dial_tcp(&self, laddr: Option<TcpAddr>, raddr: TcpAddr) -> Result<TcpConnection<'_, T>, Error<T::Error>> {
        #[cfg(feature = "log")]
        log::debug!("Dialing TCP {}:{}", raddr.ip, raddr.port);

        let socket = self.open_socket(|transport| transport.connect_tcp_socket(raddr.ip.as_str(), raddr.port))?;
        Ok(TcpConnection::new(Connection::new(self, socket), laddr, raddr))
    }

    /// Resolves a `host[:port]` address to a TCP endpoint. Port defaults to zero.
    ///
    /// The network name is accepted as is and not validated. Everything after the first colon is parsed as
    /// port, so `host:80:90` is rejected with [Error::InvalidPort] instead of picking one of the segments.
    pub fn resolve_tcp_addr(&self, _network: &str, address: &str) -> Result<TcpAddr, Error<T::Error>> {
        let (ip, port) = self.resolve(address)?;
        Ok(TcpAddr::new(ip, port))
    }

    /// Resolves a `host[:port]` address to a UDP endpoint. S. [Device::resolve_tcp_addr]
    pub fn resolve_udp_addr(&self, _network: &str, address: &str) -> Result<UdpAddr, Error<T::Error>> {
        let (ip, port) = self.resolve(address)?;
        Ok(UdpAddr::new(ip, port))
    }

    /// Splits the host from the port at the first colon, resolves the host and parses the port
    fn resolve(&self, address: &str) -> Result<(Ip, u16), Error<T::Error>> {
        let (host, port) = match address.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (address, None),
        };

        let ip = self.transport()?.get_dns(host).map_err(Error::Transport)?;

        let port = match port {
            Some(port) => port.parse::<u16>().map_err(Error::InvalidPort)?,
            None => 0,
        };

        Ok((ip, port))
    }

    /// Closes any open socket and opens a new one by the given connect function.
    /// The slot is only marked as open if connect succeeded.
    fn open_socket<F>(&self, connect: F) -> Result<SocketId, Error<T::Error>>
    where
        F: FnOnce(&mut T) -> Result<(), T::Error>,
    {
        let mut transport = self.transport()?;

        self.state.set(SocketState::Idle);
        transport.disconnect_socket().map_err(Error::Transport)?;
        connect(&mut *transport).map_err(Error::Transport)?;

        let socket = SocketId(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));
        self.state.set(SocketState::Open(socket));

        Ok(socket)
    }

    /// Closes the given socket if it still occupies the slot. Errors of the transport are ignored.
    pub(crate) fn close_socket(&self, socket: SocketId) {
        if !self.is_open(socket) {
            return;
        }

        self.state.set(SocketState::Idle);

        let Ok(mut transport) = self.transport.try_borrow_mut() else {
            return;
        };

        if let Err(_error) = transport.disconnect_socket() {
            #[cfg(feature = "log")]
            log::warn!("Ignoring error while closing socket: {:?}", _error);
        }
    }

    /// Returns true if the given socket currently occupies the slot
    pub(crate) fn is_open(&self, socket: SocketId) -> bool {
        self.state.get() == SocketState::Open(socket)
    }

    /// Asserts that the given socket still occupies the slot and returns otherwise the appropriate error
    pub(crate) fn assert_socket_open(&self, socket: SocketId) -> Result<(), Error<T::Error>> {
        match self.state.get() {
            SocketState::Open(current) if current == socket => Ok(()),
            SocketState::Open(_) => Err(Error::SocketReplaced),
            SocketState::Idle => Err(Error::SocketClosed),
        }
    }

    /// Mutably borrows the transport
    pub(crate) fn transport(&self) -> Result<RefMut<'_, T>, Error<T::Error>> {
        self.transport.try_borrow_mut().map_err(|_| Error::DeviceBusy)
    }
}

impl<T: Transport> Dns for Device<T> {
    type Error = Error<T::Error>;

    /// Resolves the given host name by ESP-AT. Just IPv4 is supported.
    fn get_host_by_name(&mut self, hostname: &str, addr_type: AddrType) -> nb::Result<IpAddr, Self::Error> {
        if addr_type == AddrType::IPv6 {
            return Err(nb::Error::Other(Error::Unsupported));
        }

        let ip = self.transport()?.get_dns(hostname).map_err(Error::Transport)?;
        let address = ip.to_ipv4().ok_or(Error::InvalidAddress)?;
        Ok(IpAddr::V4(address))
    }

    /// Reverse lookups are not supported by ESP-AT
    fn get_host_by_address(&mut self, _addr: IpAddr, _result: &mut [u8]) -> nb::Result<usize, Self::Error> {
        Err(nb::Error::Other(Error::Unsupported))
    }
}
