//! # Connection sessions
//!
//! Sessions are returned by [Device](crate::device::Device) and stay valid as long as their socket occupies
//! the single socket slot. Once another socket gets dialed, all operations of the older session fail with
//! [Error::SocketReplaced].
//!
//! Deadlines are accepted for interface compatibility, but are not enforced.
use crate::address::{TcpAddr, UdpAddr};
use crate::device::{Device, Error, SocketId};
use crate::transport::Transport;

/// Point in time used for the (unenforced) deadlines
pub type Deadline = fugit::TimerInstantU64<1_000_000>;

/// Socket handle shared by TCP and UDP sessions
pub struct Connection<'d, T: Transport> {
    device: &'d Device<T>,
    socket: SocketId,
}

impl<'d, T: Transport> Connection<'d, T> {
    pub(crate) fn new(device: &'d Device<T>, socket: SocketId) -> Self {
        Self { device, socket }
    }

    /// Reads data which was already received. Returns [nb::Error::WouldBlock] if no data is buffered yet.
    ///
    /// No data is requested from ESP-AT by this call, just the data delivered by unsolicited data
    /// notifications is drained. Once all data is drained and the socket was closed by the remote side,
    /// zero is returned (end of stream).
    pub fn read(&mut self, buffer: &mut [u8]) -> nb::Result<usize, Error<T::Error>> {
        self.device.assert_socket_open(self.socket)?;

        if buffer.is_empty() {
            return Ok(0);
        }

        let mut transport = self.device.transport()?;
        let length = transport.read_socket(buffer).map_err(Error::Transport)?;
        if length > 0 {
            return Ok(length);
        }

        if !transport.is_socket_open() {
            return Ok(0);
        }

        Err(nb::Error::WouldBlock)
    }

    /// Sends the given buffer and returns the length (in bytes) sent.
    ///
    /// The byte count is announced first, so that ESP-AT treats the following bytes as payload and not as
    /// command.
    pub fn write(&mut self, buffer: &[u8]) -> Result<usize, Error<T::Error>> {
        self.device.assert_socket_open(self.socket)?;

        if buffer.is_empty() {
            return Ok(0);
        }

        let mut transport = self.device.transport()?;
        transport.start_socket_send(buffer.len()).map_err(Error::Transport)?;
        transport.write(buffer).map_err(Error::Transport)
    }

    /// Closes the socket. Errors while closing are ignored.
    ///
    /// If the socket was already replaced by a newer one, nothing is sent to ESP-AT.
    pub fn close(self) {
        self.device.close_socket(self.socket);
    }

    /// Always succeeds, deadlines are not enforced.
    pub fn set_deadline(&mut self, _deadline: Option<Deadline>) -> Result<(), Error<T::Error>> {
        Ok(())
    }

    /// Always succeeds, deadlines are not enforced.
    pub fn set_read_deadline(&mut self, _deadline: Option<Deadline>) -> Result<(), Error<T::Error>> {
        Ok(())
    }

    /// Always succeeds, deadlines are not enforced.
    pub fn set_write_deadline(&mut self, _deadline: Option<Deadline>) -> Result<(), Error<T::Error>> {
        Ok(())
    }

    /// Returns false, as read or write deadlines have no effect
    pub fn supports_deadlines(&self) -> bool {
        false
    }

    /// Returns true while this socket occupies the socket slot of the device
    pub fn is_open(&self) -> bool {
        self.device.is_open(self.socket)
    }
}

/// TCP connection
pub struct TcpConnection<'d, T: Transport> {
    connection: Connection<'d, T>,
    laddr: Option<TcpAddr>,
    raddr: TcpAddr,
}

impl<'d, T: Transport> TcpConnection<'d, T> {
    pub(crate) fn new(connection: Connection<'d, T>, laddr: Option<TcpAddr>, raddr: TcpAddr) -> Self {
        Self {
            connection,
            laddr,
            raddr,
        }
    }

    /// Local endpoint as passed to dial
    pub fn local_addr(&self) -> Option<&TcpAddr> {
        self.laddr.as_ref()
    }

    /// Remote endpoint as passed to dial
    pub fn remote_addr(&self) -> &TcpAddr {
        &self.raddr
    }

    /// Closes the connection. S. [Connection::close]
    pub fn close(self) {
        self.connection.close()
    }

    /// Returns the underlying socket handle
    pub fn into_inner(self) -> Connection<'d, T> {
        self.connection
    }
}

/// UDP socket
pub struct UdpConnection<'d, T: Transport> {
    connection: Connection<'d, T>,
    laddr: UdpAddr,

    /// Fixed peer of dialed sockets. None for listening sockets.
    raddr: Option<UdpAddr>,
}

impl<'d, T: Transport> UdpConnection<'d, T> {
    pub(crate) fn new(connection: Connection<'d, T>, laddr: UdpAddr, raddr: Option<UdpAddr>) -> Self {
        Self {
            connection,
            laddr,
            raddr,
        }
    }

    /// Local endpoint as passed to dial or listen
    pub fn local_addr(&self) -> &UdpAddr {
        &self.laddr
    }

    /// Remote endpoint
    ///
    /// For dialed sockets this is the endpoint passed to dial. Listening sockets return the sender of the
    /// last received datagram, if already known by the transport.
    pub fn remote_addr(&self) -> Option<UdpAddr> {
        if let Some(raddr) = &self.raddr {
            return Some(raddr.clone());
        }

        if !self.connection.is_open() {
            return None;
        }

        let (ip, port) = self.connection.device.transport().ok()?.remote_peer()?;
        Some(UdpAddr::new(ip, port))
    }

    /// Closes the socket. S. [Connection::close]
    pub fn close(self) {
        self.connection.close()
    }

    /// Returns the underlying socket handle
    pub fn into_inner(self) -> Connection<'d, T> {
        self.connection
    }
}

/// Forwards the data and deadline methods to the inner [Connection]
macro_rules! forward_connection {
    ($type:ident) => {
        impl<'d, T: Transport> $type<'d, T> {
            /// S. [Connection::read]
            pub fn read(&mut self, buffer: &mut [u8]) -> nb::Result<usize, Error<T::Error>> {
                self.connection.read(buffer)
            }

            /// S. [Connection::write]
            pub fn write(&mut self, buffer: &[u8]) -> Result<usize, Error<T::Error>> {
                self.connection.write(buffer)
            }

            /// S. [Connection::set_deadline]
            pub fn set_deadline(&mut self, deadline: Option<Deadline>) -> Result<(), Error<T::Error>> {
                self.connection.set_deadline(deadline)
            }

            /// S. [Connection::set_read_deadline]
            pub fn set_read_deadline(&mut self, deadline: Option<Deadline>) -> Result<(), Error<T::Error>> {
                self.connection.set_read_deadline(deadline)
            }

            /// S. [Connection::set_write_deadline]
            pub fn set_write_deadline(&mut self, deadline: Option<Deadline>) -> Result<(), Error<T::Error>> {
                self.connection.set_write_deadline(deadline)
            }

            /// S. [Connection::is_open]
            pub fn is_open(&self) -> bool {
                self.connection.is_open()
            }
        }
    };
}

forward_connection!(TcpConnection);
forward_connection!(UdpConnection);

/// Implements the blocking [embedded_io] traits. Reading blocks until data was received or the socket got
/// closed by the remote side.
macro_rules! impl_embedded_io {
    ($type:ident) => {
        impl<'d, T: Transport> embedded_io::ErrorType for $type<'d, T> {
            type Error = Error<T::Error>;
        }

        impl<'d, T: Transport> embedded_io::Read for $type<'d, T> {
            fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
                nb::block!($type::read(self, buf))
            }
        }

        /// Writes are not split. The transport may reject buffers exceeding its max. transmission length,
        /// e.g. [MAX_SEND_LENGTH](crate::adapter::MAX_SEND_LENGTH) bytes for [Adapter](crate::adapter::Adapter).
        impl<'d, T: Transport> embedded_io::Write for $type<'d, T> {
            fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
                $type::write(self, buf)
            }

            fn flush(&mut self) -> Result<(), Self::Error> {
                Ok(())
            }
        }
    };
}

impl_embedded_io!(Connection);
impl_embedded_io!(TcpConnection);
impl_embedded_io!(UdpConnection);
