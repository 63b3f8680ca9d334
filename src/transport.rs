//! # Transport contract
//!
//! The [Device](crate::device::Device) translates socket operations into the primitives of this trait.
//! [Adapter](crate::adapter::Adapter) implements it on top of an ATAT client. Any other AT command
//! transport may be plugged in as well.
//!
//! Commands and payload share a single byte stream. So [Transport::start_socket_send] is always directly
//! followed by [Transport::write] of exactly the announced byte count.
use crate::address::Ip;
use core::fmt::Debug;

/// Primitives of an AT command transport for a modem with a single socket
pub trait Transport {
    /// Transport specific error, passed through unchanged to the caller
    type Error: Debug;

    /// Opens a TCP connection to the given remote address
    fn connect_tcp_socket(&mut self, remote_address: &str, remote_port: u16) -> Result<(), Self::Error>;

    /// Opens a UDP socket sending to the given remote and listening on the given local port
    ///
    /// Remote address `0` and port `0` leave the socket unbound to any peer.
    fn connect_udp_socket(&mut self, remote_address: &str, remote_port: u16, local_port: u16)
        -> Result<(), Self::Error>;

    /// Closes the current socket. Closing without an open socket is accepted as no-op.
    fn disconnect_socket(&mut self) -> Result<(), Self::Error>;

    /// Announces that the next [Transport::write] carries exactly `length` bytes of socket payload
    fn start_socket_send(&mut self, length: usize) -> Result<(), Self::Error>;

    /// Pushes raw payload bytes
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Drains socket data which was already delivered by unsolicited data notifications.
    /// Returns zero if no data is buffered.
    fn read_socket(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error>;

    /// Resolves the given host name
    fn get_dns(&mut self, hostname: &str) -> Result<Ip, Self::Error>;

    /// Returns false once the socket was closed, e.g. by the remote side
    fn is_socket_open(&mut self) -> bool {
        true
    }

    /// Sender of the last received data, if reported by the modem
    fn remote_peer(&mut self) -> Option<(Ip, u16)> {
        None
    }
}
