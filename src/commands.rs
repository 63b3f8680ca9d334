use crate::adapter::Error;
use crate::responses::{DomainResponse, NoResponse};
use atat::atat_derive::AtatCmd;
use atat::heapless::String;
use atat::{AtatCmd, Error as AtError, InternalError};

/// Trait for mapping command errors
pub trait CommandErrorHandler {
    type Error;

    /// Maps regular errors
    fn command_error(&self, error: AtError) -> Self::Error;
}

/// Enables/Disables multiple connections
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse, timeout_ms = 1_000)]
pub struct SetMultipleConnectionsCommand {
    /// 0: single connection, 1: multiple connections
    mode: usize,
}

impl SetMultipleConnectionsCommand {
    /// Just a single connection at a time
    pub fn single() -> Self {
        Self { mode: 0 }
    }
}

impl CommandErrorHandler for SetMultipleConnectionsCommand {
    type Error = Error;

    fn command_error(&self, error: AtError) -> Self::Error {
        Error::ConfigurationFailed(error)
    }
}

/// Shows the remote IP and port in +IPD data notifications
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPDINFO", NoResponse, timeout_ms = 1_000)]
pub struct ShowRemoteInfoCommand {
    /// 0: hidden, 1: shown
    mode: usize,
}

impl ShowRemoteInfoCommand {
    pub fn enabled() -> Self {
        Self { mode: 1 }
    }
}

impl CommandErrorHandler for ShowRemoteInfoCommand {
    type Error = Error;

    fn command_error(&self, error: AtError) -> Self::Error {
        Error::ConfigurationFailed(error)
    }
}

/// Establishes a TCP connection
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 5_000, attempts = 1)]
pub struct TcpConnectCommand {
    /// Always TCP
    connection_type: String<3>,

    /// Remote IPv4 address or host name
    remote_host: String<64>,

    /// Remote port
    port: u16,
}

impl TcpConnectCommand {
    pub fn new(remote_host: String<64>, port: u16) -> Self {
        Self {
            connection_type: String::try_from("TCP").unwrap_or_default(),
            remote_host,
            port,
        }
    }
}

impl CommandErrorHandler for TcpConnectCommand {
    type Error = Error;

    fn command_error(&self, error: AtError) -> Self::Error {
        Error::ConnectError(error)
    }
}

/// Opens a UDP socket
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 5_000, attempts = 1)]
pub struct UdpConnectCommand {
    /// Always UDP
    connection_type: String<3>,

    /// Remote IPv4 address. "0" if not bound to any peer.
    remote_host: String<64>,

    /// Remote port. 0 if not bound to any peer.
    remote_port: u16,

    /// Local listening port
    local_port: u16,

    /// Peer mode:
    ///     0: remote is fixed
    ///     1: remote may change once
    ///     2: remote may change any number of times
    mode: usize,
}

impl UdpConnectCommand {
    pub fn new(remote_host: String<64>, remote_port: u16, local_port: u16) -> Self {
        Self {
            connection_type: String::try_from("UDP").unwrap_or_default(),
            remote_host,
            remote_port,
            local_port,
            mode: 2,
        }
    }
}

impl CommandErrorHandler for UdpConnectCommand {
    type Error = Error;

    fn command_error(&self, error: AtError) -> Self::Error {
        Error::ConnectError(error)
    }
}

/// Closes the current connection
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse, timeout_ms = 5_000)]
pub struct CloseSocketCommand;

impl CommandErrorHandler for CloseSocketCommand {
    type Error = Error;

    fn command_error(&self, error: AtError) -> Self::Error {
        Error::CloseError(error)
    }
}

/// Announces the byte count of the next data transmission
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 1_000)]
pub struct TransmissionPrepareCommand {
    /// Byte count, max. 2048
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl CommandErrorHandler for TransmissionPrepareCommand {
    type Error = Error;

    fn command_error(&self, error: AtError) -> Self::Error {
        Error::TransmissionStartFailed(error)
    }
}

/// Raw socket payload, sent after [TransmissionPrepareCommand]
#[derive(Clone)]
pub struct TransmissionCommand<'a, const TX_SIZE: usize> {
    data: &'a [u8],
}

impl<'a, const TX_SIZE: usize> TransmissionCommand<'a, TX_SIZE> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<const TX_SIZE: usize> AtatCmd for TransmissionCommand<'_, TX_SIZE> {
    type Response = NoResponse;

    const MAX_LEN: usize = TX_SIZE;
    const MAX_TIMEOUT_MS: u32 = 5_000;
    const EXPECTS_RESPONSE_CODE: bool = false;

    fn write(&self, buf: &mut [u8]) -> usize {
        let length = self.data.len().min(buf.len());
        buf[..length].copy_from_slice(&self.data[..length]);
        length
    }

    fn parse(&self, _resp: Result<&[u8], InternalError>) -> Result<Self::Response, AtError> {
        Ok(NoResponse)
    }
}

impl<const TX_SIZE: usize> CommandErrorHandler for TransmissionCommand<'_, TX_SIZE> {
    type Error = Error;

    fn command_error(&self, error: AtError) -> Self::Error {
        Error::SendFailed(error)
    }
}

/// Resolves a domain name
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPDOMAIN", DomainResponse, timeout_ms = 10_000)]
pub struct ResolveDomainCommand {
    /// Host name to resolve
    domain: String<64>,
}

impl ResolveDomainCommand {
    pub fn new(domain: String<64>) -> Self {
        Self { domain }
    }
}

impl CommandErrorHandler for ResolveDomainCommand {
    type Error = Error;

    fn command_error(&self, error: AtError) -> Self::Error {
        Error::DnsFailed(error)
    }
}
