//! # ESP-AT transport
//!
//! Implements [Transport] on top of an ATAT client, which needs to be in blocking mode.
//!
//! ESP-AT is used in single connection mode and active receiving mode: received socket data is pushed by
//! `+IPD` notifications and buffered by the adapter until drained by [Transport::read_socket].
//!
//! Commands and socket payload share the same serial line. After `AT+CIPSEND=<n>` the adapter is in payload
//! mode and accepts nothing else than writing exactly the announced `n` bytes.
use crate::address::Ip;
use crate::commands::{
    CloseSocketCommand, CommandErrorHandler, ResolveDomainCommand, SetMultipleConnectionsCommand,
    ShowRemoteInfoCommand, TcpConnectCommand, TransmissionCommand, TransmissionPrepareCommand, UdpConnectCommand,
};
use crate::transport::Transport;
use crate::urc::{ReceivedData, URCMessages};
use atat::blocking::AtatClient;
use atat::heapless::String;
use atat::{AtatCmd, Error as AtError, UrcSubscription};
use heapless::Deque;

/// Max. byte count ESP-AT accepts for a single CIPSEND command
pub const MAX_SEND_LENGTH: usize = 2048;

/// Errors of the ESP-AT transport
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Error while configuring single connection mode or remote info reporting
    ConfigurationFailed(AtError),

    /// CIPSTART command failed
    ConnectError(AtError),

    /// Socket close command failed
    CloseError(AtError),

    /// Preparing the transmission failed (CIPSEND command)
    TransmissionStartFailed(AtError),

    /// Transmission of data failed
    SendFailed(AtError),

    /// CIPDOMAIN command failed
    DnsFailed(AtError),

    /// A transmission was announced, so payload needs to be written before sending any other command
    PayloadPending,

    /// Payload was written without announcing the byte count first
    NoTransmissionAnnounced,

    /// Written payload exceeds the announced byte count
    PayloadLengthMismatch,

    /// ESP-AT confirmed receiving an unexpected byte count
    PartialSend,

    /// Announced byte count is zero or larger then [MAX_SEND_LENGTH]
    InvalidLength,

    /// Remote address is longer then 64 chars
    AddressTooLong,

    /// Host name is longer then 64 chars
    HostnameTooLong,

    /// CIPDOMAIN response did not contain an address
    InvalidDnsResponse,

    /// Received more data then fitting in the receive buffer, the exceeding data got lost
    ReceiveOverflow,
}

/// Serial line mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TransferMode {
    /// Line carries AT commands
    Command,

    /// Line carries socket payload. Remaining byte count until all announced payload is written.
    Payload(usize),
}

/// Socket state, gets updated by URC messages
pub(crate) struct Session<const RX_SIZE: usize> {
    /// True if single connection mode and remote info reporting was configured
    pub(crate) configured: bool,

    /// True if a socket is currently open
    pub(crate) socket_open: bool,

    /// A URC message signaling that the socket is already connected
    pub(crate) already_connected: bool,

    /// Received byte count confirmed by URC message. Gets reset to NONE when announcing a transmission
    pub(crate) recv_byte_count: Option<usize>,

    /// True => Data transmission was confirmed by URC message
    /// False => Data transmission error signaled by URC message
    /// None => Neither an error or confirmed by received by URC message yet
    pub(crate) send_confirmed: Option<bool>,

    /// Socket data received by +IPD notifications, but not read yet
    pub(crate) buffer: Deque<u8, RX_SIZE>,

    /// True if received data got lost as the buffer was full
    pub(crate) overflow: bool,

    /// Sender of the last received data
    pub(crate) peer: Option<(Ip, u16)>,
}

impl<const RX_SIZE: usize> Default for Session<RX_SIZE> {
    fn default() -> Self {
        Self {
            configured: false,
            socket_open: false,
            already_connected: false,
            recv_byte_count: None,
            send_confirmed: None,
            buffer: Deque::new(),
            overflow: false,
            peer: None,
        }
    }
}

impl<const RX_SIZE: usize> Session<RX_SIZE> {
    /// Handles a single URC message
    pub(crate) fn handle_urc(&mut self, message: URCMessages<RX_SIZE>) {
        match message {
            URCMessages::Ready => {
                // Modem restarted, so configuration and socket are lost
                self.configured = false;
                self.socket_open = false;
            }
            URCMessages::SocketConnected => self.socket_open = true,
            URCMessages::SocketClosed => self.socket_open = false,
            URCMessages::WifiDisconnected => self.socket_open = false,
            URCMessages::AlreadyConnected => self.already_connected = true,
            URCMessages::ReceivedBytes(count) => self.recv_byte_count = Some(count),
            URCMessages::SendConfirmation => self.send_confirmed = Some(true),
            URCMessages::SendFail => self.send_confirmed = Some(false),
            URCMessages::Data(data) => self.store_data(data),
            URCMessages::DataOverflow(_length) => {
                #[cfg(feature = "log")]
                log::warn!("Dropped {} bytes of received data exceeding the receive buffer", _length);
                self.overflow = true;
            }
            URCMessages::WifiConnected | URCMessages::ReceivedIP | URCMessages::Unknown => {}
        }
    }

    /// Appends received data to the buffer and remembers the sender
    fn store_data(&mut self, received: ReceivedData<RX_SIZE>) {
        if let Some(remote) = received.remote {
            self.peer = Some((Ip::parse(remote.address.as_str()), remote.port));
        }

        for byte in received.data {
            if self.buffer.push_back(byte).is_err() {
                self.overflow = true;
                return;
            }
        }
    }

    /// Moves buffered data to the given buffer and returns the moved length
    fn drain_data(&mut self, buffer: &mut [u8]) -> usize {
        let mut length = 0;

        for slot in buffer.iter_mut() {
            match self.buffer.pop_front() {
                Some(byte) => *slot = byte,
                None => break,
            }

            length += 1;
        }

        length
    }

    /// Drops all received data of a previous socket
    fn reset_data(&mut self) {
        self.buffer.clear();
        self.overflow = false;
        self.peer = None;
    }
}

/// ESP-AT transport
///
/// TX_SIZE: Chunk size in bytes when sending data. Higher value results in better performance, but
/// introduces also higher stack memory footprint.
///
/// RX_SIZE: Size of the receive buffer, also max. payload size of a single +IPD notification.
///
/// URC_CAPACITY: Capacity of the URC subscription
pub struct Adapter<'urc_sub, A: AtatClient, const TX_SIZE: usize, const RX_SIZE: usize, const URC_CAPACITY: usize> {
    /// ATAT client
    pub(crate) client: A,

    /// URC message subscriber
    urc_subscription: UrcSubscription<'urc_sub, URCMessages<RX_SIZE>, URC_CAPACITY, 1>,

    /// Network state
    pub(crate) session: Session<RX_SIZE>,

    /// Current serial line mode
    mode: TransferMode,

    /// Byte count of the current transmission
    announced: usize,
}

impl<'urc_sub, A: AtatClient, const TX_SIZE: usize, const RX_SIZE: usize, const URC_CAPACITY: usize>
    Adapter<'urc_sub, A, TX_SIZE, RX_SIZE, URC_CAPACITY>
{
    /// Creates a new transport. Client needs to be in blocking mode.
    pub fn new(client: A, urc_subscription: UrcSubscription<'urc_sub, URCMessages<RX_SIZE>, URC_CAPACITY, 1>) -> Self {
        Self {
            client,
            urc_subscription,
            session: Session::default(),
            mode: TransferMode::Command,
            announced: 0,
        }
    }

    /// Processes all pending messages in the queue
    pub(crate) fn process_urc_messages(&mut self) {
        while let Some(message) = self.urc_subscription.try_next_message_pure() {
            self.session.handle_urc(message)
        }
    }

    /// Sends a command and maps the error if the command failed
    pub(crate) fn send_command<Cmd: AtatCmd + CommandErrorHandler>(
        &mut self,
        command: Cmd,
    ) -> Result<Cmd::Response, Cmd::Error> {
        self.client.send(&command).map_err(|e| command.command_error(e))
    }

    /// Enables single connection mode and remote info reporting.
    /// Stores internal state, so commands are just sent once for saving bandwidth
    fn configure(&mut self) -> Result<(), Error> {
        if self.session.configured {
            return Ok(());
        }

        self.send_command(SetMultipleConnectionsCommand::single())?;
        self.send_command(ShowRemoteInfoCommand::enabled())?;
        self.session.configured = true;
        Ok(())
    }

    /// Returns an error if announced payload is still pending
    fn assert_command_mode(&self) -> Result<(), Error> {
        match self.mode {
            TransferMode::Command => Ok(()),
            TransferMode::Payload(_) => Err(Error::PayloadPending),
        }
    }

    /// Sends the given connect command. A socket reported as already connected is accepted.
    fn connect<Cmd: AtatCmd + CommandErrorHandler<Error = Error>>(&mut self, command: Cmd) -> Result<(), Error> {
        self.process_urc_messages();
        self.session.already_connected = false;

        // Data of the new socket may already arrive while the command is processed
        self.session.reset_data();

        let result = self.send_command(command);
        self.process_urc_messages();

        // ESP-AT returned that the socket is already connected. This indicates that a URC Connect message was missed.
        if !self.session.already_connected {
            result?;
        }

        self.session.socket_open = true;
        Ok(())
    }

    /// Converts an address to a command argument
    fn command_address(address: &str) -> Result<String<64>, Error> {
        String::try_from(address).map_err(|_| Error::AddressTooLong)
    }

    /// Sends the payload in chunks of TX_SIZE and checks for a reported transmission error.
    /// The confirmed byte count is checked once the transmission is complete.
    fn send_payload(&mut self, data: &[u8], complete: bool) -> Result<(), Error> {
        for chunk in data.chunks(TX_SIZE) {
            self.send_command::<TransmissionCommand<'_, TX_SIZE>>(TransmissionCommand::new(chunk))?;
        }

        self.process_urc_messages();

        if self.session.send_confirmed == Some(false) {
            return Err(Error::SendFailed(AtError::Error));
        }

        // Older firmware versions do not report the received byte count
        if complete && self.session.recv_byte_count.is_some_and(|count| count != self.announced) {
            return Err(Error::PartialSend);
        }

        Ok(())
    }
}

impl<A: AtatClient, const TX_SIZE: usize, const RX_SIZE: usize, const URC_CAPACITY: usize> Transport
    for Adapter<'_, A, TX_SIZE, RX_SIZE, URC_CAPACITY>
{
    type Error = Error;

    fn connect_tcp_socket(&mut self, remote_address: &str, remote_port: u16) -> Result<(), Error> {
        self.assert_command_mode()?;
        self.configure()?;

        let command = TcpConnectCommand::new(Self::command_address(remote_address)?, remote_port);
        self.connect(command)
    }

    fn connect_udp_socket(&mut self, remote_address: &str, remote_port: u16, local_port: u16) -> Result<(), Error> {
        self.assert_command_mode()?;
        self.configure()?;

        let command = UdpConnectCommand::new(Self::command_address(remote_address)?, remote_port, local_port);
        self.connect(command)
    }

    /// Closes the socket. ESP-AT responds by ERROR if no socket is open, which is accepted as no-op.
    fn disconnect_socket(&mut self) -> Result<(), Error> {
        self.assert_command_mode()?;
        self.process_urc_messages();

        let result = self.send_command(CloseSocketCommand);
        self.process_urc_messages();

        let was_open = self.session.socket_open;
        self.session.socket_open = false;

        match result {
            Err(error) if was_open => Err(error),
            _ => Ok(()),
        }
    }

    fn start_socket_send(&mut self, length: usize) -> Result<(), Error> {
        self.assert_command_mode()?;

        if length == 0 || length > MAX_SEND_LENGTH {
            return Err(Error::InvalidLength);
        }

        self.process_urc_messages();
        self.session.send_confirmed = None;
        self.session.recv_byte_count = None;

        self.send_command(TransmissionPrepareCommand::new(length))?;
        self.mode = TransferMode::Payload(length);
        self.announced = length;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
        let TransferMode::Payload(remaining) = self.mode else {
            return Err(Error::NoTransmissionAnnounced);
        };

        if data.len() > remaining {
            return Err(Error::PayloadLengthMismatch);
        }

        let remaining = remaining - data.len();
        self.mode = match remaining {
            0 => TransferMode::Command,
            _ => TransferMode::Payload(remaining),
        };

        if let Err(error) = self.send_payload(data, remaining == 0) {
            // ESP-AT drops the transmission, so the line is back in command mode
            self.mode = TransferMode::Command;
            return Err(error);
        }

        Ok(data.len())
    }

    fn read_socket(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        self.process_urc_messages();

        if self.session.overflow {
            self.session.overflow = false;
            return Err(Error::ReceiveOverflow);
        }

        Ok(self.session.drain_data(buffer))
    }

    fn get_dns(&mut self, hostname: &str) -> Result<Ip, Error> {
        self.assert_command_mode()?;

        let domain = String::try_from(hostname).map_err(|_| Error::HostnameTooLong)?;
        let response = self.send_command(ResolveDomainCommand::new(domain))?;

        let address = core::str::from_utf8(response.unquoted()).map_err(|_| Error::InvalidDnsResponse)?;
        if address.is_empty() {
            return Err(Error::InvalidDnsResponse);
        }

        Ok(Ip::parse(address))
    }

    fn is_socket_open(&mut self) -> bool {
        self.process_urc_messages();
        self.session.socket_open
    }

    fn remote_peer(&mut self) -> Option<(Ip, u16)> {
        self.process_urc_messages();
        self.session.peer.clone()
    }
}
