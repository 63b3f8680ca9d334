use atat::digest::ParseError;
use atat::heapless::{String, Vec};
use atat::{AtatUrc, Parser};

/// Max. length of the +IPD header, e.g. `+IPD,2048,"xxxx:xxxx:xxxx:xxxx:xxxx:xxxx:xxxx:xxxx",65535:`
const MAX_DATA_HEADER_LEN: usize = 64;

/// Max. payload length of a single +IPD notification sent by ESP-AT
const MAX_DATA_LEN: usize = 2048;

/// Lines which are matched as URC message
const LINE_NEEDLES: [&[u8]; 9] = [
    b"ready",
    b"CONNECT",
    b"CLOSED",
    b"ALREADY CONNECTED",
    b"SEND OK",
    b"SEND FAIL",
    b"WIFI CONNECTED",
    b"WIFI DISCONNECT",
    b"WIFI GOT IP",
];

/// URC definitions, needs to passed as generic of [AtDigester](atat::digest::AtDigester): `AtDigester<URCMessages>`
///
/// RX_SIZE: Max. payload size of a single data notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum URCMessages<const RX_SIZE: usize> {
    /// Modem is ready for receiving AT commands
    Ready,
    /// WIFi connection state changed to to connected
    WifiConnected,
    /// Wifi connection state changed to disconnected
    WifiDisconnected,
    /// Received an IP from the access point
    ReceivedIP,
    /// Socket connected
    SocketConnected,
    /// Socket closed
    SocketClosed,
    /// Connect was rejected, as the socket is already connected
    AlreadyConnected,
    /// Confirmation that the given number of bytes have been received by ESP-AT
    ReceivedBytes(usize),
    /// Transmission of socket data was successful
    SendConfirmation,
    /// Transmission of socket data failed
    SendFail,
    /// Socket data received by +IPD notification
    Data(ReceivedData<RX_SIZE>),
    /// Socket data of the given length was received, but exceeds RX_SIZE
    DataOverflow(usize),
    /// Unknown URC message
    Unknown,
}

/// Payload of a +IPD notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedData<const RX_SIZE: usize> {
    /// Sender, if remote info is enabled by CIPDINFO command
    pub remote: Option<RemotePeer>,

    /// Received bytes
    pub data: Vec<u8, RX_SIZE>,
}

/// Sender of received data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemotePeer {
    /// Textual IP address
    pub address: String<39>,

    /// Remote port
    pub port: u16,
}

impl<const RX_SIZE: usize> AtatUrc for URCMessages<RX_SIZE> {
    type Response = Self;

    fn parse(resp: &[u8]) -> Option<Self::Response> {
        if resp.starts_with(b"+IPD,") {
            return Some(Self::parse_data(resp));
        }

        let line = resp.strip_suffix(b"\r\n").unwrap_or(resp);

        let message = match line {
            b"ready" => Self::Ready,
            b"CONNECT" => Self::SocketConnected,
            b"CLOSED" => Self::SocketClosed,
            b"ALREADY CONNECTED" => Self::AlreadyConnected,
            b"SEND OK" => Self::SendConfirmation,
            b"SEND FAIL" => Self::SendFail,
            b"WIFI CONNECTED" => Self::WifiConnected,
            b"WIFI DISCONNECT" => Self::WifiDisconnected,
            b"WIFI GOT IP" => Self::ReceivedIP,
            _ => match parse_receive_byte_count(line) {
                Some(count) => Self::ReceivedBytes(count),
                None => Self::Unknown,
            },
        };

        Some(message)
    }
}

impl<const RX_SIZE: usize> URCMessages<RX_SIZE> {
    /// Parses a complete +IPD notification, e.g. `+IPD,4,"10.0.0.1",5000:data`
    fn parse_data(resp: &[u8]) -> Self {
        let Some(header_end) = find_header_end(resp) else {
            return Self::Unknown;
        };

        let mut fields = resp[5..header_end].split(|byte| *byte == b',');
        let Some(length) = fields.next().and_then(parse_number::<usize>) else {
            return Self::Unknown;
        };

        let remote = match (fields.next(), fields.next()) {
            (Some(address), Some(port)) => parse_remote_peer(address, port),
            _ => None,
        };

        let payload = &resp[header_end + 1..];
        let payload = &payload[..length.min(payload.len())];

        match Vec::from_slice(payload) {
            Ok(data) => Self::Data(ReceivedData { remote, data }),
            Err(_) => Self::DataOverflow(length),
        }
    }
}

impl<const RX_SIZE: usize> Parser for URCMessages<RX_SIZE> {
    fn parse(buf: &[u8]) -> Result<(&[u8], usize), ParseError> {
        let mut start = 0;
        while buf[start..].starts_with(b"\r\n") {
            start += 2;
        }

        let rest = &buf[start..];
        if rest.is_empty() {
            return Err(ParseError::Incomplete);
        }

        if rest.starts_with(b"+IPD,") {
            return match_data_frame(buf, start);
        }

        let Some(line_length) = rest.windows(2).position(|window| window == b"\r\n") else {
            if is_partial_urc(rest) {
                return Err(ParseError::Incomplete);
            }

            return Err(ParseError::NoMatch);
        };

        let line = &rest[..line_length];
        if LINE_NEEDLES.iter().any(|needle| *needle == line)
            || line.starts_with(b"WIFI ")
            || parse_receive_byte_count(line).is_some()
        {
            let end = start + line_length + 2;
            return Ok((&buf[start..end], end));
        }

        Err(ParseError::NoMatch)
    }
}

/// Matches a +IPD notification starting at the given index. The notification is incomplete until
/// the announced payload length was received. Lengths above [MAX_DATA_LEN] are no match.
fn match_data_frame(buf: &[u8], start: usize) -> Result<(&[u8], usize), ParseError> {
    let rest = &buf[start..];

    let Some(header_end) = find_header_end(rest) else {
        if rest.len() > MAX_DATA_HEADER_LEN {
            return Err(ParseError::NoMatch);
        }

        return Err(ParseError::Incomplete);
    };

    let length_field = rest[5..header_end].split(|byte| *byte == b',').next().unwrap_or_default();
    let length = parse_number::<usize>(length_field).ok_or(ParseError::NoMatch)?;
    if length > MAX_DATA_LEN {
        return Err(ParseError::NoMatch);
    }

    let end = (start + header_end + 1).checked_add(length).ok_or(ParseError::NoMatch)?;
    if buf.len() < end {
        return Err(ParseError::Incomplete);
    }

    Ok((&buf[start..end], end))
}

/// Returns the index of the colon terminating the +IPD header. Colons of quoted IPv6 addresses are skipped.
fn find_header_end(data: &[u8]) -> Option<usize> {
    let mut quoted = false;

    for (index, byte) in data.iter().enumerate().take(MAX_DATA_HEADER_LEN + 1) {
        match byte {
            b'"' => quoted = !quoted,
            b':' if !quoted => return Some(index),
            _ => {}
        }
    }

    None
}

/// Returns true if the given (unterminated) data may still become a URC message
fn is_partial_urc(data: &[u8]) -> bool {
    if b"+IPD,".starts_with(data) || data.starts_with(b"Recv ") || data.starts_with(b"WIFI ") {
        return true;
    }

    LINE_NEEDLES.iter().any(|needle| needle.starts_with(data))
}

/// Tries to parse the N byte count of 'Recv N bytes'
fn parse_receive_byte_count(line: &[u8]) -> Option<usize> {
    let count = line.strip_prefix(b"Recv ")?.strip_suffix(b" bytes")?;
    parse_number(count)
}

/// Parses the address and port fields of a +IPD header
fn parse_remote_peer(address: &[u8], port: &[u8]) -> Option<RemotePeer> {
    let address = match address {
        [b'"', inner @ .., b'"'] => inner,
        _ => address,
    };

    let address = core::str::from_utf8(address).ok()?;

    Some(RemotePeer {
        address: String::try_from(address).ok()?,
        port: parse_number(port)?,
    })
}

/// Parses a decimal ASCII number
fn parse_number<N: core::str::FromStr>(digits: &[u8]) -> Option<N> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    core::str::from_utf8(digits).ok()?.parse().ok()
}
