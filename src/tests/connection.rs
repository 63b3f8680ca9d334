use crate::address::{parse_ip, TcpAddr, UdpAddr};
use crate::connection::Deadline;
use crate::device::{Device, Error};
use crate::tests::mock::{MockTransport, TransportError};
use mockall::predicate::eq;
use mockall::Sequence;

/// Returns a transport mock accepting any number of connects and disconnects
fn connectable_transport() -> MockTransport {
    let mut transport = MockTransport::new();
    transport.expect_disconnect_socket().returning(|| Ok(()));
    transport.expect_connect_tcp_socket().returning(|_, _| Ok(()));
    transport.expect_connect_udp_socket().returning(|_, _, _| Ok(()));
    transport.expect_is_socket_open().returning(|| true);
    transport
}

fn remote() -> TcpAddr {
    TcpAddr::new(parse_ip("10.0.0.1"), 21)
}

#[test]
fn test_write_announces_then_pushes() {
    let mut transport = connectable_transport();
    let mut sequence = Sequence::new();
    transport
        .expect_start_socket_send()
        .with(eq(5))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    transport
        .expect_write()
        .with(eq(&b"hello"[..]))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|data| Ok(data.len()));

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    assert_eq!(5, connection.write(b"hello").unwrap());
}

#[test]
fn test_write_large_buffer_single_announcement() {
    let mut transport = connectable_transport();
    let mut sequence = Sequence::new();
    transport
        .expect_start_socket_send()
        .with(eq(1500))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    transport
        .expect_write()
        .withf(|data| data.len() == 1500)
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|data| Ok(data.len()));

    let device = Device::new(transport);
    let mut connection = device.dial_udp(UdpAddr::with_port(1), UdpAddr::new(parse_ip("10.0.0.2"), 2)).unwrap();

    assert_eq!(1500, connection.write(&[0xAA; 1500]).unwrap());
}

#[test]
fn test_write_empty_buffer() {
    let device = Device::new(connectable_transport());
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    assert_eq!(0, connection.write(&[]).unwrap());
}

#[test]
fn test_write_announce_error() {
    let mut transport = connectable_transport();
    transport
        .expect_start_socket_send()
        .times(1)
        .returning(|_| Err(TransportError::CommandFailed));

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    assert_eq!(
        Error::Transport(TransportError::CommandFailed),
        connection.write(b"hello").unwrap_err()
    );
}

#[test]
fn test_write_push_error() {
    let mut transport = connectable_transport();
    transport.expect_start_socket_send().times(1).returning(|_| Ok(()));
    transport
        .expect_write()
        .times(1)
        .returning(|_| Err(TransportError::CommandFailed));

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    assert_eq!(
        Error::Transport(TransportError::CommandFailed),
        connection.write(b"hello").unwrap_err()
    );
}

#[test]
fn test_read_buffered_data() {
    let mut transport = connectable_transport();
    transport
        .expect_read_socket()
        .times(1)
        .returning(|buffer| {
            buffer[..4].copy_from_slice(b"pong");
            Ok(4)
        });

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    let mut buffer = [0x0; 16];
    assert_eq!(4, connection.read(&mut buffer).unwrap());
    assert_eq!(b"pong", &buffer[..4]);
}

#[test]
fn test_read_no_data_would_block() {
    let mut transport = connectable_transport();
    transport.expect_read_socket().times(1).returning(|_| Ok(0));

    let device = Device::new(transport);
    let mut connection = device.listen_udp(UdpAddr::with_port(9000)).unwrap();

    assert_eq!(nb::Error::WouldBlock, connection.read(&mut [0x0; 16]).unwrap_err());
}

#[test]
fn test_read_end_of_stream_after_remote_close() {
    let mut transport = MockTransport::new();
    transport.expect_disconnect_socket().returning(|| Ok(()));
    transport.expect_connect_tcp_socket().returning(|_, _| Ok(()));
    transport.expect_is_socket_open().returning(|| false);

    let mut sequence = Sequence::new();
    transport
        .expect_read_socket()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|buffer| {
            buffer[..3].copy_from_slice(b"bye");
            Ok(3)
        });
    transport
        .expect_read_socket()
        .times(2)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(0));

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();
    let mut buffer = [0x0; 8];

    // Buffered data is drained first
    assert_eq!(3, connection.read(&mut buffer).unwrap());
    assert_eq!(b"bye", &buffer[..3]);

    assert_eq!(0, connection.read(&mut buffer).unwrap());
    assert_eq!(0, embedded_io::Read::read(&mut connection, &mut buffer).unwrap());
}

#[test]
fn test_read_empty_buffer() {
    let device = Device::new(connectable_transport());
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    assert_eq!(0, connection.read(&mut []).unwrap());
}

#[test]
fn test_read_error_propagated() {
    let mut transport = connectable_transport();
    transport
        .expect_read_socket()
        .times(1)
        .returning(|_| Err(TransportError::CommandFailed));

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    assert_eq!(
        nb::Error::Other(Error::Transport(TransportError::CommandFailed)),
        connection.read(&mut [0x0; 16]).unwrap_err()
    );
}

#[test]
fn test_read_write_after_close() {
    let device = Device::new(connectable_transport());
    let mut connection = device.dial_tcp(None, remote()).unwrap().into_inner();
    assert!(connection.is_open());

    device.dial_tcp(None, remote()).unwrap().close();

    assert!(!connection.is_open());
    assert_eq!(Error::SocketClosed, connection.write(b"data").unwrap_err());
    assert_eq!(
        nb::Error::Other(Error::SocketClosed),
        connection.read(&mut [0x0; 4]).unwrap_err()
    );
}

#[test]
fn test_deadlines_accepted_without_effect() {
    let mut transport = connectable_transport();
    let mut sequence = Sequence::new();
    transport
        .expect_read_socket()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(0));
    transport
        .expect_read_socket()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(0));

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();
    let mut buffer = [0x0; 8];

    assert_eq!(nb::Error::WouldBlock, connection.read(&mut buffer).unwrap_err());

    connection.set_deadline(Some(Deadline::from_ticks(1_000))).unwrap();
    connection.set_read_deadline(Some(Deadline::from_ticks(0))).unwrap();
    connection.set_write_deadline(None).unwrap();

    assert_eq!(nb::Error::WouldBlock, connection.read(&mut buffer).unwrap_err());
    assert!(!connection.into_inner().supports_deadlines());
}

#[test]
fn test_embedded_io_write_all() {
    let mut transport = connectable_transport();
    let mut sequence = Sequence::new();
    transport
        .expect_start_socket_send()
        .with(eq(6))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    transport
        .expect_write()
        .with(eq(&b"hallo!"[..]))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|data| Ok(data.len()));

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    embedded_io::Write::write_all(&mut connection, b"hallo!").unwrap();
    embedded_io::Write::flush(&mut connection).unwrap();
}

#[test]
fn test_embedded_io_write_all_not_split() {
    let mut transport = connectable_transport();
    transport
        .expect_start_socket_send()
        .with(eq(2049))
        .times(1)
        .returning(|_| Err(TransportError::CommandFailed));

    let device = Device::new(transport);
    let mut connection = device.dial_tcp(None, remote()).unwrap();

    let error = embedded_io::Write::write_all(&mut connection, &[0x0; 2049]).unwrap_err();
    assert_eq!(Error::Transport(TransportError::CommandFailed), error);
}

#[test]
fn test_embedded_io_read_blocks_until_data() {
    let mut transport = connectable_transport();
    let mut sequence = Sequence::new();
    transport
        .expect_read_socket()
        .times(2)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(0));
    transport
        .expect_read_socket()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|buffer| {
            buffer[..3].copy_from_slice(b"abc");
            Ok(3)
        });

    let device = Device::new(transport);
    let mut connection = device.listen_udp(UdpAddr::with_port(9000)).unwrap();

    let mut buffer = [0x0; 8];
    assert_eq!(3, embedded_io::Read::read(&mut connection, &mut buffer).unwrap());
    assert_eq!(b"abc", &buffer[..3]);
}

#[test]
fn test_embedded_io_error_kind() {
    use embedded_io::{Error as _, ErrorKind};

    assert_eq!(ErrorKind::NotConnected, Error::<TransportError>::SocketClosed.kind());
    assert_eq!(ErrorKind::ConnectionAborted, Error::<TransportError>::SocketReplaced.kind());
    assert_eq!(ErrorKind::Unsupported, Error::<TransportError>::Unsupported.kind());
    assert_eq!(ErrorKind::Other, Error::Transport(TransportError::CommandFailed).kind());
}
