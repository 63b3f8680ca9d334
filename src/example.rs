//! Mocks for doc examples
use crate::address::Ip;
use crate::transport::Transport;
use alloc::collections::VecDeque;

/// Transport mock answering a fixed conversation
#[derive(Default)]
pub struct ExampleTransport {
    /// Data returned by the next reads
    received: VecDeque<u8>,

    /// Announced byte count of the pending transmission
    announced: Option<usize>,
}

impl Transport for ExampleTransport {
    type Error = ();

    fn connect_tcp_socket(&mut self, _remote_address: &str, _remote_port: u16) -> Result<(), ()> {
        Ok(())
    }

    fn connect_udp_socket(&mut self, _remote_address: &str, _remote_port: u16, _local_port: u16) -> Result<(), ()> {
        Ok(())
    }

    fn disconnect_socket(&mut self) -> Result<(), ()> {
        self.received.clear();
        Ok(())
    }

    fn start_socket_send(&mut self, length: usize) -> Result<(), ()> {
        self.announced = Some(length);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        if self.announced.take() != Some(data.len()) {
            return Err(());
        }

        if data == b"hallo!" {
            self.received.extend(b"nice to see you!");
        }

        Ok(data.len())
    }

    fn read_socket(&mut self, buffer: &mut [u8]) -> Result<usize, ()> {
        let length = buffer.len().min(self.received.len());

        for (slot, byte) in buffer.iter_mut().zip(self.received.drain(..length)) {
            *slot = byte;
        }

        Ok(length)
    }

    fn get_dns(&mut self, hostname: &str) -> Result<Ip, ()> {
        match hostname {
            "example.com" => Ok(Ip::parse("93.184.216.34")),
            _ => Err(()),
        }
    }
}
