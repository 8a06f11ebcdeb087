use std::net::UdpSocket;
use std::time::Duration;

use super::{InputError, Submission};

/// UDP listener for JSON-encoded submissions
///
/// Each datagram carries one `{"username": ..., "ip": ..., "status": ...}`
/// object.
pub struct UdpIngestListener {
    socket: UdpSocket,
    buffer: [u8; 1024],
}

impl UdpIngestListener {
    /// Create a new listener bound to the given address
    pub fn new(address: &str) -> Result<Self, InputError> {
        let socket = UdpSocket::bind(address)?;
        socket.set_read_timeout(Some(Duration::from_secs(1)))?;

        Ok(UdpIngestListener {
            socket,
            buffer: [0; 1024],
        })
    }

    /// Read one raw datagram (non-blocking; `None` when nothing is waiting)
    pub fn read_message(&mut self) -> Result<Option<String>, InputError> {
        match self.socket.recv_from(&mut self.buffer) {
            Ok((size, _addr)) => {
                let message = String::from_utf8_lossy(&self.buffer[..size]).to_string();
                Ok(Some(message))
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut
                {
                    Ok(None)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Parse a datagram payload into a submission
    pub fn parse_submission(message: &str) -> Result<Submission, InputError> {
        Ok(serde_json::from_str(message)?)
    }
}
