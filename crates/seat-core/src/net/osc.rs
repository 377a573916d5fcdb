//! OSC over UDP, fire and forget
//!
//! Each message is encoded with `rosc` and written as a single datagram. No
//! acknowledgment is expected; a send error surfaces only local failures
//! (unroutable address, closed socket).

use crate::error::{Result, SeatError};
use rosc::{OscMessage, OscPacket};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

pub use rosc::OscType;

/// A send-only OSC destination
pub trait OscSink {
    /// Send one message to this destination
    fn send(&self, address: &str, args: Vec<OscType>) -> Result<()>;
}

/// Encode a single OSC message into datagram bytes
pub fn encode_message(address: &str, args: Vec<OscType>) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args,
    });
    rosc::encoder::encode(&packet).map_err(|e| SeatError::Encode(format!("{:?}", e)))
}

/// UDP client bound to an ephemeral local port, sending to one target
#[derive(Debug)]
pub struct UdpOscClient {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpOscClient {
    /// Bind an ephemeral socket of the target's address family
    pub fn connect(target: SocketAddr) -> Result<Self> {
        let local: SocketAddr = match target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        tracing::debug!(dest = %target, "Opened OSC client");
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl OscSink for UdpOscClient {
    fn send(&self, address: &str, args: Vec<OscType>) -> Result<()> {
        tracing::trace!(dest = %self.target, address, ?args, "OSC send");
        let bytes = encode_message(address, args)?;
        self.socket
            .send_to(&bytes, self.target)
            .map_err(|source| SeatError::Send {
                address: address.to_string(),
                source,
            })?;
        Ok(())
    }
}
