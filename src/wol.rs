pub mod noop;

use crate::mac::MacAddress;
use crate::target::{Destination, WakeTarget};
use log::debug;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};

const SYNCHRONIZATION_SCHEME: [u8; 6] = [0xff; 6];
const MAC_REPETITIONS: usize = 16;
pub const PACKET_LEN: usize = SYNCHRONIZATION_SCHEME.len() + 6 * MAC_REPETITIONS;

pub const DEFAULT_PORT: u16 = 9;
pub const DEFAULT_BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

/// 6 bytes of 0xFF followed by the hardware address 16 times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MagicPacket([u8; PACKET_LEN]);

impl MagicPacket {
    pub fn new(mac: MacAddress) -> Self {
        let mut data = [0u8; PACKET_LEN];
        let (sync, body) = data.split_at_mut(SYNCHRONIZATION_SCHEME.len());
        sync.copy_from_slice(&SYNCHRONIZATION_SCHEME);
        for chunk in body.chunks_exact_mut(6) {
            chunk.copy_from_slice(&mac.octets());
        }
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not resolve {destination}")]
    Resolve {
        destination: String,
        #[source]
        source: io::Error,
    },
    #[error("{destination} has no IPv4 address")]
    NoIpv4Address { destination: String },
    #[error("sending to {addr} failed")]
    Transmission {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Puts one magic packet on the wire.
pub trait Transmit {
    fn transmit(&self, packet: &MagicPacket, addr: SocketAddr) -> io::Result<()>;
}

impl<T: Transmit + ?Sized> Transmit for Box<T> {
    fn transmit(&self, packet: &MagicPacket, addr: SocketAddr) -> io::Result<()> {
        (**self).transmit(packet, addr)
    }
}

impl<T: Transmit + ?Sized> Transmit for &T {
    fn transmit(&self, packet: &MagicPacket, addr: SocketAddr) -> io::Result<()> {
        (**self).transmit(packet, addr)
    }
}

/// Sends each packet from a fresh broadcast-enabled socket.
pub struct UdpTransmitter;

impl Transmit for UdpTransmitter {
    fn transmit(&self, packet: &MagicPacket, addr: SocketAddr) -> io::Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        // Without SO_BROADCAST, sends to a broadcast address fail with EACCES.
        socket.set_broadcast(true)?;
        let sent = socket.send_to(packet.as_bytes(), addr)?;
        if sent != PACKET_LEN {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {sent} of {PACKET_LEN} bytes"),
            ));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub broadcast_addr: Ipv4Addr,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broadcast_addr: DEFAULT_BROADCAST_ADDR,
            port: DEFAULT_PORT,
        }
    }
}

pub struct Sender<T> {
    config: Config,
    transmitter: T,
}

impl<T: Transmit> Sender<T> {
    pub fn new(config: Config, transmitter: T) -> Self {
        Self {
            config,
            transmitter,
        }
    }

    /// The address the packet for `target` goes to.
    pub fn resolve(&self, target: &WakeTarget) -> Result<SocketAddr, Error> {
        match &target.destination {
            None => Ok(SocketAddrV4::new(self.config.broadcast_addr, self.config.port).into()),
            Some(Destination::Ip(ip)) => Ok(SocketAddrV4::new(*ip, self.config.port).into()),
            Some(Destination::Host(host)) => {
                let mut addrs = (host.as_str(), self.config.port)
                    .to_socket_addrs()
                    .map_err(|source| Error::Resolve {
                        destination: host.clone(),
                        source,
                    })?;
                addrs
                    .find(SocketAddr::is_ipv4)
                    .ok_or_else(|| Error::NoIpv4Address {
                        destination: host.clone(),
                    })
            }
        }
    }

    /// Sends exactly one packet. Returns where it went.
    pub fn wake(&self, target: &WakeTarget) -> Result<SocketAddr, Error> {
        let addr = self.resolve(target)?;
        let packet = MagicPacket::new(target.mac);
        debug!("sending {} byte magic packet for {} to {}", PACKET_LEN, target.mac, addr);
        self.transmitter
            .transmit(&packet, addr)
            .map_err(|source| Error::Transmission { addr, source })?;
        Ok(addr)
    }
}
