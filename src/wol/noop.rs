use crate::wol::{MagicPacket, Transmit};
use log::info;
use std::io;
use std::net::SocketAddr;

pub struct LogOnlyTransmitter;

impl Transmit for LogOnlyTransmitter {
    fn transmit(&self, packet: &MagicPacket, addr: SocketAddr) -> io::Result<()> {
        info!(
            "faking {} byte magic packet to {}",
            packet.as_bytes().len(),
            addr
        );
        Ok(())
    }
}
