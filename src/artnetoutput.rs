//! ArtDMX output session: one UDP datagram per frame, 18 byte header plus
//! the 512 channel bytes.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::{DmxError, Result};
use crate::framebuffer::DMX_SLOTS;

/// Default Art-Net UDP port.
pub const ARTNET_PORT: u16 = 6454;

const ARTDMX_HEADER: usize = 18;
const PACKET_LEN: usize = ARTDMX_HEADER + DMX_SLOTS;
const OP_DMX: u16 = 0x5000;
const PROTOCOL_VERSION: u16 = 14;
// A wedged send must resolve well inside the shutdown grace period.
const SEND_TIMEOUT: Duration = Duration::from_millis(200);

pub struct ArtnetOutput {
    sock: UdpSocket,
    target: SocketAddr,
    universe: u16,
    sequence: u8,
}

impl ArtnetOutput {
    /// Opens the outbound session. `endpoint` is `host` or `host:port`,
    /// dotted-quad or hostname; 255.255.255.255 broadcasts to the segment.
    pub fn new(endpoint: &str, universe: u16) -> Result<ArtnetOutput> {
        let target = resolve_endpoint(endpoint)?;
        let sock = UdpSocket::bind("0.0.0.0:0")
            .map_err(|err| DmxError::ConnectFailed(err.to_string()))?;
        sock.set_broadcast(true)
            .map_err(|err| DmxError::ConnectFailed(err.to_string()))?;
        sock.set_write_timeout(Some(SEND_TIMEOUT))
            .map_err(|err| DmxError::ConnectFailed(err.to_string()))?;

        log::info!("Art-Net session open: universe {} -> {}", universe, target);

        Ok(ArtnetOutput {
            sock,
            target,
            universe,
            sequence: 1,
        })
    }

    /// Ships one frame as a single ArtDMX datagram. Fire and forget, the
    /// node never acknowledges.
    pub fn send_frame(&mut self, frame: &[u8; DMX_SLOTS]) -> Result<()> {
        let packet = self.encode(frame);
        self.sock.send_to(&packet, self.target)?;
        // Sequence 0 tells nodes to disable ordering checks, skip over it.
        self.sequence = match self.sequence.wrapping_add(1) {
            0 => 1,
            seq => seq,
        };
        Ok(())
    }

    fn encode(&self, frame: &[u8; DMX_SLOTS]) -> [u8; PACKET_LEN] {
        let mut packet = [0u8; PACKET_LEN];
        packet[0..8].copy_from_slice(b"Art-Net\0");
        packet[8..10].copy_from_slice(&OP_DMX.to_le_bytes());
        packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        packet[12] = self.sequence;
        packet[13] = 0; // physical input port, unused
        // Port-address, 15 bit: low byte SubSwitch << 4 | Universe, high byte Net.
        packet[14..16].copy_from_slice(&(self.universe & 0x7fff).to_le_bytes());
        packet[16..18].copy_from_slice(&(DMX_SLOTS as u16).to_be_bytes());
        packet[ARTDMX_HEADER..].copy_from_slice(frame);
        packet
    }
}

fn resolve_endpoint(endpoint: &str) -> Result<SocketAddr> {
    let with_port = if endpoint.contains(':') {
        endpoint.to_string()
    } else {
        format!("{}:{}", endpoint, ARTNET_PORT)
    };
    with_port.to_socket_addrs()
        .map_err(|err| DmxError::ConnectFailed(format!("{}: {}", endpoint, err)))?
        .next()
        .ok_or_else(|| DmxError::ConnectFailed(format!("{}: no usable address", endpoint)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_receiver() -> (UdpSocket, String) {
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        sock.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
        let endpoint = format!("127.0.0.1:{}", sock.local_addr().unwrap().port());
        (sock, endpoint)
    }

    #[test]
    fn packet_structure() {
        let (_receiver, endpoint) = local_receiver();
        let output = ArtnetOutput::new(&endpoint, 0x0134).unwrap();

        let mut frame = [0u8; DMX_SLOTS];
        frame[0] = 255;
        frame[511] = 7;
        let packet = output.encode(&frame);

        assert_eq!(packet.len(), ARTDMX_HEADER + DMX_SLOTS);
        assert_eq!(&packet[0..8], b"Art-Net\0");
        // OpCode ArtDmx, little-endian
        assert_eq!(packet[8], 0x00);
        assert_eq!(packet[9], 0x50);
        // Protocol version 14, big-endian
        assert_eq!(packet[10], 0);
        assert_eq!(packet[11], 14);
        assert_eq!(packet[12], 1);
        assert_eq!(packet[13], 0);
        // Universe 0x0134: SubSwitch 3, Universe 4, Net 1
        assert_eq!(packet[14], 0x34);
        assert_eq!(packet[15], 0x01);
        // Length 512, big-endian
        assert_eq!(packet[16], 0x02);
        assert_eq!(packet[17], 0x00);
        assert_eq!(packet[18], 255);
        assert_eq!(packet[529], 7);
    }

    #[test]
    fn frames_arrive_with_incrementing_sequence() {
        let (receiver, endpoint) = local_receiver();
        let mut output = ArtnetOutput::new(&endpoint, 0).unwrap();

        let mut frame = [0u8; DMX_SLOTS];
        frame[9] = 42;
        output.send_frame(&frame).unwrap();
        output.send_frame(&frame).unwrap();

        let mut buf = [0u8; 1024];
        let first = receiver.recv(&mut buf).unwrap();
        assert_eq!(first, ARTDMX_HEADER + DMX_SLOTS);
        assert_eq!(&buf[0..8], b"Art-Net\0");
        assert_eq!(buf[12], 1);
        assert_eq!(buf[18 + 9], 42);

        let second = receiver.recv(&mut buf).unwrap();
        assert_eq!(second, ARTDMX_HEADER + DMX_SLOTS);
        assert_eq!(buf[12], 2);
    }

    #[test]
    fn sequence_skips_zero_on_wrap() {
        let (receiver, endpoint) = local_receiver();
        let mut output = ArtnetOutput::new(&endpoint, 0).unwrap();
        output.sequence = 255;

        let frame = [0u8; DMX_SLOTS];
        output.send_frame(&frame).unwrap();
        output.send_frame(&frame).unwrap();

        let mut buf = [0u8; 1024];
        receiver.recv(&mut buf).unwrap();
        assert_eq!(buf[12], 255);
        receiver.recv(&mut buf).unwrap();
        assert_eq!(buf[12], 1);
    }

    #[test]
    fn default_port_is_appended() {
        assert!(ArtnetOutput::new("127.0.0.1", 0).is_ok());
    }

    #[test]
    fn malformed_endpoint_is_connect_failed() {
        let result = ArtnetOutput::new("127.0.0.1:not-a-port", 0);
        assert!(matches!(result, Err(DmxError::ConnectFailed(_))));
    }
}
