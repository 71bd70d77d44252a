//! IPv4 and ICMP header records, read and written through pnet packet views.

use crate::checksum::checksum;
use pnet_packet::icmp::{IcmpCode, IcmpPacket, IcmpType, MutableIcmpPacket};
use pnet_packet::ip::IpNextHeaderProtocol;
use pnet_packet::ipv4::{Ipv4Flags, Ipv4Packet, MutableIpv4Packet};
use pnet_packet::Packet;
use std::net::Ipv4Addr;
use traceroute_core::TracerouteError;

/// Length of an IPv4 header without options.
pub const IPV4_HEADER_LEN: usize = 20;
/// Length of the ICMP header common to every message type.
pub const ICMP_HEADER_LEN: usize = 8;

/// IP protocol number for ICMP.
pub const IPPROTO_ICMP: u8 = 1;

pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_TIME_EXCEEDED: u8 = 11;

/// IPv4 header (RFC 791).
///
/// Options are not modelled: [`Ipv4Header::write`] always writes a 20-byte
/// header, while [`Ipv4Header::decode`] accepts and skips options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub tos: u8,
    pub total_length: u16,
    pub identification: u16,
    pub dont_fragment: bool,
    pub more_fragments: bool,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Writes the header into the start of `buf` with a freshly computed
    /// header checksum.
    pub fn write(&self, buf: &mut [u8]) -> Result<(), TracerouteError> {
        let actual = buf.len();
        let mut packet = MutableIpv4Packet::new(buf).ok_or(TracerouteError::PacketTooShort {
            expected: IPV4_HEADER_LEN,
            actual,
        })?;

        let mut flags = 0;
        if self.dont_fragment {
            flags |= Ipv4Flags::DontFragment;
        }
        if self.more_fragments {
            flags |= Ipv4Flags::MoreFragments;
        }

        packet.set_version(4);
        packet.set_header_length((IPV4_HEADER_LEN / 4) as u8);
        packet.set_dscp(self.tos >> 2);
        packet.set_ecn(self.tos & 0x03);
        packet.set_total_length(self.total_length);
        packet.set_identification(self.identification);
        packet.set_flags(flags);
        packet.set_fragment_offset(self.fragment_offset);
        packet.set_ttl(self.ttl);
        packet.set_next_level_protocol(IpNextHeaderProtocol::new(self.protocol));
        packet.set_source(self.source);
        packet.set_destination(self.destination);
        packet.set_checksum(0);

        let sum = checksum(&packet.packet()[..IPV4_HEADER_LEN]);
        packet.set_checksum(sum);
        Ok(())
    }

    /// Encodes the header with a freshly computed header checksum.
    pub fn encode_with_checksum(&self) -> Result<[u8; IPV4_HEADER_LEN], TracerouteError> {
        let mut buf = [0u8; IPV4_HEADER_LEN];
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Decodes a header from the start of `buf`.
    ///
    /// Returns the header and its length in bytes, including options.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), TracerouteError> {
        let packet = Ipv4Packet::new(buf).ok_or(TracerouteError::PacketTooShort {
            expected: IPV4_HEADER_LEN,
            actual: buf.len(),
        })?;

        let version = packet.get_version();
        if version != 4 {
            return Err(TracerouteError::PacketParseFailed {
                layer: "IPv4",
                reason: format!("unexpected IP version {}", version),
            });
        }

        let header_len = usize::from(packet.get_header_length()) * 4;
        if header_len < IPV4_HEADER_LEN {
            return Err(TracerouteError::PacketParseFailed {
                layer: "IPv4",
                reason: format!("header length {} below minimum", header_len),
            });
        }
        if buf.len() < header_len {
            return Err(TracerouteError::PacketTooShort {
                expected: header_len,
                actual: buf.len(),
            });
        }

        let flags = packet.get_flags();
        let header = Self {
            tos: (packet.get_dscp() << 2) | packet.get_ecn(),
            total_length: packet.get_total_length(),
            identification: packet.get_identification(),
            dont_fragment: flags & Ipv4Flags::DontFragment != 0,
            more_fragments: flags & Ipv4Flags::MoreFragments != 0,
            fragment_offset: packet.get_fragment_offset(),
            ttl: packet.get_ttl(),
            protocol: packet.get_next_level_protocol().0,
            checksum: packet.get_checksum(),
            source: packet.get_source(),
            destination: packet.get_destination(),
        };

        Ok((header, header_len))
    }
}

/// The 8-byte ICMP header (RFC 792).
///
/// `rest` holds bytes 4-7, whose meaning depends on the message type. For
/// echo messages they carry the identifier and sequence number; for error
/// messages they are unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub rest: [u8; 4],
}

impl IcmpHeader {
    /// Header for an echo request or reply.
    pub fn echo(icmp_type: u8, identifier: u16, sequence: u16) -> Self {
        let [id_hi, id_lo] = identifier.to_be_bytes();
        let [seq_hi, seq_lo] = sequence.to_be_bytes();
        Self {
            icmp_type,
            code: 0,
            checksum: 0,
            rest: [id_hi, id_lo, seq_hi, seq_lo],
        }
    }

    pub fn identifier(&self) -> u16 {
        u16::from_be_bytes([self.rest[0], self.rest[1]])
    }

    pub fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.rest[2], self.rest[3]])
    }

    /// Writes the header followed by `payload` into `buf`, with the checksum
    /// computed over both. Returns the number of bytes written.
    pub fn write(&self, buf: &mut [u8], payload: &[u8]) -> Result<usize, TracerouteError> {
        let len = ICMP_HEADER_LEN + payload.len();
        if buf.len() < len {
            return Err(TracerouteError::PacketTooShort {
                expected: len,
                actual: buf.len(),
            });
        }

        let buf_len = buf.len();
        let mut packet = MutableIcmpPacket::new(&mut buf[..len]).ok_or(
            TracerouteError::PacketTooShort {
                expected: len,
                actual: buf_len,
            },
        )?;
        let mut body = Vec::with_capacity(self.rest.len() + payload.len());
        body.extend_from_slice(&self.rest);
        body.extend_from_slice(payload);

        packet.set_icmp_type(IcmpType::new(self.icmp_type));
        packet.set_icmp_code(IcmpCode::new(self.code));
        packet.set_checksum(0);
        packet.set_payload(&body);

        let sum = checksum(packet.packet());
        packet.set_checksum(sum);
        Ok(len)
    }

    /// Encodes the header followed by `payload`, with the checksum computed
    /// over both.
    pub fn encode_with_payload(&self, payload: &[u8]) -> Result<Vec<u8>, TracerouteError> {
        let mut buf = vec![0u8; ICMP_HEADER_LEN + payload.len()];
        self.write(&mut buf, payload)?;
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, TracerouteError> {
        let too_short = TracerouteError::PacketTooShort {
            expected: ICMP_HEADER_LEN,
            actual: buf.len(),
        };
        if buf.len() < ICMP_HEADER_LEN {
            return Err(too_short);
        }
        let packet = IcmpPacket::new(buf).ok_or(too_short)?;

        let mut rest = [0u8; 4];
        rest.copy_from_slice(&packet.payload()[..4]);
        Ok(Self {
            icmp_type: packet.get_icmp_type().0,
            code: packet.get_icmp_code().0,
            checksum: packet.get_checksum(),
            rest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_packet::icmp::echo_request::EchoRequestPacket;

    fn sample_ip() -> Ipv4Header {
        Ipv4Header {
            tos: 0,
            total_length: 30,
            identification: 0xbeef,
            dont_fragment: true,
            more_fragments: false,
            fragment_offset: 0,
            ttl: 7,
            protocol: IPPROTO_ICMP,
            checksum: 0,
            source: Ipv4Addr::new(192, 168, 1, 10),
            destination: Ipv4Addr::new(8, 8, 8, 8),
        }
    }

    #[test]
    fn test_ipv4_round_trip() {
        let header = Ipv4Header {
            tos: 0xb8,
            more_fragments: true,
            fragment_offset: 0x0123,
            ..sample_ip()
        };
        let bytes = header.encode_with_checksum().unwrap();
        let (decoded, len) = Ipv4Header::decode(&bytes).unwrap();
        assert_eq!(len, IPV4_HEADER_LEN);
        assert_eq!(
            decoded,
            Ipv4Header {
                checksum: decoded.checksum,
                ..header
            }
        );
        assert_eq!(checksum(&bytes), 0);
    }

    #[test]
    fn test_ipv4_checksum_and_pnet_view() {
        let bytes = sample_ip().encode_with_checksum().unwrap();
        assert_eq!(checksum(&bytes), 0);

        let view = Ipv4Packet::new(&bytes).unwrap();
        assert_eq!(view.get_version(), 4);
        assert_eq!(view.get_header_length(), 5);
        assert_eq!(view.get_total_length(), 30);
        assert_eq!(view.get_identification(), 0xbeef);
        assert_eq!(view.get_flags(), Ipv4Flags::DontFragment);
        assert_eq!(view.get_ttl(), 7);
        assert_eq!(view.get_destination(), Ipv4Addr::new(8, 8, 8, 8));
        assert_eq!(view.get_checksum(), pnet_packet::ipv4::checksum(&view));
    }

    #[test]
    fn test_ipv4_write_rejects_short_buffer() {
        let mut buf = [0u8; 12];
        assert!(matches!(
            sample_ip().write(&mut buf),
            Err(TracerouteError::PacketTooShort { expected: 20, actual: 12 })
        ));
    }

    #[test]
    fn test_ipv4_decode_skips_options() {
        let mut bytes = vec![0u8; 24];
        sample_ip().write(&mut bytes).unwrap();
        bytes[0] = 0x46;
        let (decoded, len) = Ipv4Header::decode(&bytes).unwrap();
        assert_eq!(len, 24);
        assert_eq!(decoded.destination, Ipv4Addr::new(8, 8, 8, 8));
    }

    #[test]
    fn test_ipv4_decode_rejects_bad_input() {
        assert!(matches!(
            Ipv4Header::decode(&[0x45; 10]),
            Err(TracerouteError::PacketTooShort { expected: 20, actual: 10 })
        ));

        let mut v6 = sample_ip().encode_with_checksum().unwrap();
        v6[0] = 0x65;
        assert!(matches!(
            Ipv4Header::decode(&v6),
            Err(TracerouteError::PacketParseFailed { .. })
        ));

        let mut short_ihl = sample_ip().encode_with_checksum().unwrap();
        short_ihl[0] = 0x44;
        assert!(Ipv4Header::decode(&short_ihl).is_err());

        let mut truncated_options = sample_ip().encode_with_checksum().unwrap();
        truncated_options[0] = 0x4f;
        assert!(matches!(
            Ipv4Header::decode(&truncated_options),
            Err(TracerouteError::PacketTooShort { expected: 60, .. })
        ));
    }

    #[test]
    fn test_icmp_echo_encoding() {
        let header = IcmpHeader::echo(ICMP_ECHO_REQUEST, 0x1234, 0x0042);
        let bytes = header.encode_with_payload(&[0xc0, 0xde]).unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(checksum(&bytes), 0);

        let view = EchoRequestPacket::new(&bytes).unwrap();
        assert_eq!(view.get_identifier(), 0x1234);
        assert_eq!(view.get_sequence_number(), 0x0042);
        assert_eq!(view.payload(), &[0xc0, 0xde]);

        let icmp = IcmpPacket::new(&bytes).unwrap();
        assert_eq!(icmp.get_checksum(), pnet_packet::icmp::checksum(&icmp));

        let decoded = IcmpHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.icmp_type, ICMP_ECHO_REQUEST);
        assert_eq!(decoded.identifier(), 0x1234);
        assert_eq!(decoded.sequence(), 0x0042);
    }

    #[test]
    fn test_icmp_decode_rejects_short_input() {
        assert!(matches!(
            IcmpHeader::decode(&[ICMP_ECHO_REPLY, 0, 0, 0, 0]),
            Err(TracerouteError::PacketTooShort { expected: 8, actual: 5 })
        ));
    }
}
