//! ICMP Echo Request construction using pnet.

use pnet_packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet_packet::icmp::{IcmpCode, IcmpTypes};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::{Ipv4Flags, MutableIpv4Packet};
use pnet_packet::Packet;
use std::net::{IpAddr, Ipv4Addr};
use traceroute_core::TracerouteError;
use traceroute_packets::checksum;
use traceroute_packets::header::{ICMP_HEADER_LEN, IPV4_HEADER_LEN};

/// Fixed filler carried after the ICMP header. It has no meaning beyond
/// making probes recognizable in a capture.
pub const ECHO_PAYLOAD: [u8; 2] = [0xC0, 0xDE];

/// Builds a complete IPv4 + ICMP Echo Request datagram.
///
/// `src` may be [`Ipv4Addr::UNSPECIFIED`], in which case the kernel fills in
/// the outgoing interface address. Both the IP header checksum and the ICMP
/// checksum are filled in. Fails with [`TracerouteError::InvalidAddress`] for
/// a non-IPv4 destination.
pub fn build_echo_request(
    src: Ipv4Addr,
    dst: IpAddr,
    ttl: u8,
    identifier: u16,
    sequence: u16,
) -> Result<Vec<u8>, TracerouteError> {
    let IpAddr::V4(dst) = dst else {
        return Err(TracerouteError::InvalidAddress(dst));
    };

    let icmp_len = ICMP_HEADER_LEN + ECHO_PAYLOAD.len();
    let ip_len = IPV4_HEADER_LEN + icmp_len;
    let mut buffer = vec![0u8; ip_len];

    {
        let mut icmp_packet = MutableEchoRequestPacket::new(&mut buffer[IPV4_HEADER_LEN..])
            .ok_or_else(|| TracerouteError::Internal("Failed to create ICMP packet".to_string()))?;

        icmp_packet.set_icmp_type(IcmpTypes::EchoRequest);
        icmp_packet.set_icmp_code(IcmpCode::new(0));
        icmp_packet.set_identifier(identifier);
        icmp_packet.set_sequence_number(sequence);
        icmp_packet.set_payload(&ECHO_PAYLOAD);

        let icmp_checksum = checksum(icmp_packet.packet());
        icmp_packet.set_checksum(icmp_checksum);
    }

    let mut ip_packet = MutableIpv4Packet::new(&mut buffer)
        .ok_or_else(|| TracerouteError::Internal("Failed to create IP packet".to_string()))?;

    ip_packet.set_version(4);
    ip_packet.set_header_length((IPV4_HEADER_LEN / 4) as u8);
    ip_packet.set_total_length(ip_len as u16);
    ip_packet.set_identification(identifier);
    ip_packet.set_flags(Ipv4Flags::DontFragment);
    ip_packet.set_ttl(ttl);
    ip_packet.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
    ip_packet.set_source(src);
    ip_packet.set_destination(dst);

    let ip_checksum = checksum(&ip_packet.packet()[..IPV4_HEADER_LEN]);
    ip_packet.set_checksum(ip_checksum);

    Ok(buffer)
}
