//! RFC 1071 Internet checksum.

/// Computes the Internet checksum of `data`.
///
/// The data is summed as big-endian 16-bit words with a trailing odd byte
/// padded with zero, carries are folded back into the low 16 bits, and the
/// one's complement of the sum is returned. Writing the result into a zeroed
/// checksum field makes the checksum of the whole buffer zero.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}
