//! Dallas/Maxim CRC8
//!
//! `CRC = X^8 + X^5 + X^4 + X^0`, reflected (0x8C), initial value 0. This is
//! the checksum the module firmware computes over its scratchpad, so it must
//! not change.

/// Calculate the CRC8 of `data`
///
/// Feeding the data followed by its own CRC yields 0.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut inbyte = byte;
        for _ in 0..u8::BITS {
            let mix = (crc ^ inbyte) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            inbyte >>= 1;
        }
    }
    crc
}
