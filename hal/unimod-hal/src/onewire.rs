//! 1-Wire style bus abstraction
//!
//! Only the byte level is exposed. Slot timing and presence pulse detection
//! belong to the implementation.

/// A single-master 1-Wire bus
pub trait OneWireBus {
    /// Issue a reset pulse
    ///
    /// Returns `true` if a device answered with a presence pulse.
    fn reset(&mut self) -> bool;

    /// Write one byte, LSB first
    fn write_byte(&mut self, byte: u8);

    /// Write several bytes
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Fill `buf` with bytes read from the bus
    ///
    /// Reading from an absent device yields `0xFF`.
    fn read_bytes(&mut self, buf: &mut [u8]);
}
