//! Scratchpad transfer over a 1-Wire style line
//!
//! Every transaction is `reset`, `SKIP_ROM`, command, then payload. The codec
//! only moves bytes; callers sequence measure, read, write and save, and wait
//! the module's settle time between measure and read themselves.

use unimod_hal::OneWireBus;
use unimod_protocol::{command, RawScratchpad, SCRATCHPAD_SIZE};

/// Errors from scratchpad transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// No presence pulse on reset
    NotPresent,
    /// Read completed but the CRC8 does not match
    Crc,
}

/// A line bound to one scratchpad buffer
pub struct ScratchpadCodec<'a, B: OneWireBus> {
    bus: &'a mut B,
    scratchpad: &'a mut RawScratchpad,
}

impl<'a, B: OneWireBus> ScratchpadCodec<'a, B> {
    /// Bind a bus and a buffer for a sequence of transfers
    pub fn begin(bus: &'a mut B, scratchpad: &'a mut RawScratchpad) -> Self {
        Self { bus, scratchpad }
    }

    /// Presence probe
    pub fn can_work(&mut self) -> bool {
        self.bus.reset()
    }

    /// Ask the module to start a measurement
    pub fn start_measure(&mut self) -> Result<(), CodecError> {
        self.command(command::START_MEASURE)
    }

    /// Read the module's scratchpad into the bound buffer
    ///
    /// On [`CodecError::Crc`] the buffer holds the corrupt bytes and must be
    /// treated as stale.
    pub fn read(&mut self) -> Result<(), CodecError> {
        self.command(command::READ_SCRATCHPAD)?;

        let mut bytes = [0u8; SCRATCHPAD_SIZE];
        self.bus.read_bytes(&mut bytes);

        // Length is fixed, parsing cannot fail
        if let Ok(scratchpad) = RawScratchpad::from_bytes(&bytes) {
            *self.scratchpad = scratchpad;
        }

        if !self.scratchpad.verify_crc() {
            debug!(
                "scratchpad CRC mismatch: got {=u8:#x}, expected {=u8:#x}",
                self.scratchpad.crc8,
                self.scratchpad.calculate_crc()
            );
            return Err(CodecError::Crc);
        }
        Ok(())
    }

    /// Send head and data; the module computes its own CRC
    pub fn write(&mut self) -> Result<(), CodecError> {
        self.command(command::WRITE_SCRATCHPAD)?;
        self.bus.write_bytes(&self.scratchpad.payload());
        Ok(())
    }

    /// Ask the module to commit its scratchpad to EEPROM
    pub fn save(&mut self) -> Result<(), CodecError> {
        self.command(command::SAVE_EEPROM)
    }

    /// The bound buffer
    pub fn scratchpad(&self) -> &RawScratchpad {
        self.scratchpad
    }

    fn command(&mut self, cmd: u8) -> Result<(), CodecError> {
        if !self.bus.reset() {
            return Err(CodecError::NotPresent);
        }
        self.bus.write_byte(command::SKIP_ROM);
        self.bus.write_byte(cmd);
        Ok(())
    }
}
