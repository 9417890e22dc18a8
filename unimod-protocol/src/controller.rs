//! Controller state broadcast to execution modules
//!
//! 14 bytes:
//! - 0: flags (see `FLAG_*`)
//! - 1..5: window channels, 2 bits per window (left, right), 16 windows
//! - 5..7: watering channels, 1 bit each, 16 channels
//! - 7: light channels, 1 bit each, 8 channels
//! - 8..14: pin states, 1 bit each, 48 pins

/// Serialized size of [`ControllerState`]
pub const CONTROLLER_STATE_SIZE: usize = 14;

pub const FLAG_WINDOWS_AUTO: u8 = 0x01;
pub const FLAG_WATERING_AUTO: u8 = 0x02;
pub const FLAG_LIGHT_AUTO: u8 = 0x04;
pub const FLAG_WATERING_ON: u8 = 0x08;
pub const FLAG_LIGHT_ON: u8 = 0x10;

pub const MAX_WINDOWS: u8 = 16;
pub const MAX_WATERING_CHANNELS: u8 = 16;
pub const MAX_LIGHT_CHANNELS: u8 = 8;
pub const MAX_PINS: u8 = 48;

const WINDOWS_OFFSET: usize = 1;
const WATERING_OFFSET: usize = 5;
const LIGHT_OFFSET: usize = 7;
const PINS_OFFSET: usize = 8;

/// Which motor channel of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindowChannel {
    Left,
    Right,
}

/// Snapshot of actuator state owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    bytes: [u8; CONTROLLER_STATE_SIZE],
}

impl ControllerState {
    pub const fn new() -> Self {
        Self {
            bytes: [0; CONTROLLER_STATE_SIZE],
        }
    }

    pub const fn from_bytes(bytes: [u8; CONTROLLER_STATE_SIZE]) -> Self {
        Self { bytes }
    }

    pub const fn to_bytes(&self) -> [u8; CONTROLLER_STATE_SIZE] {
        self.bytes
    }

    pub fn flags(&self) -> u8 {
        self.bytes[0]
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.bytes[0] = flags;
    }

    pub fn window_channel(&self, window: u8, channel: WindowChannel) -> bool {
        if window >= MAX_WINDOWS {
            return false;
        }
        self.bit(WINDOWS_OFFSET, Self::window_bit(window, channel))
    }

    pub fn set_window_channel(&mut self, window: u8, channel: WindowChannel, on: bool) {
        if window < MAX_WINDOWS {
            self.set_bit(WINDOWS_OFFSET, Self::window_bit(window, channel), on);
        }
    }

    pub fn watering_channel(&self, channel: u8) -> bool {
        channel < MAX_WATERING_CHANNELS && self.bit(WATERING_OFFSET, channel as usize)
    }

    pub fn set_watering_channel(&mut self, channel: u8, on: bool) {
        if channel < MAX_WATERING_CHANNELS {
            self.set_bit(WATERING_OFFSET, channel as usize, on);
        }
    }

    pub fn light_channel(&self, channel: u8) -> bool {
        channel < MAX_LIGHT_CHANNELS && self.bit(LIGHT_OFFSET, channel as usize)
    }

    pub fn set_light_channel(&mut self, channel: u8, on: bool) {
        if channel < MAX_LIGHT_CHANNELS {
            self.set_bit(LIGHT_OFFSET, channel as usize, on);
        }
    }

    pub fn pin(&self, pin: u8) -> bool {
        pin < MAX_PINS && self.bit(PINS_OFFSET, pin as usize)
    }

    pub fn set_pin(&mut self, pin: u8, high: bool) {
        if pin < MAX_PINS {
            self.set_bit(PINS_OFFSET, pin as usize, high);
        }
    }

    fn window_bit(window: u8, channel: WindowChannel) -> usize {
        let base = window as usize * 2;
        match channel {
            WindowChannel::Left => base,
            WindowChannel::Right => base + 1,
        }
    }

    fn bit(&self, offset: usize, bit: usize) -> bool {
        self.bytes[offset + bit / 8] & (1 << (bit % 8)) != 0
    }

    fn set_bit(&mut self, offset: usize, bit: usize, on: bool) {
        let byte = &mut self.bytes[offset + bit / 8];
        if on {
            *byte |= 1 << (bit % 8);
        } else {
            *byte &= !(1 << (bit % 8));
        }
    }
}
