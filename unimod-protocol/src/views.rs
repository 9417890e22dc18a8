//! Typed views over the 24-byte scratchpad data region
//!
//! Each view decodes from and encodes back into `RawScratchpad::data`. Byte
//! offsets are part of the module firmware contract.

use heapless::Vec;

use crate::scratchpad::{DATA_SIZE, NO_SENSOR_REGISTERED, UNUSED};
use crate::sensor::SensorType;

/// Sensor slots per sensors module
pub const MAX_MODULE_SENSORS: usize = 3;

/// Actuator slots per execution module
pub const MAX_EXECUTION_SLOTS: usize = 8;

/// Display entries per Nextion module
pub const MAX_NEXTION_ENTRIES: usize = 5;

// ---------------------------------------------------------------------------
// Sensors module
// ---------------------------------------------------------------------------

/// Interval at which a module refreshes its readings
///
/// Packed into one byte: high nibble minutes, low nibble seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueryInterval {
    pub minutes: u8,
    pub seconds: u8,
}

impl QueryInterval {
    /// Create an interval, saturating each part to a nibble
    pub fn new(minutes: u8, seconds: u8) -> Self {
        Self {
            minutes: minutes.min(0x0F),
            seconds: seconds.min(0x0F),
        }
    }

    /// Unpack from the wire byte
    pub fn from_byte(byte: u8) -> Self {
        Self {
            minutes: byte >> 4,
            seconds: byte & 0x0F,
        }
    }

    /// Pack into the wire byte
    pub fn to_byte(self) -> u8 {
        (self.minutes.min(0x0F) << 4) | self.seconds.min(0x0F)
    }

    /// Interval length in milliseconds
    pub fn as_millis(self) -> u32 {
        (self.minutes as u32 * 60 + self.seconds as u32) * 1000
    }
}

/// One sensor slot: `{index, type, data[4]}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSlot {
    /// Index assigned by the controller, [`NO_SENSOR_REGISTERED`] if none yet
    pub index: u8,
    /// Raw sensor type byte
    pub sensor_type: u8,
    pub data: [u8; 4],
}

impl Default for SensorSlot {
    fn default() -> Self {
        Self {
            index: NO_SENSOR_REGISTERED,
            sensor_type: UNUSED,
            data: [UNUSED; 4],
        }
    }
}

impl SensorSlot {
    /// Create a populated slot
    pub fn new(sensor: SensorType, index: u8, data: [u8; 4]) -> Self {
        Self {
            index,
            sensor_type: sensor.to_byte(),
            data,
        }
    }

    /// Sensor type, `None` for empty or unrecognised slots
    pub fn kind(&self) -> Option<SensorType> {
        match SensorType::from_byte(self.sensor_type) {
            Some(SensorType::None) | None => None,
            Some(sensor) => Some(sensor),
        }
    }

    /// Slot already carries a controller-assigned index
    pub fn has_index(&self) -> bool {
        self.index != NO_SENSOR_REGISTERED
    }
}

/// Sensors module data
///
/// Offsets:
/// - 0: battery status
/// - 1, 2: calibration factors
/// - 3: query interval (packed)
/// - 4, 5: reserved
/// - 6, 12, 18: sensor slots of 6 bytes each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorsView {
    pub battery_status: u8,
    pub calibration_factor1: u8,
    pub calibration_factor2: u8,
    pub query_interval: QueryInterval,
    pub reserved: [u8; 2],
    pub sensors: [SensorSlot; MAX_MODULE_SENSORS],
}

const SENSOR_SLOTS_OFFSET: usize = 6;
const SENSOR_SLOT_SIZE: usize = 6;

impl Default for SensorsView {
    fn default() -> Self {
        Self {
            battery_status: UNUSED,
            calibration_factor1: UNUSED,
            calibration_factor2: UNUSED,
            query_interval: QueryInterval::default(),
            reserved: [UNUSED; 2],
            sensors: [SensorSlot::default(); MAX_MODULE_SENSORS],
        }
    }
}

impl SensorsView {
    pub fn decode(data: &[u8; DATA_SIZE]) -> Self {
        let mut sensors = [SensorSlot::default(); MAX_MODULE_SENSORS];
        for (i, slot) in sensors.iter_mut().enumerate() {
            let base = SENSOR_SLOTS_OFFSET + i * SENSOR_SLOT_SIZE;
            slot.index = data[base];
            slot.sensor_type = data[base + 1];
            slot.data.copy_from_slice(&data[base + 2..base + 6]);
        }

        Self {
            battery_status: data[0],
            calibration_factor1: data[1],
            calibration_factor2: data[2],
            query_interval: QueryInterval::from_byte(data[3]),
            reserved: [data[4], data[5]],
            sensors,
        }
    }

    pub fn encode(&self, data: &mut [u8; DATA_SIZE]) {
        data[0] = self.battery_status;
        data[1] = self.calibration_factor1;
        data[2] = self.calibration_factor2;
        data[3] = self.query_interval.to_byte();
        data[4] = self.reserved[0];
        data[5] = self.reserved[1];
        for (i, slot) in self.sensors.iter().enumerate() {
            let base = SENSOR_SLOTS_OFFSET + i * SENSOR_SLOT_SIZE;
            data[base] = slot.index;
            data[base + 1] = slot.sensor_type;
            data[base + 2..base + 6].copy_from_slice(&slot.data);
        }
    }
}

// ---------------------------------------------------------------------------
// Execution module
// ---------------------------------------------------------------------------

/// What an execution slot is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotType {
    Empty,
    WindowLeftChannel,
    WindowRightChannel,
    WateringChannel,
    LightChannel,
    Pin,
}

impl SlotType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(SlotType::Empty),
            1 => Some(SlotType::WindowLeftChannel),
            2 => Some(SlotType::WindowRightChannel),
            3 => Some(SlotType::WateringChannel),
            4 => Some(SlotType::LightChannel),
            5 => Some(SlotType::Pin),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            SlotType::Empty => 0,
            SlotType::WindowLeftChannel => 1,
            SlotType::WindowRightChannel => 2,
            SlotType::WateringChannel => 3,
            SlotType::LightChannel => 4,
            SlotType::Pin => 5,
        }
    }
}

/// One actuator slot: `{slotType, slotLinkedData, slotStatus}`
///
/// `linked_data` is set by the controller (window, channel or pin number) and
/// stored by the module untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExecutionSlot {
    pub slot_type: u8,
    pub linked_data: u8,
    pub status: u8,
}

impl Default for ExecutionSlot {
    fn default() -> Self {
        Self {
            slot_type: SlotType::Empty.to_byte(),
            linked_data: UNUSED,
            status: UNUSED,
        }
    }
}

impl ExecutionSlot {
    pub fn new(slot_type: SlotType, linked_data: u8) -> Self {
        Self {
            slot_type: slot_type.to_byte(),
            linked_data,
            status: 0,
        }
    }

    pub fn kind(&self) -> Option<SlotType> {
        SlotType::from_byte(self.slot_type)
    }
}

/// Execution module data: 8 slots of 3 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExecutionView {
    pub slots: [ExecutionSlot; MAX_EXECUTION_SLOTS],
}

impl ExecutionView {
    pub fn decode(data: &[u8; DATA_SIZE]) -> Self {
        let mut slots = [ExecutionSlot::default(); MAX_EXECUTION_SLOTS];
        for (i, slot) in slots.iter_mut().enumerate() {
            let base = i * 3;
            slot.slot_type = data[base];
            slot.linked_data = data[base + 1];
            slot.status = data[base + 2];
        }
        Self { slots }
    }

    pub fn encode(&self, data: &mut [u8; DATA_SIZE]) {
        for (i, slot) in self.slots.iter().enumerate() {
            let base = i * 3;
            data[base] = slot.slot_type;
            data[base + 1] = slot.linked_data;
            data[base + 2] = slot.status;
        }
    }
}

// ---------------------------------------------------------------------------
// Nextion module
// ---------------------------------------------------------------------------

/// One displayed value: `{sensorType, data[2]}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NextionEntry {
    pub sensor_type: u8,
    pub data: [u8; 2],
}

impl Default for NextionEntry {
    fn default() -> Self {
        Self {
            sensor_type: UNUSED,
            data: [UNUSED; 2],
        }
    }
}

/// Nextion module data
///
/// Offsets:
/// - 0..3: reserved
/// - 3: controller status flags
/// - 4, 5: request bits set by the display (see [`DisplayRequest`])
/// - 6: window open temperature
/// - 7: window close temperature
/// - 8: number of valid entries
/// - 9..24: 5 entries of 3 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NextionView {
    pub reserved: [u8; 3],
    pub controller_status: u8,
    pub nextion_status1: u8,
    pub nextion_status2: u8,
    pub open_temperature: u8,
    pub close_temperature: u8,
    pub data_count: u8,
    pub entries: [NextionEntry; MAX_NEXTION_ENTRIES],
}

const NEXTION_ENTRIES_OFFSET: usize = 9;

impl Default for NextionView {
    fn default() -> Self {
        Self {
            reserved: [UNUSED; 3],
            controller_status: 0,
            nextion_status1: 0,
            nextion_status2: 0,
            open_temperature: 0,
            close_temperature: 0,
            data_count: 0,
            entries: [NextionEntry::default(); MAX_NEXTION_ENTRIES],
        }
    }
}

impl NextionView {
    pub fn decode(data: &[u8; DATA_SIZE]) -> Self {
        let mut entries = [NextionEntry::default(); MAX_NEXTION_ENTRIES];
        for (i, entry) in entries.iter_mut().enumerate() {
            let base = NEXTION_ENTRIES_OFFSET + i * 3;
            entry.sensor_type = data[base];
            entry.data = [data[base + 1], data[base + 2]];
        }

        Self {
            reserved: [data[0], data[1], data[2]],
            controller_status: data[3],
            nextion_status1: data[4],
            nextion_status2: data[5],
            open_temperature: data[6],
            close_temperature: data[7],
            data_count: data[8],
            entries,
        }
    }

    pub fn encode(&self, data: &mut [u8; DATA_SIZE]) {
        data[..3].copy_from_slice(&self.reserved);
        data[3] = self.controller_status;
        data[4] = self.nextion_status1;
        data[5] = self.nextion_status2;
        data[6] = self.open_temperature;
        data[7] = self.close_temperature;
        data[8] = self.data_count;
        for (i, entry) in self.entries.iter().enumerate() {
            let base = NEXTION_ENTRIES_OFFSET + i * 3;
            data[base] = entry.sensor_type;
            data[base + 1] = entry.data[0];
            data[base + 2] = entry.data[1];
        }
    }

    /// Requests raised on the display since the last update
    pub fn requests(&self) -> Vec<DisplayRequest, 16> {
        DisplayRequest::from_status(self.nextion_status1, self.nextion_status2)
    }
}

/// A user request raised on the Nextion display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayRequest {
    OpenWindows,
    CloseWindows,
    WindowsAutoMode,
    WindowsManualMode,
    WateringOn,
    WateringOff,
    WateringAutoMode,
    WateringManualMode,
    LightOn,
    LightOff,
    LightAutoMode,
    LightManualMode,
}

// Bit order within status1 then status2
const STATUS1_REQUESTS: [DisplayRequest; 8] = [
    DisplayRequest::OpenWindows,
    DisplayRequest::CloseWindows,
    DisplayRequest::WindowsAutoMode,
    DisplayRequest::WindowsManualMode,
    DisplayRequest::WateringOn,
    DisplayRequest::WateringOff,
    DisplayRequest::WateringAutoMode,
    DisplayRequest::WateringManualMode,
];

const STATUS2_REQUESTS: [DisplayRequest; 4] = [
    DisplayRequest::LightOn,
    DisplayRequest::LightOff,
    DisplayRequest::LightAutoMode,
    DisplayRequest::LightManualMode,
];

impl DisplayRequest {
    /// Decode every request bit that is set
    pub fn from_status(status1: u8, status2: u8) -> Vec<DisplayRequest, 16> {
        let mut out = Vec::new();
        for (bit, request) in STATUS1_REQUESTS.iter().enumerate() {
            if status1 & (1 << bit) != 0 {
                let _ = out.push(*request);
            }
        }
        for (bit, request) in STATUS2_REQUESTS.iter().enumerate() {
            if status2 & (1 << bit) != 0 {
                let _ = out.push(*request);
            }
        }
        out
    }

    /// `(status byte number, bit mask)` of this request
    pub fn bit(self) -> (u8, u8) {
        if let Some(pos) = STATUS1_REQUESTS.iter().position(|r| *r == self) {
            return (1, 1 << pos);
        }
        let pos = STATUS2_REQUESTS
            .iter()
            .position(|r| *r == self)
            .unwrap_or(0);
        (2, 1 << pos)
    }
}
