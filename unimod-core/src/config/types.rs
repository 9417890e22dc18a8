//! Configuration type definitions

use heapless::Vec;
use serde::{Deserialize, Serialize};
use unimod_protocol::views::MAX_NEXTION_ENTRIES;
use unimod_protocol::{SensorType, SENSOR_KINDS};

/// Maximum always-attached 1-Wire lines
pub const MAX_WIRED_LINES: usize = 4;

/// Maximum sensors polled over RS-485
pub const MAX_RS485_QUEUE: usize = 32;

/// Maximum sensors tracked from the radio
pub const MAX_NRF_ITEMS: usize = 32;

/// RF channel used until one is configured or restored
pub const DEFAULT_RF_CHANNEL: u8 = 19;

/// Built-in sensors per type, in [`SensorType::REGISTRABLE`] order
///
/// Universal sensors of a type are numbered after the built-in ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize)]
pub struct HardcodedCounts {
    pub temperature: u8,
    pub humidity: u8,
    pub luminosity: u8,
    pub soil_moisture: u8,
    pub ph: u8,
}

impl HardcodedCounts {
    /// Count for one sensor type, 0 for [`SensorType::None`]
    pub fn get(&self, sensor: SensorType) -> u8 {
        match sensor {
            SensorType::None => 0,
            SensorType::Temperature => self.temperature,
            SensorType::Humidity => self.humidity,
            SensorType::Luminosity => self.luminosity,
            SensorType::SoilMoisture => self.soil_moisture,
            SensorType::Ph => self.ph,
        }
    }

    /// Counts as a table indexed by [`SensorType::table_index`]
    pub fn to_array(&self) -> [u8; SENSOR_KINDS] {
        [
            self.temperature,
            self.humidity,
            self.luminosity,
            self.soil_moisture,
            self.ph,
        ]
    }
}

/// Optional collaborators present on this controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize)]
pub struct Capabilities {
    /// An RS-485 gate is wired
    pub rs485_gate: bool,
    /// An nRF24 gate is wired
    pub nrf_gate: bool,
    /// Serve Nextion display modules
    pub nextion_module: bool,
    /// Serve relay/actuator modules
    pub execution_module: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            rs485_gate: true,
            nrf_gate: true,
            nextion_module: true,
            execution_module: true,
        }
    }
}

/// Scheduling and timeout settings, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize)]
pub struct TimingConfig {
    /// How often an always-attached module is measured
    pub permanent_poll_ms: u32,
    /// Time a module needs between start-measure and read
    pub measure_settle_ms: u32,
    /// Controller state broadcast period on RS-485
    pub rs485_broadcast_ms: u32,
    /// Period of the RS-485 sensor poll, one item per period
    pub rs485_poll_ms: u32,
    /// Bound on waiting for the RS-485 transmitter to drain
    pub rs485_tx_timeout_ms: u32,
    /// Bound on waiting for an RS-485 reply
    pub rs485_reply_timeout_ms: u32,
    /// Staleness interval for radio modules reporting no query interval
    pub nrf_default_query_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            permanent_poll_ms: 5000,
            measure_settle_ms: 1000,
            rs485_broadcast_ms: 1000,
            rs485_poll_ms: 500,
            rs485_tx_timeout_ms: 50,
            rs485_reply_timeout_ms: 100,
            nrf_default_query_ms: 10_000,
        }
    }
}

/// One value mirrored to Nextion displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize)]
pub struct NextionSource {
    pub sensor: SensorType,
    pub index: u8,
}

/// What Nextion displays show on their wait screen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize)]
pub struct NextionConfig {
    pub sources: Vec<NextionSource, MAX_NEXTION_ENTRIES>,
}

impl NextionConfig {
    /// Add a source; returns false if the list is full
    pub fn add(&mut self, sensor: SensorType, index: u8) -> bool {
        self.sources.push(NextionSource { sensor, index }).is_ok()
    }
}

/// Complete universal module configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize)]
pub struct UniConfig {
    /// Identity written into every module this controller owns
    pub controller_id: u8,
    pub hardcoded: HardcodedCounts,
    pub capabilities: Capabilities,
    pub timing: TimingConfig,
    pub nextion: NextionConfig,
    /// RF channel used when no registration image is restored
    pub rf_channel: u8,
}

impl Default for UniConfig {
    fn default() -> Self {
        Self {
            controller_id: 0,
            hardcoded: HardcodedCounts::default(),
            capabilities: Capabilities::default(),
            timing: TimingConfig::default(),
            nextion: NextionConfig::default(),
            rf_channel: DEFAULT_RF_CHANNEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardcoded_lookup() {
        let counts = HardcodedCounts {
            temperature: 2,
            humidity: 1,
            ..Default::default()
        };
        assert_eq!(counts.get(SensorType::Temperature), 2);
        assert_eq!(counts.get(SensorType::Humidity), 1);
        assert_eq!(counts.get(SensorType::None), 0);
        assert_eq!(counts.to_array(), [2, 1, 0, 0, 0]);
    }

    #[test]
    fn test_nextion_sources_bounded() {
        let mut nextion = NextionConfig::default();
        for i in 0..MAX_NEXTION_ENTRIES as u8 {
            assert!(nextion.add(SensorType::Temperature, i));
        }
        assert!(!nextion.add(SensorType::Ph, 0));
    }

    #[test]
    fn test_config_postcard_roundtrip() {
        let mut config = UniConfig {
            controller_id: 3,
            ..Default::default()
        };
        config.nextion.add(SensorType::Humidity, 1);

        let mut buffer = [0u8; 64];
        let bytes = postcard::to_slice(&config, &mut buffer).unwrap();
        let decoded: UniConfig = postcard::from_bytes(bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
