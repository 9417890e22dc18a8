//! State sink traits

use unimod_protocol::{Reading, SensorType};

/// Which of a sensor's states a handle points at
///
/// Humidity sensors feed a secondary temperature state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateSlot {
    Primary,
    Secondary,
}

/// Non-owning handle to one controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateRef {
    pub sensor: SensorType,
    pub slot: StateSlot,
    pub index: u8,
}

impl StateRef {
    pub const fn primary(sensor: SensorType, index: u8) -> Self {
        Self {
            sensor,
            slot: StateSlot::Primary,
            index,
        }
    }

    pub const fn secondary(sensor: SensorType, index: u8) -> Self {
        Self {
            sensor,
            slot: StateSlot::Secondary,
            index,
        }
    }
}

/// The state sinks linked to one registered sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorState {
    pub primary: Option<StateRef>,
    pub secondary: Option<StateRef>,
}

impl SensorState {
    /// Both handles, skipping absent ones
    pub fn iter(&self) -> impl Iterator<Item = StateRef> {
        self.primary.into_iter().chain(self.secondary)
    }
}

/// Controller-owned table of sensor states
///
/// Implemented by the surrounding controller. The core creates states for
/// newly registered universal sensors and feeds them readings.
pub trait StateRegistry {
    /// Create the state behind `state` if it does not exist yet
    fn add_state(&mut self, state: StateRef);

    /// The state exists
    fn contains(&self, state: StateRef) -> bool;

    /// Store a fresh reading
    fn push(&mut self, state: StateRef, reading: Reading);

    /// Forget the current value; the module is offline or has no data
    fn mark_unknown(&mut self, state: StateRef);

    /// Latest known reading, if any
    fn latest(&self, state: StateRef) -> Option<Reading>;
}
