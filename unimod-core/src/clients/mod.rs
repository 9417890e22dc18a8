//! Packet-type handlers
//!
//! A module's scratchpad is routed by its packet type to one of a closed set
//! of clients. Each client knows how to register the module and how to
//! exchange data with it on later polls. Unknown packet types get the
//! [`UniClient::Dummy`] client, which does nothing.

pub mod execution;
pub mod nextion;
pub mod sensors;

pub use execution::ExecutionClient;
pub use nextion::NextionClient;
pub use sensors::SensorsClient;

use unimod_hal::ByteStore;
use unimod_protocol::{decode_readings, PacketType, RawScratchpad, Reading, SensorType};

use crate::config::{Capabilities, NextionConfig, UniConfig};
use crate::registry::RegistrationDispatcher;
use crate::traits::{ControllerLink, StateRef, StateRegistry};

/// Where an update's scratchpad came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateSource {
    /// Read from a wired line; writing back is possible
    OneWire,
    /// Pushed over the radio; the module cannot be written
    Radio,
}

/// Everything a client may touch while handling a module
pub struct ClientContext<'a> {
    pub dispatcher: &'a mut RegistrationDispatcher,
    pub states: &'a mut dyn StateRegistry,
    pub controller: &'a mut dyn ControllerLink,
    pub store: &'a mut dyn ByteStore,
}

/// Behaviour shared by every client
pub trait ModuleClient {
    /// Handle a newly discovered module
    ///
    /// Returns `true` if the scratchpad was changed and must be written
    /// back to the module. Calling it again with an unchanged scratchpad
    /// registers nothing new.
    fn register(&self, scratchpad: &mut RawScratchpad, ctx: &mut ClientContext<'_>) -> bool;

    /// Exchange data with a known module
    ///
    /// `online == false` means this poll failed; `scratchpad` then holds the
    /// last good data. Returns `true` if the scratchpad was changed and must
    /// be written back.
    fn update(
        &self,
        scratchpad: &mut RawScratchpad,
        online: bool,
        source: UpdateSource,
        ctx: &mut ClientContext<'_>,
    ) -> bool;
}

/// The client selected for one packet type
#[derive(Debug, Clone, Copy)]
pub enum UniClient<'a> {
    Dummy,
    Sensors(SensorsClient),
    Nextion(NextionClient<'a>),
    Execution(ExecutionClient),
}

impl ModuleClient for UniClient<'_> {
    fn register(&self, scratchpad: &mut RawScratchpad, ctx: &mut ClientContext<'_>) -> bool {
        match self {
            UniClient::Dummy => false,
            UniClient::Sensors(client) => client.register(scratchpad, ctx),
            UniClient::Nextion(client) => client.register(scratchpad, ctx),
            UniClient::Execution(client) => client.register(scratchpad, ctx),
        }
    }

    fn update(
        &self,
        scratchpad: &mut RawScratchpad,
        online: bool,
        source: UpdateSource,
        ctx: &mut ClientContext<'_>,
    ) -> bool {
        match self {
            UniClient::Dummy => false,
            UniClient::Sensors(client) => client.update(scratchpad, online, source, ctx),
            UniClient::Nextion(client) => client.update(scratchpad, online, source, ctx),
            UniClient::Execution(client) => client.update(scratchpad, online, source, ctx),
        }
    }
}

/// Picks the client for a scratchpad
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    capabilities: Capabilities,
    nextion: NextionConfig,
}

impl ClientFactory {
    pub fn new(capabilities: Capabilities, nextion: NextionConfig) -> Self {
        Self {
            capabilities,
            nextion,
        }
    }

    pub fn from_config(config: &UniConfig) -> Self {
        Self::new(config.capabilities, config.nextion.clone())
    }

    /// Client for the scratchpad's packet type
    pub fn client(&self, scratchpad: &RawScratchpad) -> UniClient<'_> {
        self.client_for(scratchpad.kind())
    }

    /// Client for a packet type
    ///
    /// Disabled module kinds get the dummy client.
    pub fn client_for(&self, kind: PacketType) -> UniClient<'_> {
        match kind {
            PacketType::Sensors => UniClient::Sensors(SensorsClient),
            PacketType::Nextion if self.capabilities.nextion_module => {
                UniClient::Nextion(NextionClient::new(&self.nextion))
            }
            PacketType::Execution if self.capabilities.execution_module => {
                UniClient::Execution(ExecutionClient)
            }
            _ => UniClient::Dummy,
        }
    }
}

/// Feed one sensor's four data bytes to its states
///
/// Offline sensors and readings the module marks as missing leave their
/// states unknown. Returns `false` if the sensor is not registered.
pub fn apply_sensor_data(
    dispatcher: &RegistrationDispatcher,
    states: &mut dyn StateRegistry,
    sensor: SensorType,
    index: u8,
    data: &[u8; 4],
    online: bool,
) -> bool {
    let Some(linked) = dispatcher.registered_states(&*states, sensor, index) else {
        return false;
    };

    if !online {
        for state in linked.iter() {
            states.mark_unknown(state);
        }
        return true;
    }

    let (primary, secondary) = decode_readings(sensor, data);
    feed(states, linked.primary, primary);
    feed(states, linked.secondary, secondary);
    true
}

/// Mark a registered sensor's states unknown
pub fn mark_sensor_unknown(
    dispatcher: &RegistrationDispatcher,
    states: &mut dyn StateRegistry,
    sensor: SensorType,
    index: u8,
) {
    if let Some(linked) = dispatcher.registered_states(&*states, sensor, index) {
        for state in linked.iter() {
            states.mark_unknown(state);
        }
    }
}

fn feed(states: &mut dyn StateRegistry, state: Option<StateRef>, reading: Option<Reading>) {
    let Some(state) = state else {
        return;
    };
    match reading {
        Some(reading) => states.push(state, reading),
        None => states.mark_unknown(state),
    }
}
