//! Host-side doubles for the transports and the controller

#![allow(dead_code)]

use std::collections::VecDeque;

use unimod_core::config::{HardcodedCounts, UniConfig};
use unimod_core::traits::{ControllerLink, StateRef, StateRegistry};
use unimod_hal::{BusDirection, OneWireBus, RadioLink, Rs485Port};
use unimod_protocol::views::{QueryInterval, SensorSlot, SensorsView};
use unimod_protocol::{
    command, ControllerState, DisplayRequest, PacketType, RawScratchpad, Reading, Rs485Packet,
    Rs485PacketType, SensorType, DATA_SIZE, HEAD_SIZE, RS485_PACKET_SIZE,
};

pub const CONTROLLER_ID: u8 = 7;

pub fn config(hardcoded: HardcodedCounts) -> UniConfig {
    UniConfig {
        controller_id: CONTROLLER_ID,
        hardcoded,
        ..Default::default()
    }
}

/// Sensors scratchpad with the given slots
pub fn sensors(controller_id: u8, interval: QueryInterval, slots: &[SensorSlot]) -> RawScratchpad {
    let mut scratchpad = RawScratchpad::new(PacketType::Sensors);
    scratchpad.head.controller_id = controller_id;
    let mut view = SensorsView {
        query_interval: interval,
        ..Default::default()
    };
    for (i, slot) in slots.iter().enumerate() {
        view.sensors[i] = *slot;
    }
    view.encode(&mut scratchpad.data);
    scratchpad.update_crc();
    scratchpad
}

/// Indices carried by a sensors scratchpad
pub fn slot_indices(scratchpad: &RawScratchpad) -> Vec<u8> {
    SensorsView::decode(&scratchpad.data)
        .sensors
        .iter()
        .filter(|slot| slot.kind().is_some())
        .map(|slot| slot.index)
        .collect()
}

#[derive(Default)]
pub struct States {
    pub values: Vec<(StateRef, Option<Reading>)>,
    pub pushes: usize,
    pub unknowns: usize,
}

impl States {
    pub fn value(&self, state: StateRef) -> Option<Reading> {
        self.values
            .iter()
            .find(|(r, _)| *r == state)
            .and_then(|(_, v)| *v)
    }

    pub fn contains_ref(&self, state: StateRef) -> bool {
        self.values.iter().any(|(r, _)| *r == state)
    }
}

impl StateRegistry for States {
    fn add_state(&mut self, state: StateRef) {
        if !self.contains(state) {
            self.values.push((state, None));
        }
    }

    fn contains(&self, state: StateRef) -> bool {
        self.values.iter().any(|(r, _)| *r == state)
    }

    fn push(&mut self, state: StateRef, reading: Reading) {
        self.pushes += 1;
        if let Some(entry) = self.values.iter_mut().find(|(r, _)| *r == state) {
            entry.1 = Some(reading);
        }
    }

    fn mark_unknown(&mut self, state: StateRef) {
        self.unknowns += 1;
        if let Some(entry) = self.values.iter_mut().find(|(r, _)| *r == state) {
            entry.1 = None;
        }
    }

    fn latest(&self, state: StateRef) -> Option<Reading> {
        self.value(state)
    }
}

#[derive(Default)]
pub struct Controller {
    pub state: ControllerState,
    pub requests: Vec<DisplayRequest>,
}

impl ControllerLink for Controller {
    fn controller_state(&self) -> ControllerState {
        self.state
    }

    fn window_thresholds(&self) -> (u8, u8) {
        (28, 22)
    }

    fn apply_display_request(&mut self, request: DisplayRequest) {
        self.requests.push(request);
    }
}

/// A module on a 1-Wire bus, reduced to what the codec sends
pub struct WiredModule {
    pub image: RawScratchpad,
    pub writes: usize,
    pub saves: usize,
    last_command: Option<u8>,
    incoming: Vec<u8>,
}

impl WiredModule {
    pub fn new(image: RawScratchpad) -> Self {
        Self {
            image,
            writes: 0,
            saves: 0,
            last_command: None,
            incoming: Vec::new(),
        }
    }
}

impl OneWireBus for WiredModule {
    fn reset(&mut self) -> bool {
        self.last_command = None;
        true
    }

    fn write_byte(&mut self, byte: u8) {
        match self.last_command {
            None if byte == command::SKIP_ROM => self.last_command = Some(byte),
            Some(command::SKIP_ROM) => {
                self.last_command = Some(byte);
                self.incoming.clear();
                if byte == command::SAVE_EEPROM {
                    self.saves += 1;
                }
            }
            Some(command::WRITE_SCRATCHPAD) => {
                self.incoming.push(byte);
                if self.incoming.len() == HEAD_SIZE + DATA_SIZE {
                    self.incoming.push(0);
                    let mut image = RawScratchpad::from_bytes(&self.incoming).unwrap();
                    image.update_crc();
                    self.image = image;
                    self.writes += 1;
                }
            }
            _ => {}
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) {
        let bytes = self.image.to_bytes();
        let len = buf.len().min(bytes.len());
        buf[..len].copy_from_slice(&bytes[..len]);
    }
}

/// RS-485 line; modules answer requests addressed to them
#[derive(Default)]
pub struct Rs485Line {
    pub modules: Vec<(SensorType, u8, [u8; 4])>,
    pub requests: Vec<(u8, u8)>,
    receiving: bool,
    reply: Option<[u8; RS485_PACKET_SIZE]>,
}

impl Rs485Line {
    pub fn with(modules: &[(SensorType, u8, [u8; 4])]) -> Self {
        Self {
            modules: modules.to_vec(),
            ..Default::default()
        }
    }
}

impl Rs485Port for Rs485Line {
    type Error = ();

    fn set_direction(&mut self, direction: BusDirection) -> Result<(), ()> {
        self.receiving = direction == BusDirection::Receive;
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), ()> {
        let packet = Rs485Packet::decode(data).map_err(|_| ())?;
        if packet.packet_type == Rs485PacketType::Sensor {
            let (sensor, index) = (packet.data[0], packet.data[1]);
            self.requests.push((sensor, index));
            self.reply = self
                .modules
                .iter()
                .find(|(s, i, _)| s.to_byte() == sensor && *i == index)
                .map(|(s, i, d)| Rs485Packet::sensor_reply(*s, *i, *d).encode());
        }
        Ok(())
    }

    fn wait_transmit_complete(&mut self, _timeout_ms: u32) -> bool {
        true
    }

    fn recv(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, ()> {
        match self.reply.take() {
            Some(reply) if self.receiving => {
                buf[..reply.len()].copy_from_slice(&reply);
                Ok(reply.len())
            }
            _ => Ok(0),
        }
    }
}

#[derive(Default)]
pub struct Radio {
    pub channel: Option<u8>,
    pub broadcasts: usize,
    pub inbox: VecDeque<Vec<u8>>,
}

impl RadioLink for Radio {
    type Error = ();

    fn init(&mut self, channel: u8) -> Result<(), ()> {
        self.channel = Some(channel);
        Ok(())
    }

    fn set_channel(&mut self, channel: u8) -> Result<(), ()> {
        self.channel = Some(channel);
        Ok(())
    }

    fn broadcast(&mut self, _payload: &[u8]) -> Result<(), ()> {
        self.broadcasts += 1;
        Ok(())
    }

    fn poll(&mut self, buf: &mut [u8]) -> Option<usize> {
        let payload = self.inbox.pop_front()?;
        let len = buf.len().min(payload.len());
        buf[..len].copy_from_slice(&payload[..len]);
        Some(len)
    }
}
