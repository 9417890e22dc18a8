//! nRF24 gateway (push model)
//!
//! Radio modules send their scratchpad on their own schedule. The gate
//! broadcasts the controller state every tick, drains whatever arrived and
//! keeps a listen table with the time each sensor was last heard from. A
//! sensor silent for longer than its query interval is stale: its states
//! are marked unknown but the entry stays, so the next packet revives it.

use heapless::Vec;
use unimod_hal::{ByteStore, RadioLink};
use unimod_protocol::views::SensorsView;
use unimod_protocol::{NrfStatePacket, PacketType, RawScratchpad, SensorType, SCRATCHPAD_SIZE};

use crate::clients::{mark_sensor_unknown, ClientContext, ClientFactory, ModuleClient, UpdateSource};
use crate::config::{TimingConfig, MAX_NRF_ITEMS};
use crate::registry::{PersistError, RegistrationDispatcher};

/// Most packets drained per tick
pub const MAX_PACKETS_PER_TICK: usize = 8;

/// One entry of the listen table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NrfItem {
    pub sensor: SensorType,
    pub index: u8,
    /// How often the module promised to send
    pub query_interval_ms: u32,
    /// Gate time of the last packet
    pub got_last_data_at: u32,
    pub stale: bool,
}

/// nRF24 broker
pub struct NrfGate<R> {
    radio: R,
    initialized: bool,
    /// Gate time, accumulated from ticks
    now_ms: u32,
    default_query_ms: u32,
    items: Vec<NrfItem, MAX_NRF_ITEMS>,
    overflow_logged: bool,
}

impl<R: RadioLink> NrfGate<R> {
    pub fn new(radio: R, timing: &TimingConfig) -> Self {
        Self {
            radio,
            initialized: false,
            now_ms: 0,
            default_query_ms: timing.nrf_default_query_ms,
            items: Vec::new(),
            overflow_logged: false,
        }
    }

    /// Advance the gate by `dt_ms`
    ///
    /// The first call brings the radio up on the dispatcher's channel and
    /// does nothing else.
    pub fn update(&mut self, dt_ms: u32, factory: &ClientFactory, ctx: &mut ClientContext<'_>) {
        self.now_ms = self.now_ms.wrapping_add(dt_ms);

        if !self.initialized {
            let channel = ctx.dispatcher.rf_channel();
            match self.radio.init(channel) {
                Ok(()) => {
                    info!("radio up on channel {=u8}", channel);
                    self.initialized = true;
                }
                Err(_) => warn!("radio init failed"),
            }
            return;
        }

        let packet = NrfStatePacket::new(
            ctx.dispatcher.controller_id(),
            ctx.controller.controller_state(),
        );
        if self.radio.broadcast(&packet.encode()).is_err() {
            debug!("radio broadcast failed");
        }

        self.read_from_pipes(factory, ctx);
        self.check_stale(ctx);
    }

    /// Drain buffered packets and hand each to its client
    pub fn read_from_pipes(&mut self, factory: &ClientFactory, ctx: &mut ClientContext<'_>) {
        let mut buffer = [0u8; SCRATCHPAD_SIZE];

        for _ in 0..MAX_PACKETS_PER_TICK {
            let Some(len) = self.radio.poll(&mut buffer) else {
                break;
            };
            if len < SCRATCHPAD_SIZE {
                debug!("short radio packet ({=usize} bytes)", len);
                continue;
            }

            let mut scratchpad = match RawScratchpad::decode_checked(&buffer) {
                Ok(scratchpad) => scratchpad,
                Err(e) => {
                    debug!("radio packet rejected: {:?}", e);
                    continue;
                }
            };
            if scratchpad.head.controller_id != ctx.dispatcher.controller_id() {
                trace!("radio packet for controller {=u8}", scratchpad.head.controller_id);
                continue;
            }

            if scratchpad.kind() == PacketType::Sensors {
                self.track(&scratchpad, ctx);
            }

            let client = factory.client(&scratchpad);
            client.update(&mut scratchpad, true, UpdateSource::Radio, ctx);
        }
    }

    /// Change the RF channel, persist it and retune the radio
    pub fn set_channel<S: ByteStore + ?Sized>(
        &mut self,
        channel: u8,
        dispatcher: &mut RegistrationDispatcher,
        store: &mut S,
    ) -> Result<(), PersistError> {
        dispatcher.set_rf_channel(store, channel)?;
        if self.initialized && self.radio.set_channel(channel).is_err() {
            warn!("radio retune to {=u8} failed", channel);
        }
        Ok(())
    }

    /// Listen table
    pub fn items(&self) -> &[NrfItem] {
        &self.items
    }

    /// Tracked and not heard from within its query interval
    pub fn is_stale(&self, sensor: SensorType, index: u8) -> bool {
        self.find(sensor, index)
            .is_some_and(|i| self.items[i].stale)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    fn find(&self, sensor: SensorType, index: u8) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.sensor == sensor && item.index == index)
    }

    /// Refresh or create the listen entries of a sensors packet
    fn track(&mut self, scratchpad: &RawScratchpad, ctx: &mut ClientContext<'_>) {
        let view = SensorsView::decode(&scratchpad.data);
        let interval_ms = match view.query_interval.as_millis() {
            0 => self.default_query_ms,
            ms => ms,
        };

        for slot in view.sensors.iter() {
            let Some(sensor) = slot.kind() else {
                continue;
            };
            if !slot.has_index() {
                continue;
            }

            if let Some(i) = self.find(sensor, slot.index) {
                let item = &mut self.items[i];
                if item.stale {
                    info!("radio {} {=u8} back", sensor, slot.index);
                }
                item.got_last_data_at = self.now_ms;
                item.query_interval_ms = interval_ms;
                item.stale = false;
                continue;
            }

            // A module that kept its index while our image was lost
            ctx.dispatcher.add_uni_sensor(ctx.states, sensor, slot.index);
            ctx.dispatcher.save_if_dirty(ctx.store);
            if !ctx.dispatcher.is_registered(sensor, slot.index) {
                debug!("radio {} {=u8} not registered", sensor, slot.index);
                continue;
            }

            let item = NrfItem {
                sensor,
                index: slot.index,
                query_interval_ms: interval_ms,
                got_last_data_at: self.now_ms,
                stale: false,
            };
            if self.items.push(item).is_err() && !self.overflow_logged {
                warn!("radio listen table full, {} {=u8} untracked", sensor, slot.index);
                self.overflow_logged = true;
            }
        }
    }

    fn check_stale(&mut self, ctx: &mut ClientContext<'_>) {
        for item in self.items.iter_mut() {
            if item.stale {
                continue;
            }
            let silent_ms = self.now_ms.wrapping_sub(item.got_last_data_at);
            if silent_ms > item.query_interval_ms {
                item.stale = true;
                debug!(
                    "radio {} {=u8} stale after {=u32} ms",
                    item.sensor,
                    item.index,
                    silent_ms
                );
                mark_sensor_unknown(ctx.dispatcher, ctx.states, item.sensor, item.index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeRadio;
    use super::*;
    use crate::clients::testing::{Fixture, CONTROLLER_ID};
    use crate::config::HardcodedCounts;
    use crate::traits::StateRef;
    use unimod_protocol::views::{QueryInterval, SensorSlot};
    use unimod_protocol::{Reading, NRF_PACKET_SIZE};

    fn timing() -> TimingConfig {
        TimingConfig {
            nrf_default_query_ms: 10_000,
            ..Default::default()
        }
    }

    fn packet(controller_id: u8, interval: QueryInterval, slots: &[SensorSlot]) -> std::vec::Vec<u8> {
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
        scratchpad.to_bytes().to_vec()
    }

    fn temperature(index: u8, whole: u8) -> SensorSlot {
        SensorSlot::new(SensorType::Temperature, index, [whole, 0, 0xFF, 0xFF])
    }

    /// Gate past its init tick, one temperature sensor heard at t = 0
    fn heard_once(interval: QueryInterval) -> (NrfGate<FakeRadio>, Fixture) {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut gate = NrfGate::new(FakeRadio::default(), &timing());

        gate.update(0, &factory, &mut fixture.ctx());
        gate.radio.inbox.push_back(packet(CONTROLLER_ID, interval, &[temperature(0, 21)]));
        gate.update(0, &factory, &mut fixture.ctx());
        (gate, fixture)
    }

    #[test]
    fn test_first_tick_initializes() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut gate = NrfGate::new(FakeRadio::default(), &timing());

        gate.update(10, &factory, &mut fixture.ctx());
        assert!(gate.is_initialized());
        assert_eq!(gate.radio.channel, Some(19));
        assert!(gate.radio.broadcasts.is_empty());

        gate.update(10, &factory, &mut fixture.ctx());
        gate.update(10, &factory, &mut fixture.ctx());
        assert_eq!(gate.radio.broadcasts.len(), 2);

        let sent = NrfStatePacket::decode(&gate.radio.broadcasts[0]).unwrap();
        assert_eq!(gate.radio.broadcasts[0].len(), NRF_PACKET_SIZE);
        assert_eq!(sent.controller_id, CONTROLLER_ID);
    }

    #[test]
    fn test_pushed_reading_reaches_state() {
        let (gate, fixture) = heard_once(QueryInterval::new(1, 0));

        assert_eq!(gate.items().len(), 1);
        assert_eq!(gate.items()[0].query_interval_ms, 60_000);
        assert!(fixture.dispatcher.is_registered(SensorType::Temperature, 0));
        assert_eq!(
            fixture.states.value(StateRef::primary(SensorType::Temperature, 0)),
            Some(Reading::Temperature { c_x100: 2100 })
        );
    }

    #[test]
    fn test_stale_after_interval() {
        let factory = ClientFactory::default();
        let (mut gate, mut fixture) = heard_once(QueryInterval::new(1, 0));

        gate.update(30_000, &factory, &mut fixture.ctx());
        assert!(!gate.is_stale(SensorType::Temperature, 0));
        assert!(fixture
            .states
            .value(StateRef::primary(SensorType::Temperature, 0))
            .is_some());

        gate.update(31_000, &factory, &mut fixture.ctx());
        assert!(gate.is_stale(SensorType::Temperature, 0));
        assert_eq!(fixture.states.value(StateRef::primary(SensorType::Temperature, 0)), None);

        // Entry survives and revives
        assert_eq!(gate.items().len(), 1);
        gate.radio.inbox.push_back(packet(CONTROLLER_ID, QueryInterval::new(1, 0), &[temperature(0, 22)]));
        gate.update(10, &factory, &mut fixture.ctx());
        assert!(!gate.is_stale(SensorType::Temperature, 0));
        assert_eq!(
            fixture.states.value(StateRef::primary(SensorType::Temperature, 0)),
            Some(Reading::Temperature { c_x100: 2200 })
        );
    }

    #[test]
    fn test_zero_interval_uses_default() {
        let factory = ClientFactory::default();
        let (mut gate, mut fixture) = heard_once(QueryInterval::default());
        assert_eq!(gate.items()[0].query_interval_ms, 10_000);

        gate.update(10_001, &factory, &mut fixture.ctx());
        assert!(gate.is_stale(SensorType::Temperature, 0));
    }

    #[test]
    fn test_foreign_and_corrupt_packets_ignored() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut gate = NrfGate::new(FakeRadio::default(), &timing());
        gate.update(0, &factory, &mut fixture.ctx());

        let mut corrupt = packet(CONTROLLER_ID, QueryInterval::new(1, 0), &[temperature(0, 21)]);
        corrupt[7] ^= 0x01;
        gate.radio.inbox.push_back(corrupt);
        gate.radio.inbox.push_back(packet(CONTROLLER_ID + 1, QueryInterval::new(1, 0), &[temperature(0, 21)]));
        gate.radio.inbox.push_back(std::vec![0u8; 4]);
        gate.update(0, &factory, &mut fixture.ctx());

        assert!(gate.items().is_empty());
        assert!(gate.radio.inbox.is_empty());
        assert_eq!(fixture.states.pushes, 0);
        assert!(!fixture.dispatcher.is_registered(SensorType::Temperature, 0));
    }

    #[test]
    fn test_unregistrable_index_not_tracked() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut gate = NrfGate::new(FakeRadio::default(), &timing());
        gate.update(0, &factory, &mut fixture.ctx());

        // Index 3 leaves a gap
        gate.radio.inbox.push_back(packet(CONTROLLER_ID, QueryInterval::new(1, 0), &[temperature(3, 21)]));
        gate.update(0, &factory, &mut fixture.ctx());
        assert!(gate.items().is_empty());
        assert_eq!(fixture.states.pushes, 0);
    }

    #[test]
    fn test_drain_is_bounded_per_tick() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut gate = NrfGate::new(FakeRadio::default(), &timing());
        gate.update(0, &factory, &mut fixture.ctx());

        for _ in 0..MAX_PACKETS_PER_TICK + 2 {
            gate.radio.inbox.push_back(packet(CONTROLLER_ID, QueryInterval::new(1, 0), &[temperature(0, 21)]));
        }
        gate.update(0, &factory, &mut fixture.ctx());
        assert_eq!(gate.radio.inbox.len(), 2);
    }

    #[test]
    fn test_set_channel_persists_and_retunes() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut gate = NrfGate::new(FakeRadio::default(), &timing());
        gate.update(0, &factory, &mut fixture.ctx());

        gate.set_channel(42, &mut fixture.dispatcher, &mut fixture.store).unwrap();
        assert_eq!(gate.radio.channel, Some(42));
        assert_eq!(fixture.dispatcher.rf_channel(), 42);
        assert_eq!(fixture.dispatcher.read_state(&mut fixture.store).unwrap().rf_channel, 42);
    }
}
