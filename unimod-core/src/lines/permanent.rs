//! Always-attached module line
//!
//! Each poll period the line starts a measurement, lets it settle over the
//! following ticks, then reads the result and hands it to the module's
//! client. A failed poll reports the module offline for that poll only.

use unimod_hal::OneWireBus;
use unimod_protocol::{PacketType, RawScratchpad};

use crate::clients::{ClientContext, ClientFactory, ModuleClient, UniClient, UpdateSource};
use crate::codec::ScratchpadCodec;
use crate::config::TimingConfig;
use crate::scheduler::IntervalTimer;

/// Where the line is in its poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinePhase {
    /// Waiting for the next poll
    Idle,
    /// Measurement started, waiting for the module to settle
    Measuring { elapsed_ms: u32 },
}

/// Poll loop for one permanently wired module
pub struct PermanentLine<B> {
    bus: B,
    /// Last good read
    scratchpad: RawScratchpad,
    /// Target of reads, so a failed read never clobbers good data
    incoming: RawScratchpad,
    /// Packet type of the registered module
    client: Option<PacketType>,
    /// `scratchpad` holds indices the module has not stored yet
    unwritten: bool,
    phase: LinePhase,
    timer: IntervalTimer,
    settle_ms: u32,
    online: bool,
}

impl<B: OneWireBus> PermanentLine<B> {
    pub fn new(bus: B, timing: &TimingConfig) -> Self {
        Self {
            bus,
            scratchpad: RawScratchpad::default(),
            incoming: RawScratchpad::default(),
            client: None,
            unwritten: false,
            phase: LinePhase::Idle,
            timer: IntervalTimer::primed(timing.permanent_poll_ms),
            settle_ms: timing.measure_settle_ms,
            online: false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.client.is_some()
    }

    /// Last poll succeeded
    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn phase(&self) -> LinePhase {
        self.phase
    }

    /// Last good scratchpad
    pub fn scratchpad(&self) -> &RawScratchpad {
        &self.scratchpad
    }

    /// Advance the line by `dt_ms`
    pub fn update(&mut self, dt_ms: u32, factory: &ClientFactory, ctx: &mut ClientContext<'_>) {
        if let LinePhase::Measuring { elapsed_ms } = self.phase {
            let elapsed_ms = elapsed_ms.saturating_add(dt_ms);
            if elapsed_ms < self.settle_ms {
                self.phase = LinePhase::Measuring { elapsed_ms };
            } else {
                self.phase = LinePhase::Idle;
                self.read_and_update(factory, ctx);
            }
            return;
        }

        if !self.timer.tick(dt_ms) {
            return;
        }

        if self.client.is_none() {
            if let Err(e) = ScratchpadCodec::begin(&mut self.bus, &mut self.incoming).read() {
                trace!("no module to register: {:?}", e);
                self.online = false;
                return;
            }
            if !self.register_incoming(factory, ctx) {
                return;
            }
        }

        match ScratchpadCodec::begin(&mut self.bus, &mut self.incoming).start_measure() {
            Ok(()) => self.phase = LinePhase::Measuring { elapsed_ms: 0 },
            Err(e) => {
                debug!("start measure failed: {:?}", e);
                self.report_offline(factory, ctx);
            }
        }
    }

    fn read_and_update(&mut self, factory: &ClientFactory, ctx: &mut ClientContext<'_>) {
        if let Err(e) = ScratchpadCodec::begin(&mut self.bus, &mut self.incoming).read() {
            debug!("permanent line read failed: {:?}", e);
            self.report_offline(factory, ctx);
            return;
        }

        if self.is_swapped(factory, ctx.dispatcher.controller_id()) {
            info!("module swapped on permanent line, re-registering");
            self.register_incoming(factory, ctx);
            return;
        }

        self.scratchpad.clone_from(&self.incoming);
        self.online = true;

        let client = factory.client(&self.scratchpad);
        if client.update(&mut self.scratchpad, true, UpdateSource::OneWire, ctx) {
            if let Err(e) = ScratchpadCodec::begin(&mut self.bus, &mut self.scratchpad).write() {
                debug!("write back failed: {:?}", e);
            }
        }
    }

    /// `incoming` holds a different module than the registered one
    ///
    /// A module of the same kind that another controller has claimed counts
    /// too. Modules without a client never carry our id and are exempt.
    fn is_swapped(&self, factory: &ClientFactory, controller_id: u8) -> bool {
        if !self.incoming.head.is_same_type(&self.scratchpad.head) {
            return true;
        }
        self.incoming.head.controller_id != controller_id
            && !matches!(factory.client(&self.incoming), UniClient::Dummy)
    }

    /// Register the module in `incoming` and adopt it as the line's module
    ///
    /// The line only counts as registered once the module has stored its
    /// indices. Returns whether that happened.
    fn register_incoming(&mut self, factory: &ClientFactory, ctx: &mut ClientContext<'_>) -> bool {
        if self.unwritten && self.incoming.head.is_same_type(&self.scratchpad.head) {
            // Retry with the indices assigned on the failed attempt
            self.incoming.clone_from(&self.scratchpad);
        }

        let kind = self.incoming.kind();
        let changed = factory.client_for(kind).register(&mut self.incoming, ctx);
        ctx.dispatcher.save_if_dirty(ctx.store);
        self.scratchpad.clone_from(&self.incoming);

        if changed || self.unwritten {
            let mut codec = ScratchpadCodec::begin(&mut self.bus, &mut self.incoming);
            if let Err(e) = codec.write().and_then(|()| codec.save()) {
                debug!("registration write back failed: {:?}", e);
                self.unwritten = true;
                self.client = None;
                self.online = false;
                return false;
            }
        }

        self.unwritten = false;
        self.client = Some(kind);
        self.online = true;
        true
    }

    fn report_offline(&mut self, factory: &ClientFactory, ctx: &mut ClientContext<'_>) {
        self.online = false;
        if let Some(kind) = self.client {
            // Clients never ask for a write while offline
            let _ = factory
                .client_for(kind)
                .update(&mut self.scratchpad, false, UpdateSource::OneWire, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeModule;
    use super::*;
    use crate::clients::testing::{Fixture, CONTROLLER_ID};
    use crate::config::HardcodedCounts;
    use crate::traits::StateRef;
    use unimod_protocol::views::{ExecutionSlot, ExecutionView, SensorSlot, SensorsView, SlotType};
    use unimod_protocol::{Reading, SensorType, NO_SENSOR_REGISTERED};

    const TIMING: TimingConfig = TimingConfig {
        permanent_poll_ms: 1000,
        measure_settle_ms: 200,
        rs485_broadcast_ms: 1000,
        rs485_poll_ms: 500,
        rs485_tx_timeout_ms: 50,
        rs485_reply_timeout_ms: 100,
        nrf_default_query_ms: 10_000,
    };

    fn thermometer(reading: [u8; 4]) -> RawScratchpad {
        let mut scratchpad = RawScratchpad::new(PacketType::Sensors);
        let mut view = SensorsView::default();
        view.sensors[0] = SensorSlot::new(SensorType::Temperature, NO_SENSOR_REGISTERED, reading);
        view.encode(&mut scratchpad.data);
        scratchpad.update_crc();
        scratchpad
    }

    fn set_reading(module: &mut FakeModule, reading: [u8; 4]) {
        let mut view = SensorsView::decode(&module.image.data);
        view.sensors[0].data = reading;
        view.encode(&mut module.image.data);
        module.image.update_crc();
    }

    #[test]
    fn test_registers_then_measures() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut line = PermanentLine::new(FakeModule::new(thermometer([0x80, 0, 0, 0])), &TIMING);

        // First tick registers and starts a measurement
        line.update(0, &factory, &mut fixture.ctx());
        assert!(line.is_registered());
        assert_eq!(line.phase(), LinePhase::Measuring { elapsed_ms: 0 });
        assert_eq!(line.bus.writes, 1);
        assert_eq!(line.bus.measures, 1);
        assert_eq!(line.bus.image.head.controller_id, CONTROLLER_ID);

        set_reading(&mut line.bus, [21, 50, 0, 0]);

        // Still settling
        line.update(100, &factory, &mut fixture.ctx());
        assert_eq!(fixture.states.pushes, 0);

        line.update(100, &factory, &mut fixture.ctx());
        assert_eq!(line.phase(), LinePhase::Idle);
        assert!(line.is_online());
        assert_eq!(
            fixture.states.value(StateRef::primary(SensorType::Temperature, 0)),
            Some(Reading::Temperature { c_x100: 2150 })
        );
    }

    #[test]
    fn test_absent_module_is_retried() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut module = FakeModule::new(thermometer([0; 4]));
        module.present = false;
        let mut line = PermanentLine::new(module, &TIMING);

        line.update(0, &factory, &mut fixture.ctx());
        assert!(!line.is_registered());
        assert!(!line.is_online());

        line.bus.present = true;
        line.update(999, &factory, &mut fixture.ctx());
        assert!(!line.is_registered());
        line.update(1, &factory, &mut fixture.ctx());
        assert!(line.is_registered());
    }

    #[test]
    fn test_failed_registration_write_is_retried() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut module = FakeModule::new(thermometer([21, 50, 0, 0]));
        // The registration write finds no module
        module.drop_reset = Some(2);
        let mut line = PermanentLine::new(module, &TIMING);

        line.update(0, &factory, &mut fixture.ctx());
        assert!(!line.is_registered());
        assert!(!line.is_online());
        assert_eq!(line.phase(), LinePhase::Idle);
        assert_eq!(line.bus.writes, 0);
        assert_eq!(line.bus.measures, 0);
        assert_eq!(fixture.dispatcher.uni_count(SensorType::Temperature), 1);

        // Next poll writes the same index instead of taking a new one
        line.update(1000, &factory, &mut fixture.ctx());
        assert!(line.is_registered());
        assert_eq!(line.bus.writes, 1);
        assert_eq!(line.bus.saves, 1);
        assert_eq!(line.bus.image.head.controller_id, CONTROLLER_ID);
        assert_eq!(SensorsView::decode(&line.bus.image.data).sensors[0].index, 0);

        line.update(200, &factory, &mut fixture.ctx());
        assert!(line.is_online());
        assert_eq!(fixture.dispatcher.uni_count(SensorType::Temperature), 1);
        assert_eq!(
            fixture.states.value(StateRef::primary(SensorType::Temperature, 0)),
            Some(Reading::Temperature { c_x100: 2150 })
        );
    }

    #[test]
    fn test_claimed_by_other_controller_reregisters() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut line = PermanentLine::new(FakeModule::new(thermometer([0x80, 0, 0, 0])), &TIMING);
        line.update(0, &factory, &mut fixture.ctx());
        line.update(200, &factory, &mut fixture.ctx());
        assert_eq!(line.bus.writes, 1);

        // Same kind of module, but another controller wrote its id
        line.bus.image.head.controller_id = CONTROLLER_ID + 1;
        line.bus.image.update_crc();

        line.update(1000, &factory, &mut fixture.ctx());
        line.update(200, &factory, &mut fixture.ctx());
        assert_eq!(line.bus.writes, 2);
        assert_eq!(line.bus.image.head.controller_id, CONTROLLER_ID);
        assert_eq!(line.scratchpad().head.controller_id, CONTROLLER_ID);
        assert!(line.is_registered());
    }

    #[test]
    fn test_failed_read_marks_offline_for_one_poll() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut line = PermanentLine::new(FakeModule::new(thermometer([0x80, 0, 0, 0])), &TIMING);
        let state = StateRef::primary(SensorType::Temperature, 0);

        line.update(0, &factory, &mut fixture.ctx());
        set_reading(&mut line.bus, [20, 0, 0, 0]);
        line.update(200, &factory, &mut fixture.ctx());
        assert!(fixture.states.value(state).is_some());

        // Next poll: CRC error on read
        line.bus.corrupt_reads = true;
        line.update(1000, &factory, &mut fixture.ctx());
        line.update(200, &factory, &mut fixture.ctx());
        assert!(!line.is_online());
        assert_eq!(fixture.states.value(state), None);

        // And the one after recovers
        line.bus.corrupt_reads = false;
        line.update(1000, &factory, &mut fixture.ctx());
        line.update(200, &factory, &mut fixture.ctx());
        assert!(line.is_online());
        assert_eq!(fixture.states.value(state), Some(Reading::Temperature { c_x100: 2000 }));
    }

    #[test]
    fn test_execution_module_written_each_poll() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        fixture.controller.state.set_light_channel(1, true);
        let factory = ClientFactory::default();

        let mut board = RawScratchpad::new(PacketType::Execution);
        let mut view = ExecutionView::default();
        view.slots[0] = ExecutionSlot::new(SlotType::LightChannel, 1);
        view.encode(&mut board.data);
        board.update_crc();

        let mut line = PermanentLine::new(FakeModule::new(board), &TIMING);
        line.update(0, &factory, &mut fixture.ctx());
        line.update(200, &factory, &mut fixture.ctx());

        // Registration write plus one status write
        assert_eq!(line.bus.writes, 2);
        assert_eq!(ExecutionView::decode(&line.bus.image.data).slots[0].status, 1);
    }

    #[test]
    fn test_module_swap_reregisters() {
        let mut fixture = Fixture::new(HardcodedCounts::default());
        let factory = ClientFactory::default();
        let mut line = PermanentLine::new(FakeModule::new(thermometer([0x80, 0, 0, 0])), &TIMING);
        line.update(0, &factory, &mut fixture.ctx());
        line.update(200, &factory, &mut fixture.ctx());

        // A humidity module replaces the thermometer between polls
        let mut humidity = RawScratchpad::new(PacketType::Sensors);
        humidity.head.packet_subtype = 1;
        let mut view = SensorsView::default();
        view.sensors[0] = SensorSlot::new(SensorType::Humidity, NO_SENSOR_REGISTERED, [0x80, 0, 0x80, 0]);
        view.encode(&mut humidity.data);
        humidity.update_crc();
        line.bus.image = humidity;

        line.update(1000, &factory, &mut fixture.ctx());
        line.update(200, &factory, &mut fixture.ctx());
        assert_eq!(fixture.dispatcher.uni_count(SensorType::Humidity), 1);
        assert_eq!(line.scratchpad().head.packet_subtype, 1);
    }
}
