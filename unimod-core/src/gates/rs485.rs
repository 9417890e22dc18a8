//! RS-485 gateway (pull model)
//!
//! Two duties run on their own timers:
//! - execution duty: broadcast the controller state, no reply expected
//! - sensor duty: poll the next registered sensor in round-robin order
//!
//! A full pass over the queue is a cycle. Sensors that replied during a
//! cycle form that cycle's online set. A sensor silent for
//! [`RS485_OFFLINE_AFTER_MISSED_CYCLES`] cycles in a row is offline and its
//! states are marked unknown until it answers again.

use heapless::Vec;
use unimod_hal::{BusDirection, Rs485Port};
use unimod_protocol::{ControllerState, Rs485Packet, SensorType, RS485_PACKET_SIZE};

use crate::clients::{apply_sensor_data, mark_sensor_unknown, ClientContext};
use crate::config::{TimingConfig, MAX_RS485_QUEUE};
use crate::registry::RegistrationDispatcher;
use crate::scheduler::IntervalTimer;

/// Consecutive silent cycles before a sensor is offline
pub const RS485_OFFLINE_AFTER_MISSED_CYCLES: u8 = 3;

/// One polled sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollItem {
    pub sensor: SensorType,
    pub index: u8,
}

#[derive(Debug, Clone, Copy)]
struct PollEntry {
    item: PollItem,
    missed_cycles: u8,
    offline: bool,
}

/// RS-485 master
pub struct Rs485Gate<P> {
    port: P,
    execution_duty: bool,
    broadcast_timer: IntervalTimer,
    poll_timer: IntervalTimer,
    tx_timeout_ms: u32,
    reply_timeout_ms: u32,
    queue: Vec<PollEntry, MAX_RS485_QUEUE>,
    cursor: usize,
    /// Replied during the current cycle
    online: Vec<PollItem, MAX_RS485_QUEUE>,
    /// Replied during the last completed cycle
    last_cycle_online: Vec<PollItem, MAX_RS485_QUEUE>,
    overflow_logged: bool,
}

impl<P: Rs485Port> Rs485Gate<P> {
    /// Create a gate; `execution_duty` enables the state broadcast
    pub fn new(port: P, timing: &TimingConfig, execution_duty: bool) -> Self {
        Self {
            port,
            execution_duty,
            broadcast_timer: IntervalTimer::primed(timing.rs485_broadcast_ms),
            poll_timer: IntervalTimer::new(timing.rs485_poll_ms),
            tx_timeout_ms: timing.rs485_tx_timeout_ms,
            reply_timeout_ms: timing.rs485_reply_timeout_ms,
            queue: Vec::new(),
            cursor: 0,
            online: Vec::new(),
            last_cycle_online: Vec::new(),
            overflow_logged: false,
        }
    }

    /// Advance both duties by `dt_ms`
    pub fn update(&mut self, dt_ms: u32, ctx: &mut ClientContext<'_>) {
        if self.execution_duty && self.broadcast_timer.tick(dt_ms) {
            self.broadcast_state(&ctx.controller.controller_state());
        }

        if self.poll_timer.tick(dt_ms) {
            self.refresh_queue(ctx.dispatcher);
            self.poll_next(ctx);
        }
    }

    /// Send the controller state to every execution module
    pub fn broadcast_state(&mut self, state: &ControllerState) {
        let packet = Rs485Packet::controller_state(state).encode();
        if !self.transmit(&packet) {
            debug!("RS-485 state broadcast failed");
        }
    }

    /// Queue every registered sensor not queued yet
    pub fn refresh_queue(&mut self, dispatcher: &RegistrationDispatcher) {
        for (sensor, index) in dispatcher.registered_sensors() {
            let item = PollItem { sensor, index };
            if self.queue.iter().any(|e| e.item == item) {
                continue;
            }
            let entry = PollEntry {
                item,
                missed_cycles: 0,
                offline: false,
            };
            if self.queue.push(entry).is_err() {
                if !self.overflow_logged {
                    warn!("RS-485 poll queue full, {} {=u8} not polled", sensor, index);
                    self.overflow_logged = true;
                }
                break;
            }
        }
    }

    /// Poll the sensor at the cursor and advance it
    pub fn poll_next(&mut self, ctx: &mut ClientContext<'_>) {
        if self.queue.is_empty() {
            return;
        }
        if self.cursor >= self.queue.len() {
            self.cursor = 0;
        }

        let item = self.queue[self.cursor].item;
        if let Some(data) = self.query(item) {
            apply_sensor_data(ctx.dispatcher, ctx.states, item.sensor, item.index, &data, true);

            let entry = &mut self.queue[self.cursor];
            if entry.offline {
                info!("RS-485 {} {=u8} back online", item.sensor, item.index);
            }
            entry.missed_cycles = 0;
            entry.offline = false;

            if !self.online.contains(&item) {
                // Bounded by the queue length
                let _ = self.online.push(item);
            }
        }

        self.cursor += 1;
        if self.cursor >= self.queue.len() {
            self.cursor = 0;
            self.end_cycle(ctx);
        }
    }

    /// Polled sensors in poll order
    pub fn queue(&self) -> impl Iterator<Item = PollItem> + '_ {
        self.queue.iter().map(|e| e.item)
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Sensors that replied during the last completed cycle
    pub fn last_cycle_online(&self) -> &[PollItem] {
        &self.last_cycle_online
    }

    /// Sensor is queued and not offline
    pub fn is_online(&self, sensor: SensorType, index: u8) -> bool {
        let item = PollItem { sensor, index };
        self.queue.iter().any(|e| e.item == item && !e.offline)
    }

    /// Consecutive silent cycles of a queued sensor
    pub fn missed_cycles(&self, sensor: SensorType, index: u8) -> Option<u8> {
        let item = PollItem { sensor, index };
        self.queue
            .iter()
            .find(|e| e.item == item)
            .map(|e| e.missed_cycles)
    }

    fn end_cycle(&mut self, ctx: &mut ClientContext<'_>) {
        for entry in self.queue.iter_mut() {
            if self.online.contains(&entry.item) {
                continue;
            }
            entry.missed_cycles = entry.missed_cycles.saturating_add(1);
            if !entry.offline && entry.missed_cycles >= RS485_OFFLINE_AFTER_MISSED_CYCLES {
                entry.offline = true;
                warn!(
                    "RS-485 {} {=u8} offline after {=u8} silent cycles",
                    entry.item.sensor,
                    entry.item.index,
                    entry.missed_cycles
                );
                mark_sensor_unknown(ctx.dispatcher, ctx.states, entry.item.sensor, entry.item.index);
            }
        }

        self.last_cycle_online.clone_from(&self.online);
        self.online.clear();
    }

    /// Request one sensor's reading; `None` if no valid matching reply
    fn query(&mut self, item: PollItem) -> Option<[u8; 4]> {
        let request = Rs485Packet::sensor_request(item.sensor, item.index).encode();
        if !self.transmit(&request) {
            return None;
        }

        let mut buffer = [0u8; RS485_PACKET_SIZE];
        let len = match self.port.recv(&mut buffer, self.reply_timeout_ms) {
            Ok(len) => len,
            Err(_) => {
                debug!("RS-485 receive error");
                return None;
            }
        };
        if len < RS485_PACKET_SIZE {
            trace!("RS-485 {} {=u8}: no reply", item.sensor, item.index);
            return None;
        }

        let packet = match Rs485Packet::decode(&buffer) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("RS-485 bad reply: {:?}", e);
                return None;
            }
        };

        let (sensor, index, data) = packet.reply_reading()?;
        (sensor == item.sensor.to_byte() && index == item.index).then_some(data)
    }

    /// Drive the line, send, drain, and release it for the reply
    fn transmit(&mut self, bytes: &[u8]) -> bool {
        if self.port.set_direction(BusDirection::Transmit).is_err() {
            return false;
        }
        let sent = self.port.send(bytes).is_ok()
            && self.port.wait_transmit_complete(self.tx_timeout_ms);
        let released = self.port.set_direction(BusDirection::Receive).is_ok();
        sent && released
    }
}
