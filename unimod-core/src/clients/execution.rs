//! Relay/actuator module client

use unimod_protocol::views::{ExecutionView, SlotType};
use unimod_protocol::{ControllerState, RawScratchpad, WindowChannel};

use super::{ClientContext, ModuleClient, UpdateSource};

/// Mirrors controller actuator state into a relay board's slots
///
/// Only wired modules are driven; a radio can't carry the write-back.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionClient;

impl ExecutionClient {
    /// Status byte for one slot, `None` for empty or unknown slots
    fn slot_status(state: &ControllerState, slot_type: SlotType, linked: u8) -> Option<u8> {
        let on = match slot_type {
            SlotType::Empty => return None,
            SlotType::WindowLeftChannel => state.window_channel(linked, WindowChannel::Left),
            SlotType::WindowRightChannel => state.window_channel(linked, WindowChannel::Right),
            SlotType::WateringChannel => state.watering_channel(linked),
            SlotType::LightChannel => state.light_channel(linked),
            SlotType::Pin => state.pin(linked),
        };
        Some(on as u8)
    }
}

impl ModuleClient for ExecutionClient {
    fn register(&self, scratchpad: &mut RawScratchpad, ctx: &mut ClientContext<'_>) -> bool {
        let controller_id = ctx.dispatcher.controller_id();
        if scratchpad.head.controller_id == controller_id {
            return false;
        }
        scratchpad.head.controller_id = controller_id;
        scratchpad.update_crc();
        true
    }

    fn update(
        &self,
        scratchpad: &mut RawScratchpad,
        online: bool,
        source: UpdateSource,
        ctx: &mut ClientContext<'_>,
    ) -> bool {
        if !online || source == UpdateSource::Radio {
            return false;
        }

        let state = ctx.controller.controller_state();
        let mut view = ExecutionView::decode(&scratchpad.data);
        let mut active = false;

        for slot in view.slots.iter_mut() {
            let Some(slot_type) = slot.kind() else {
                continue;
            };
            if let Some(status) = Self::slot_status(&state, slot_type, slot.linked_data) {
                slot.status = status;
                active = true;
            }
        }

        if active {
            view.encode(&mut scratchpad.data);
            scratchpad.update_crc();
        }
        active
    }
}
