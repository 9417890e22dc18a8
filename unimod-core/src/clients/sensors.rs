//! Sensor module client

use unimod_protocol::views::SensorsView;
use unimod_protocol::RawScratchpad;

use super::{apply_sensor_data, mark_sensor_unknown, ClientContext, ModuleClient, UpdateSource};

/// Handles modules carrying up to three sensors
///
/// Registration gives every slot an index, keeping indices the module
/// already holds from this controller. Updates accept either transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorsClient;

impl ModuleClient for SensorsClient {
    fn register(&self, scratchpad: &mut RawScratchpad, ctx: &mut ClientContext<'_>) -> bool {
        let mut view = SensorsView::decode(&scratchpad.data);
        let controller_id = ctx.dispatcher.controller_id();
        let foreign = scratchpad.head.controller_id != controller_id;
        let mut changed = false;

        if foreign {
            debug!(
                "module owned by controller {=u8}, reassigning indices",
                scratchpad.head.controller_id
            );
        }

        for slot in view.sensors.iter_mut() {
            let Some(sensor) = slot.kind() else {
                continue;
            };
            let Some(next) = ctx.dispatcher.next_index(sensor) else {
                continue;
            };

            let unassigned = foreign
                || !slot.has_index()
                || slot.index < ctx.dispatcher.hardcoded_count(sensor)
                || slot.index > next;
            if unassigned && slot.index != next {
                slot.index = next;
                changed = true;
            }

            if ctx.dispatcher.add_uni_sensor(ctx.states, sensor, slot.index) {
                // No data until the first good read
                mark_sensor_unknown(ctx.dispatcher, ctx.states, sensor, slot.index);
            }
        }

        if foreign {
            scratchpad.head.controller_id = controller_id;
            changed = true;
        }

        if changed {
            view.encode(&mut scratchpad.data);
            scratchpad.update_crc();
        }
        changed
    }

    fn update(
        &self,
        scratchpad: &mut RawScratchpad,
        online: bool,
        _source: UpdateSource,
        ctx: &mut ClientContext<'_>,
    ) -> bool {
        if scratchpad.head.controller_id != ctx.dispatcher.controller_id() {
            return false;
        }

        let view = SensorsView::decode(&scratchpad.data);
        for slot in view.sensors.iter() {
            let Some(sensor) = slot.kind() else {
                continue;
            };
            if slot.has_index() {
                apply_sensor_data(
                    ctx.dispatcher,
                    ctx.states,
                    sensor,
                    slot.index,
                    &slot.data,
                    online,
                );
            }
        }
        false
    }
}
