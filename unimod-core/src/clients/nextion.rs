//! Nextion display gateway client

use unimod_protocol::views::{NextionEntry, NextionView, MAX_NEXTION_ENTRIES};
use unimod_protocol::RawScratchpad;

use super::{ClientContext, ModuleClient, UpdateSource};
use crate::config::NextionConfig;
use crate::traits::StateRef;

/// Reported for a configured value with no reading (whole part -128)
const NO_DATA: [u8; 2] = [0x80, 0x00];

/// Serves a remote Nextion display
///
/// Each wired poll forwards the display's button requests to the controller
/// and sends back the controller flags, window thresholds and the configured
/// sensor values.
#[derive(Debug, Clone, Copy)]
pub struct NextionClient<'a> {
    config: &'a NextionConfig,
}

impl<'a> NextionClient<'a> {
    pub fn new(config: &'a NextionConfig) -> Self {
        Self { config }
    }
}

impl ModuleClient for NextionClient<'_> {
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

        let mut view = NextionView::decode(&scratchpad.data);

        for request in view.requests() {
            debug!("display request {}", request);
            ctx.controller.apply_display_request(request);
        }
        view.nextion_status1 = 0;
        view.nextion_status2 = 0;

        view.controller_status = ctx.controller.controller_state().flags();
        let (open, close) = ctx.controller.window_thresholds();
        view.open_temperature = open;
        view.close_temperature = close;

        view.entries = [NextionEntry::default(); MAX_NEXTION_ENTRIES];
        for (entry, shown) in view.entries.iter_mut().zip(self.config.sources.iter()) {
            entry.sensor_type = shown.sensor.to_byte();
            entry.data = ctx
                .states
                .latest(StateRef::primary(shown.sensor, shown.index))
                .map_or(NO_DATA, |reading| reading.to_short_bytes());
        }
        view.data_count = self.config.sources.len() as u8;

        view.encode(&mut scratchpad.data);
        scratchpad.update_crc();
        true
    }
}
