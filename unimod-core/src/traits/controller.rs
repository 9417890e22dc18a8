//! Controller link trait

use unimod_protocol::{ControllerState, DisplayRequest};

/// What modules may see of, and ask from, the controller
pub trait ControllerLink {
    /// Current actuator snapshot broadcast to execution modules
    fn controller_state(&self) -> ControllerState;

    /// Window `(open, close)` temperature thresholds in whole °C
    fn window_thresholds(&self) -> (u8, u8);

    /// Carry out a request raised on a Nextion display
    fn apply_display_request(&mut self, request: DisplayRequest);
}
