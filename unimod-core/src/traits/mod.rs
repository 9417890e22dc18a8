//! Interfaces to the surrounding controller
//!
//! The core never owns domain state. It reaches the controller's state
//! sinks and actuator snapshot through these traits.

pub mod controller;
pub mod states;

pub use controller::ControllerLink;
pub use states::{SensorState, StateRef, StateRegistry, StateSlot};
