//! Cooperative scheduling
//!
//! Everything is driven by `update(dt_ms)` calls from the firmware's main
//! loop. Components keep their own [`IntervalTimer`]s and never block longer
//! than one transport timeout.

pub mod hub;
pub mod timer;

pub use hub::ModuleHub;
pub use timer::IntervalTimer;
