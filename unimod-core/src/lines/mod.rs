//! Directly wired 1-Wire lines
//!
//! A [`RegistrationLine`] onboards modules plugged into a dedicated port; a
//! [`PermanentLine`] keeps polling a module that stays attached. Each line
//! owns its own scratchpad buffers.

pub mod permanent;
pub mod registration;

pub use permanent::{LinePhase, PermanentLine};
pub use registration::RegistrationLine;

use crate::codec::CodecError;

/// Errors from line operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// No module answered the presence probe
    NotPresent,
    /// The scratchpad could not be read intact
    ReadFailed,
}

impl From<CodecError> for LineError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::NotPresent => LineError::NotPresent,
            CodecError::Crc => LineError::ReadFailed,
        }
    }
}
