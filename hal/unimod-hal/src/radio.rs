//! Broadcast radio abstraction (nRF24 class transceivers)

/// A packet radio with a single broadcast address and listening pipes
pub trait RadioLink {
    /// Error type for radio operations
    type Error;

    /// Power up and tune to `channel`
    fn init(&mut self, channel: u8) -> Result<(), Self::Error>;

    /// Retune to `channel`
    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error>;

    /// Send one payload to every listener
    fn broadcast(&mut self, payload: &[u8]) -> Result<(), Self::Error>;

    /// Take the next received payload, if any
    ///
    /// Returns the payload length written to `buf`.
    fn poll(&mut self, buf: &mut [u8]) -> Option<usize>;
}
