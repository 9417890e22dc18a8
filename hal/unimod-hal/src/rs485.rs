//! Half-duplex RS-485 line
//!
//! The transceiver's driver-enable (DE) pin decides who may talk. The master
//! raises it, sends, waits for the shift register to drain and drops it
//! again before listening.

use embedded_hal::digital::OutputPin;

use crate::uart::{UartRx, UartTx};

/// Line direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusDirection {
    Transmit,
    Receive,
}

/// A half-duplex RS-485 port
pub trait Rs485Port {
    /// Error type for line operations
    type Error;

    /// Switch the transceiver direction
    fn set_direction(&mut self, direction: BusDirection) -> Result<(), Self::Error>;

    /// Send bytes; the line must be in [`BusDirection::Transmit`]
    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Wait for the last byte to leave the wire
    ///
    /// Returns `false` on timeout.
    fn wait_transmit_complete(&mut self, timeout_ms: u32) -> bool;

    /// Receive up to `buf.len()` bytes within `timeout_ms`
    fn recv(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;
}

/// Errors from [`HalfDuplex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalfDuplexError<U, P> {
    /// UART transfer failed
    Uart(U),
    /// Driver-enable pin could not be switched
    Pin(P),
}

/// RS-485 port built from a UART and a driver-enable pin
pub struct HalfDuplex<U, DE> {
    uart: U,
    de: DE,
}

impl<U, DE> HalfDuplex<U, DE> {
    pub fn new(uart: U, de: DE) -> Self {
        Self { uart, de }
    }

    /// Give back the UART and pin
    pub fn release(self) -> (U, DE) {
        (self.uart, self.de)
    }
}

impl<U, DE, E> Rs485Port for HalfDuplex<U, DE>
where
    U: UartTx<Error = E> + UartRx<Error = E>,
    DE: OutputPin,
{
    type Error = HalfDuplexError<E, DE::Error>;

    fn set_direction(&mut self, direction: BusDirection) -> Result<(), Self::Error> {
        match direction {
            BusDirection::Transmit => self.de.set_high(),
            BusDirection::Receive => self.de.set_low(),
        }
        .map_err(HalfDuplexError::Pin)
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.uart.write_blocking(data).map_err(HalfDuplexError::Uart)?;
        self.uart.flush().map_err(HalfDuplexError::Uart)
    }

    fn wait_transmit_complete(&mut self, timeout_ms: u32) -> bool {
        self.uart.wait_idle(timeout_ms)
    }

    fn recv(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        self.uart
            .read_timeout(buf, timeout_ms)
            .map_err(HalfDuplexError::Uart)
    }
}
