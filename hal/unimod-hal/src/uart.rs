//! UART serial communication abstractions
//!
//! Blocking traits with explicit timeouts, as needed by request/response
//! buses.

/// UART transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been queued or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Wait until the last stop bit has left the shift register
    ///
    /// Returns `false` if `timeout_ms` elapsed first.
    fn wait_idle(&mut self, timeout_ms: u32) -> bool;
}

/// UART receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Read into `buf` until it is full or `timeout_ms` passes without data
    ///
    /// Returns the number of bytes received, which may be zero.
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;
}

