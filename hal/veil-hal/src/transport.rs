//! HCI transport abstraction
//!
//! Byte-level access to the controller for the UART (H4) framing in
//! `veil-protocol`. Implemented by chip-specific UART or IPC drivers.

/// Byte stream to and from the link-layer controller
pub trait HciTransport {
    /// Error type for transport operations
    type Error: core::fmt::Debug;

    /// Write data to the controller
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Read whatever bytes have arrived, without blocking
    ///
    /// Returns the number of bytes copied into `buf`; 0 when nothing is
    /// pending.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}
