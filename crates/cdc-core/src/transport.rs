//! The raw bus transport seam.

use std::io;

/// Access to the raw I/K-bus, bound to one (device, peer) address pair.
///
/// The transport guarantees delivery ordering and address filtering: frames
/// returned by [`read_frame`](BusTransport::read_frame) are already known to
/// be addressed to this device (or broadcast). Writes are best-effort; the
/// engine logs failures and never retries.
pub trait BusTransport: Send {
    /// Read one frame into `buf`, blocking until one arrives.
    /// Returns the frame length.
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one complete frame.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}
