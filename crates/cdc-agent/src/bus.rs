//! Unix datagram transport to the bus bridge daemon.
//!
//! One datagram carries one frame. The bridge mirrors all bus traffic to
//! every connected client, so inbound filtering happens here: only frames
//! addressed to the changer (or broadcast) and not sent by it are handed to
//! the engine.

use std::fs;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::Path;

use cdc_core::BusTransport;
use ibus_protocol::{DEV_BROADCAST, DEV_CDC, FRM_RECEIVER, FRM_SENDER};
use tracing::trace;

/// A [`BusTransport`] over a pair of Unix datagram socket paths.
pub struct UnixDatagramBus {
    socket: UnixDatagram,
}

impl UnixDatagramBus {
    /// Bind `local` and connect to the bridge socket at `peer`.
    /// A stale socket file at `local` is removed first.
    pub fn connect(local: &Path, peer: &Path) -> io::Result<Self> {
        if local.exists() {
            fs::remove_file(local)?;
        }
        let socket = UnixDatagram::bind(local)?;
        socket.connect(peer)?;
        Ok(UnixDatagramBus { socket })
    }

    /// Clone the underlying socket for a dedicated reader thread.
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(UnixDatagramBus {
            socket: self.socket.try_clone()?,
        })
    }

    #[cfg(test)]
    fn from_socket(socket: UnixDatagram) -> Self {
        UnixDatagramBus { socket }
    }
}

impl BusTransport for UnixDatagramBus {
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let len = self.socket.recv(buf)?;
            let frame = &buf[..len];
            if len <= FRM_RECEIVER {
                trace!(len, "dropping runt datagram");
                continue;
            }
            // The bridge echoes our own writes back.
            if frame[FRM_SENDER] == DEV_CDC {
                continue;
            }
            match frame[FRM_RECEIVER] {
                DEV_CDC | DEV_BROADCAST => return Ok(len),
                other => {
                    trace!(receiver = other, "dropping frame for another device");
                    continue;
                }
            }
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.socket.send(frame)?;
        Ok(())
    }
}
