//! Frame interpretation and the outbound frame templates.

use crate::constants::*;
use crate::error::ProtocolError;

// ============================================================================
// Inbound Frames
// ============================================================================

/// A decoded inbound frame addressed to the changer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Device status poll from the head unit.
    StatusRequest,
    /// Diagnostic identity request.
    IdentityRequest,
    /// Playback control request.
    Control(ControlTask),
}

/// A decoded playback control task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTask {
    /// Request a status report.
    StatusReq,
    /// Stop playback.
    Stop,
    /// Pause playback.
    Pause,
    /// Start playback.
    Play,
    /// Fast wind in either direction.
    Fast {
        /// Wind forward; rewind otherwise.
        forward: bool,
    },
    /// Skip to an adjacent track.
    ChangeTrack {
        /// Skip backward; forward otherwise.
        previous: bool,
    },
    /// Select another disc.
    ChangeDisc {
        /// Target disc number as sent by the head unit.
        disc: u8,
    },
    /// Toggle scan sampling mode.
    Scan {
        /// Enable scan mode.
        on: bool,
    },
    /// Toggle random mode.
    Random {
        /// Enable random mode.
        on: bool,
    },
}

/// Check whether a raw frame carries changer control traffic.
///
/// Only frames of total length 5 to 7 bytes are actionable; anything else is
/// dropped by the caller without further inspection.
pub fn is_actionable(frame: &[u8]) -> bool {
    (MIN_ACTIONABLE_LEN..=MAX_ACTIONABLE_LEN).contains(&frame.len())
}

impl Inbound {
    /// Decode an actionable frame.
    ///
    /// The caller is expected to have checked [`is_actionable`]; a frame
    /// shorter than the fields it needs still yields `FrameTooShort` rather
    /// than panicking. A missing argument byte reads as 0.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() <= FRM_COMMAND {
            return Err(ProtocolError::FrameTooShort {
                expected: FRM_COMMAND + 1,
                actual: frame.len(),
            });
        }

        match frame[FRM_COMMAND] {
            MSG_DEV_STAT_REQ => Ok(Inbound::StatusRequest),
            MSG_DIAG_READ_IDENT => Ok(Inbound::IdentityRequest),
            MSG_CD_CONTROL => {
                if frame.len() <= FRM_TASK {
                    return Err(ProtocolError::FrameTooShort {
                        expected: FRM_TASK + 1,
                        actual: frame.len(),
                    });
                }
                let task = frame[FRM_TASK];
                let arg = frame.get(FRM_ARG).copied().unwrap_or(0);
                Ok(Inbound::Control(ControlTask::decode(task, arg)?))
            }
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

impl ControlTask {
    /// Decode a control task byte and its argument.
    pub fn decode(task: u8, arg: u8) -> Result<Self, ProtocolError> {
        match task {
            TASK_STAT_REQ => Ok(ControlTask::StatusReq),
            TASK_STOP => Ok(ControlTask::Stop),
            TASK_PAUSE => Ok(ControlTask::Pause),
            TASK_PLAY => Ok(ControlTask::Play),
            TASK_FAST => Ok(ControlTask::Fast { forward: arg != 0 }),
            // Two task codes alias to the same track-change behavior.
            TASK_CHANGE_TRACK | TASK_CHANGE_TRACK_ALT => {
                Ok(ControlTask::ChangeTrack { previous: arg != 0 })
            }
            TASK_CHANGE_DISC => Ok(ControlTask::ChangeDisc { disc: arg }),
            TASK_SCAN => Ok(ControlTask::Scan { on: arg == 1 }),
            TASK_RANDOM => Ok(ControlTask::Random { on: arg == 1 }),
            other => Err(ProtocolError::UnknownTask(other)),
        }
    }
}

// ============================================================================
// Outbound Frames
// ============================================================================

/// Variant byte of the announce frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announce {
    /// Periodic presence broadcast.
    Present,
    /// One-shot ready broadcast sent at startup.
    Ready,
}

impl Announce {
    fn variant_byte(self) -> u8 {
        match self {
            Announce::Present => 0x00,
            Announce::Ready => 0x01,
        }
    }
}

/// Encode the 5-byte device announce frame.
pub fn announce_frame(variant: Announce) -> [u8; ANNOUNCE_FRAME_LEN] {
    [
        DEV_CDC,
        0x04,
        DEV_BROADCAST,
        MSG_DEV_STAT_READY,
        variant.variant_byte(),
    ]
}

/// Encode the 16-byte diagnostic identity frame.
///
/// Entirely static: hardware/code/diagnostic/bus indices, production week
/// and year, vendor and software version bytes.
pub fn identity_frame() -> [u8; IDENTITY_FRAME_LEN] {
    [
        DEV_CDC,
        0x0F,
        DEV_DIAG,
        MSG_DIAG_ACK,
        0x80,
        0x00,
        0x00,
        0x00,
        0x01, // hardware version
        0x01, // code index
        0x01, // diagnostic index
        0x01, // bus index
        0x21, // week
        0x16, // year
        0xFF, // vendor
        0x01, // software version
    ]
}

/// The changer status report, addressed to the head unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    /// Playback status code (`STAT_*`).
    pub status: u8,
    /// Acknowledge flags (`ACK_*`).
    pub ack: u8,
    /// Error flags (`ERR_*`).
    pub error_mask: u8,
    /// Disc presence mask, bit n-1 set when disc n is loaded.
    pub disc_mask: u8,
    /// Currently selected disc, 0 when none.
    pub disc: u8,
    /// Wire-encoded current track (see [`encode_track`]).
    pub track: u8,
}

impl StatusFrame {
    /// Encode the 11-byte status frame.
    pub fn encode(&self) -> [u8; STATUS_FRAME_LEN] {
        [
            DEV_CDC,
            0x0A,
            DEV_RADIO,
            MSG_CD_STATUS,
            self.status,
            self.ack,
            self.error_mask,
            self.disc_mask,
            0x00,
            self.disc,
            self.track,
        ]
    }
}

// ============================================================================
// Track Encoding
// ============================================================================

/// Encode a track number for the status frame.
///
/// The display firmware expects the ones digit in the low nibble and the
/// tens digit in the high nibble (pseudo-BCD); values of 100 and above wrap
/// via the modulo. Must stay bit-exact:
/// `(n % 10 + (n / 10) * 16) % 160`.
pub fn encode_track(n: u8) -> u8 {
    let n = n as u16;
    ((n % 10 + (n / 10) * 16) % 160) as u8
}
