//! Protocol constants
//!
//! Command codes, status codes, and flag values used by the CD changer
//! traffic on the I/K-bus.

// ============================================================================
// Device Addresses
// ============================================================================

/// CD changer device address (our address).
pub const DEV_CDC: u8 = 0x18;
/// Radio head unit address.
pub const DEV_RADIO: u8 = 0x68;
/// Multi-information display address.
pub const DEV_MID: u8 = 0xC0;
/// Diagnostic interface address.
pub const DEV_DIAG: u8 = 0x3F;
/// Local broadcast address.
pub const DEV_BROADCAST: u8 = 0xFF;

// ============================================================================
// Frame Field Offsets
// ============================================================================

/// Offset of the sender address byte.
pub const FRM_SENDER: usize = 0;
/// Offset of the length byte.
pub const FRM_LENGTH: usize = 1;
/// Offset of the receiver address byte.
pub const FRM_RECEIVER: usize = 2;
/// Offset of the command byte.
pub const FRM_COMMAND: usize = 3;
/// Offset of the control task byte (control frames only).
pub const FRM_TASK: usize = 4;
/// Offset of the control argument byte (control frames only).
pub const FRM_ARG: usize = 5;

/// Smallest actionable frame (through the task byte).
pub const MIN_ACTIONABLE_LEN: usize = 5;
/// Largest actionable frame.
pub const MAX_ACTIONABLE_LEN: usize = 7;
/// Maximum raw frame size read from the bus.
pub const MAX_FRAME_SIZE: usize = 64;

// ============================================================================
// Command Bytes (head unit → changer, changer → bus)
// ============================================================================

/// Device status poll from the head unit.
pub const MSG_DEV_STAT_REQ: u8 = 0x01;
/// Device status announce ("I am here").
pub const MSG_DEV_STAT_READY: u8 = 0x02;
/// Playback control request.
pub const MSG_CD_CONTROL: u8 = 0x38;
/// Changer status report.
pub const MSG_CD_STATUS: u8 = 0x39;
/// Diagnostic identity request.
pub const MSG_DIAG_READ_IDENT: u8 = 0x00;
/// Diagnostic acknowledge (identity reply).
pub const MSG_DIAG_ACK: u8 = 0xA0;

// ============================================================================
// Control Tasks (byte 4 of a control frame)
// ============================================================================

/// Request a status report.
pub const TASK_STAT_REQ: u8 = 0x00;
/// Stop playback.
pub const TASK_STOP: u8 = 0x01;
/// Pause playback.
pub const TASK_PAUSE: u8 = 0x02;
/// Start playback.
pub const TASK_PLAY: u8 = 0x03;
/// Fast wind (arg 0 = rewind, else fast forward).
pub const TASK_FAST: u8 = 0x04;
/// Change track (arg 0 = next, else previous).
pub const TASK_CHANGE_TRACK: u8 = 0x05;
/// Change disc (arg = target disc 1..6).
pub const TASK_CHANGE_DISC: u8 = 0x06;
/// Scan sampling mode (arg 1 = on, else off).
pub const TASK_SCAN: u8 = 0x07;
/// Random mode (arg 1 = on, else off).
pub const TASK_RANDOM: u8 = 0x08;
/// Change track, alternate code used by some head units.
pub const TASK_CHANGE_TRACK_ALT: u8 = 0x0A;

// ============================================================================
// Status Codes (byte 4 of the status frame)
// ============================================================================

/// Stopped.
pub const STAT_STOP: u8 = 0x00;
/// Paused.
pub const STAT_PAUSE: u8 = 0x01;
/// Playing.
pub const STAT_PLAY: u8 = 0x02;
/// Fast forward.
pub const STAT_FAST_FORWARD: u8 = 0x03;
/// Rewind.
pub const STAT_REWIND: u8 = 0x04;
/// End of track reached, next one loading.
pub const STAT_END_OF_TRACK: u8 = 0x07;
/// Loading a disc.
pub const STAT_LOADING: u8 = 0x08;
/// Checking a disc.
pub const STAT_CD_CHECK: u8 = 0x09;
/// No magazine inserted.
pub const STAT_NO_MAGAZINE: u8 = 0x0A;

// ============================================================================
// Acknowledge Flags (byte 5 of the status frame)
// ============================================================================

/// Pause mode acknowledged.
pub const ACK_PAUSE: u8 = 0x02;
/// Play mode acknowledged.
pub const ACK_PLAY: u8 = 0x09;
/// Scan sampling mode bit.
pub const ACK_SCAN: u8 = 0x10;
/// Random mode bit.
pub const ACK_RANDOM: u8 = 0x20;

// ============================================================================
// Error Flags (byte 6 of the status frame)
// ============================================================================

/// Over-temperature condition.
pub const ERR_HIGH_TEMP: u8 = 1 << 1;
/// Disc read error.
pub const ERR_CD_ERROR: u8 = 1 << 2;
/// Selected disc not present.
pub const ERR_NO_DISC: u8 = 1 << 3;
/// Magazine holds no discs at all.
pub const ERR_NO_DISCS: u8 = 1 << 4;

// ============================================================================
// Sizes
// ============================================================================

/// Number of disc slots in the magazine.
pub const MAGAZINE_SIZE: u8 = 6;
/// Total length of the status frame.
pub const STATUS_FRAME_LEN: usize = 11;
/// Total length of the announce frame.
pub const ANNOUNCE_FRAME_LEN: usize = 5;
/// Total length of the identity frame.
pub const IDENTITY_FRAME_LEN: usize = 16;
