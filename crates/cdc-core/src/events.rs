//! Events emitted by the protocol engine.

/// An event emitted by the [`Changer`](crate::Changer) while handling an
/// inbound frame.
///
/// The engine mutates its own wire state and writes its own responses; these
/// events carry the playback intent onward so the magazine can relay it to
/// the bound media player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangerEvent {
    /// The head unit asked for a status report (already written).
    StatusRequested,
    /// Stop playback.
    Stop,
    /// Pause playback.
    Pause,
    /// Start playback.
    Play,
    /// Fast forward engaged.
    FastForward,
    /// Rewind engaged.
    Rewind,
    /// Skip to the next track.
    Next,
    /// Skip to the previous track.
    Previous,
    /// The head unit asked to select this disc.
    DiscChangeRequested(u8),
    /// Scan sampling mode enabled.
    ScanOn,
    /// Scan sampling mode disabled.
    ScanOff,
    /// Random mode enabled.
    RandomOn,
    /// Random mode disabled.
    RandomOff,
}
