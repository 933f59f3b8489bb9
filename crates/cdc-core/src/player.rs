//! The media player control seam.

use thiserror::Error;

/// Error from a player-control collaborator.
#[derive(Debug, Error)]
#[error("player error: {0}")]
pub struct PlayerError(String);

impl PlayerError {
    /// Wrap a collaborator-specific error message.
    pub fn new(message: impl Into<String>) -> Self {
        PlayerError(message.into())
    }
}

/// Playback control for one media player session.
///
/// Dropping the handle releases the session. Call failures are logged by the
/// magazine and otherwise ignored; playback relays are fire-and-forget.
pub trait PlayerHandle: Send {
    /// Start playback.
    fn play(&mut self) -> Result<(), PlayerError>;
    /// Pause playback.
    fn pause(&mut self) -> Result<(), PlayerError>;
    /// Toggle between play and pause.
    fn play_pause(&mut self) -> Result<(), PlayerError>;
    /// Skip to the next track.
    fn next(&mut self) -> Result<(), PlayerError>;
    /// Skip to the previous track.
    fn previous(&mut self) -> Result<(), PlayerError>;
}

/// Acquires player handles for named sessions.
///
/// `slot` is the callback key: metadata events for the acquired session must
/// arrive on the dispatch channel tagged with this slot number.
pub trait PlayerFactory {
    /// Acquire a handle for the named player session.
    fn connect(&self, name: &str, slot: u8) -> Result<Box<dyn PlayerHandle>, PlayerError>;
}
