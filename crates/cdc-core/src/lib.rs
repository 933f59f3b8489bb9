//! # cdc-core
//!
//! The CD changer emulation core: the wire-visible protocol engine
//! ([`Changer`]), the magazine that binds disc slots to media players
//! ([`Magazine`]), and the single-threaded [`DispatchLoop`] that serializes
//! bus frames, the heartbeat timer, and player events into one ordered
//! stream of state mutations.
//!
//! The collaborators at the edges are traits: [`BusTransport`] for the raw
//! bus and [`PlayerHandle`]/[`PlayerFactory`] for per-session playback
//! control. The binary crate provides the real implementations; tests drive
//! the core with recording mocks.

mod changer;
mod dispatch;
mod events;
mod magazine;
mod player;
mod transport;

pub use changer::*;
pub use dispatch::*;
pub use events::*;
pub use magazine::*;
pub use player::*;
pub use transport::*;
