//! The dispatch loop.
//!
//! One thread owns the engine and the magazine and serializes every event
//! source into a single ordered stream: inbound bus frames, the heartbeat
//! ticker, player presence and metadata notifications, and shutdown. Reader
//! threads at the edges only funnel into the channel; all state mutation
//! happens here.

use std::time::{Duration, Instant};

use crossbeam_channel::{after, never, select, tick, Receiver};
use tracing::{debug, info};

use crate::changer::Changer;
use crate::magazine::Magazine;
use crate::player::PlayerFactory;
use crate::transport::BusTransport;

/// Device presence announce period.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_millis(3800);

/// Settle delay between a track metadata update and the status frame
/// reporting it. The head unit misses the update without it.
pub const METADATA_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// A notification about a media player session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A player session appeared on the session bus.
    Appeared(String),
    /// A player session disappeared.
    Disappeared(String),
    /// A player reported its current track number.
    Metadata {
        /// Slot the reporting player is bound to.
        slot: u8,
        /// True track number.
        track: i32,
    },
}

/// One event entering the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// A raw frame read from the bus.
    Frame(Vec<u8>),
    /// A player notification.
    Player(PlayerEvent),
    /// Terminate the loop.
    Shutdown,
}

/// The single-threaded event loop driving [`Changer`] and [`Magazine`].
pub struct DispatchLoop<T: BusTransport, F: PlayerFactory> {
    changer: Changer<T>,
    magazine: Magazine,
    factory: F,
    events: Receiver<LoopEvent>,
    heartbeat_period: Duration,
}

impl<T: BusTransport, F: PlayerFactory> DispatchLoop<T, F> {
    /// Assemble the loop around its collaborators and the event channel.
    pub fn new(
        changer: Changer<T>,
        magazine: Magazine,
        factory: F,
        events: Receiver<LoopEvent>,
    ) -> Self {
        DispatchLoop {
            changer,
            magazine,
            factory,
            events,
            heartbeat_period: HEARTBEAT_PERIOD,
        }
    }

    /// Override the announce period. Tests shorten it to observe the tick.
    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    /// Run until shutdown. Announces readiness first, then serializes
    /// events in arrival order. On exit every player handle is released.
    pub fn run(mut self) {
        self.changer.announce_ready();
        let heartbeat = tick(self.heartbeat_period);
        // Armed while a metadata settle sync is due; never() keeps the
        // select arm dormant otherwise.
        let mut pending_sync: Option<Receiver<Instant>> = None;

        loop {
            let settle = pending_sync.clone().unwrap_or_else(never);
            select! {
                recv(self.events) -> event => match event {
                    Ok(LoopEvent::Frame(frame)) => {
                        if let Some(event) = self.changer.handle_frame(&frame) {
                            self.magazine.handle_event(event, &mut self.changer);
                        }
                    }
                    Ok(LoopEvent::Player(event)) => {
                        self.handle_player_event(event, &mut pending_sync);
                    }
                    Ok(LoopEvent::Shutdown) => {
                        info!("shutdown requested");
                        break;
                    }
                    // All senders gone; nothing can reach us anymore.
                    Err(_) => break,
                },
                recv(heartbeat) -> _ => self.changer.heartbeat(),
                recv(settle) -> _ => {
                    self.changer.sync_output();
                    pending_sync = None;
                }
            }
        }

        self.magazine.release_all();
    }

    fn handle_player_event(
        &mut self,
        event: PlayerEvent,
        pending_sync: &mut Option<Receiver<Instant>>,
    ) {
        match event {
            PlayerEvent::Appeared(name) => {
                let Some(slot) = self.magazine.slot_for_player(&name) else {
                    debug!(player = %name, "ignoring unconfigured player");
                    return;
                };
                self.magazine.attach(slot, &self.factory, &mut self.changer);
                self.changer.sync_output();
            }
            PlayerEvent::Disappeared(name) => {
                let Some(slot) = self.magazine.slot_for_player(&name) else {
                    return;
                };
                self.magazine.detach(slot, &mut self.changer);
                self.changer.sync_output();
            }
            PlayerEvent::Metadata { slot, track } => {
                if self
                    .magazine
                    .on_player_metadata(slot, track, &mut self.changer)
                {
                    *pending_sync = Some(after(METADATA_SETTLE_DELAY));
                }
            }
        }
    }
}
