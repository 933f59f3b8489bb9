//! MPRIS adapters over the D-Bus session bus.
//!
//! [`MprisPlayer`] maps the [`PlayerHandle`] calls onto the
//! `org.mpris.MediaPlayer2.Player` interface; [`MprisFactory`] builds one
//! per attached slot and starts a watcher thread relaying its track
//! metadata. [`spawn_presence_watcher`] turns `NameOwnerChanged` signals
//! into presence events for the dispatch loop.

use std::collections::HashMap;
use std::thread;

use crossbeam_channel::Sender;
use tracing::{debug, warn};
use zbus::blocking::{fdo::DBusProxy, Connection};
use zbus::zvariant::OwnedValue;

use cdc_core::{LoopEvent, PlayerError, PlayerEvent, PlayerFactory, PlayerHandle};

use crate::error::AgentError;

/// Bus name prefix every MPRIS player owns.
pub const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

const TRACK_NUMBER_KEY: &str = "xesam:trackNumber";

#[zbus::proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2"
)]
trait MediaPlayer {
    fn play(&self) -> zbus::Result<()>;
    fn pause(&self) -> zbus::Result<()>;
    fn play_pause(&self) -> zbus::Result<()>;
    fn next(&self) -> zbus::Result<()>;
    fn previous(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

/// Playback control over one player's MPRIS interface.
pub struct MprisPlayer {
    proxy: MediaPlayerProxyBlocking<'static>,
}

impl PlayerHandle for MprisPlayer {
    fn play(&mut self) -> Result<(), PlayerError> {
        self.proxy.play().map_err(to_player_error)
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.proxy.pause().map_err(to_player_error)
    }

    fn play_pause(&mut self) -> Result<(), PlayerError> {
        self.proxy.play_pause().map_err(to_player_error)
    }

    fn next(&mut self) -> Result<(), PlayerError> {
        self.proxy.next().map_err(to_player_error)
    }

    fn previous(&mut self) -> Result<(), PlayerError> {
        self.proxy.previous().map_err(to_player_error)
    }
}

fn to_player_error(err: zbus::Error) -> PlayerError {
    PlayerError::new(err.to_string())
}

/// Builds [`MprisPlayer`] handles and their metadata watchers.
pub struct MprisFactory {
    connection: Connection,
    events: Sender<LoopEvent>,
}

impl MprisFactory {
    pub fn new(connection: Connection, events: Sender<LoopEvent>) -> Self {
        MprisFactory { connection, events }
    }
}

impl PlayerFactory for MprisFactory {
    fn connect(&self, name: &str, slot: u8) -> Result<Box<dyn PlayerHandle>, PlayerError> {
        let proxy = MediaPlayerProxyBlocking::builder(&self.connection)
            .destination(name.to_string())
            .map_err(to_player_error)?
            .build()
            .map_err(to_player_error)?;

        spawn_metadata_watcher(proxy.clone(), slot, self.events.clone());
        Ok(Box::new(MprisPlayer { proxy }))
    }
}

/// Relay the player's `Metadata` property changes as track events.
///
/// The property stream yields the current value first, which gives the
/// engine its initial track number right after attach. The thread parks in
/// the stream and unwinds when the event channel closes; stale events from
/// a detached player are filtered by the magazine's current-slot guard.
fn spawn_metadata_watcher(
    proxy: MediaPlayerProxyBlocking<'static>,
    slot: u8,
    events: Sender<LoopEvent>,
) {
    let spawned = thread::Builder::new()
        .name(format!("metadata-cd{slot}"))
        .spawn(move || {
            for change in proxy.receive_metadata_changed() {
                let metadata = match change.get() {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        debug!(slot, error = %err, "metadata fetch failed");
                        continue;
                    }
                };
                let Some(track) = track_number(&metadata) else {
                    continue;
                };
                let event = LoopEvent::Player(PlayerEvent::Metadata { slot, track });
                if events.send(event).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        warn!(slot, error = %err, "failed to spawn metadata watcher");
    }
}

fn track_number(metadata: &HashMap<String, OwnedValue>) -> Option<i32> {
    let value = metadata.get(TRACK_NUMBER_KEY)?;
    value.downcast_ref::<i32>().ok()
}

/// Watch `NameOwnerChanged` and forward MPRIS session arrivals and
/// departures to the dispatch loop.
pub fn spawn_presence_watcher(
    connection: &Connection,
    events: Sender<LoopEvent>,
) -> Result<(), AgentError> {
    let dbus = DBusProxy::new(connection)?;
    let changes = dbus.receive_name_owner_changed()?;

    thread::Builder::new()
        .name("mpris-presence".into())
        .spawn(move || {
            for signal in changes {
                let args = match signal.args() {
                    Ok(args) => args,
                    Err(err) => {
                        warn!(error = %err, "malformed NameOwnerChanged signal");
                        continue;
                    }
                };
                let name = args.name().to_string();
                if !name.starts_with(MPRIS_PREFIX) {
                    continue;
                }
                let event = if args.new_owner().is_some() {
                    PlayerEvent::Appeared(name)
                } else {
                    PlayerEvent::Disappeared(name)
                };
                if events.send(LoopEvent::Player(event)).is_err() {
                    break;
                }
            }
        })
        .map_err(AgentError::Bus)?;
    Ok(())
}

/// Enqueue an `Appeared` event for every MPRIS name already on the session
/// bus, so players running before the agent get their discs loaded.
pub fn scan_existing_players(
    connection: &Connection,
    events: &Sender<LoopEvent>,
) -> Result<(), AgentError> {
    let dbus = DBusProxy::new(connection)?;
    for name in dbus.list_names()? {
        let name = name.to_string();
        if name.starts_with(MPRIS_PREFIX) {
            debug!(player = %name, "player already present at startup");
            let _ = events.send(LoopEvent::Player(PlayerEvent::Appeared(name)));
        }
    }
    Ok(())
}
