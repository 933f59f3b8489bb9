//! The magazine manager.
//!
//! Maps the six logical disc slots onto media player sessions. The magazine
//! owns the attach/detach lifecycle and the current-slot selection; it
//! mutates the engine's disc state and relays the engine's playback events
//! to the bound player.

use ibus_protocol::{ERR_NO_DISCS, MAGAZINE_SIZE};
use tracing::{debug, info, warn};

use crate::changer::Changer;
use crate::events::ChangerEvent;
use crate::player::{PlayerError, PlayerFactory, PlayerHandle};
use crate::transport::BusTransport;

const SLOT_COUNT: usize = MAGAZINE_SIZE as usize;

/// One disc slot: a configured player name and, while that player session
/// exists, a live control handle.
struct Slot {
    number: u8,
    player_name: Option<String>,
    handle: Option<Box<dyn PlayerHandle>>,
}

impl Slot {
    fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Relay one playback call to the bound player, logging failures.
    fn relay(
        &mut self,
        action: &'static str,
        call: impl FnOnce(&mut dyn PlayerHandle) -> Result<(), PlayerError>,
    ) {
        if let Some(handle) = self.handle.as_deref_mut() {
            if let Err(err) = call(handle) {
                warn!(slot = self.number, action, error = %err, "player call failed");
            }
        }
    }
}

/// The six-slot magazine and its current selection.
///
/// `current` mirrors the engine's selected disc; the magazine is the only
/// writer of the engine's disc presence state.
pub struct Magazine {
    slots: [Slot; SLOT_COUNT],
    current: Option<usize>,
}

impl Magazine {
    /// Build a magazine from the configured per-slot player names.
    pub fn new(names: [Option<String>; SLOT_COUNT]) -> Self {
        let mut number = 0u8;
        Magazine {
            slots: names.map(|player_name| {
                number += 1;
                Slot {
                    number,
                    player_name,
                    handle: None,
                }
            }),
            current: None,
        }
    }

    /// Find the slot configured for the given player name.
    pub fn slot_for_player(&self, name: &str) -> Option<u8> {
        self.slots
            .iter()
            .find(|slot| slot.player_name.as_deref() == Some(name))
            .map(|slot| slot.number)
    }

    /// Bind a slot to its player session.
    ///
    /// No-op with a warning when the slot is already active or has no
    /// configured player. On the first successful attach the slot becomes
    /// current and the empty-magazine error bit is cleared. The caller
    /// performs the status sync afterwards.
    pub fn attach<T: BusTransport>(
        &mut self,
        number: u8,
        factory: &dyn PlayerFactory,
        changer: &mut Changer<T>,
    ) {
        let Some(index) = slot_index(number) else {
            warn!(slot = number, "attach to out-of-range slot");
            return;
        };
        let slot = &mut self.slots[index];
        if slot.is_active() {
            warn!(slot = number, "attach to already active slot");
            return;
        }
        let Some(name) = slot.player_name.clone() else {
            warn!(slot = number, "attach to unconfigured slot");
            return;
        };

        let handle = match factory.connect(&name, number) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(slot = number, player = %name, error = %err, "player connect failed");
                return;
            }
        };

        info!(slot = number, player = %name, "disc loaded");
        slot.handle = Some(handle);
        changer.insert_disc(number);
        if self.current.is_none() {
            self.current = Some(index);
            changer.set_disc(number);
            changer.clear_error(ERR_NO_DISCS);
        }
    }

    /// Unbind a slot from its player session.
    ///
    /// No-op when the slot is inactive. When the detached slot was current,
    /// the selection follows the engine's replacement disc. The caller
    /// performs the status sync afterwards.
    pub fn detach<T: BusTransport>(&mut self, number: u8, changer: &mut Changer<T>) {
        let Some(index) = slot_index(number) else {
            return;
        };
        let slot = &mut self.slots[index];
        if !slot.is_active() {
            debug!(slot = number, "detach from inactive slot");
            return;
        }

        info!(slot = number, "disc ejected");
        slot.handle = None;
        let replacement = changer.remove_disc(number);
        if self.current == Some(index) {
            self.current = slot_index(replacement);
        }
    }

    /// Relay one engine event to the bound player.
    pub fn handle_event<T: BusTransport>(
        &mut self,
        event: ChangerEvent,
        changer: &mut Changer<T>,
    ) {
        match event {
            ChangerEvent::Play => self.with_current(|slot| {
                slot.relay("play", |player| player.play());
            }),
            // Playback collaborators have no hard stop; Stop relays as pause.
            ChangerEvent::Stop => self.with_current(|slot| {
                slot.relay("pause", |player| player.pause());
            }),
            ChangerEvent::Next => self.with_current(|slot| {
                slot.relay("next", |player| player.next());
            }),
            ChangerEvent::Previous => self.with_current(|slot| {
                slot.relay("previous", |player| player.previous());
            }),
            ChangerEvent::DiscChangeRequested(target) => {
                self.on_host_change_disc(target, changer);
            }
            // Pause only changes wire state; the player keeps running.
            ChangerEvent::Pause
            | ChangerEvent::StatusRequested
            | ChangerEvent::FastForward
            | ChangerEvent::Rewind
            | ChangerEvent::ScanOn
            | ChangerEvent::ScanOff
            | ChangerEvent::RandomOn
            | ChangerEvent::RandomOff => {}
        }
    }

    /// Act on a disc-change request from the head unit.
    ///
    /// Selecting the current disc again toggles play/pause. Selecting
    /// another active disc pauses the old player, switches, starts the new
    /// one, and syncs. Selecting an inactive disc does nothing.
    pub fn on_host_change_disc<T: BusTransport>(&mut self, target: u8, changer: &mut Changer<T>) {
        let Some(current) = self.current else {
            return;
        };
        let Some(index) = slot_index(target) else {
            debug!(disc = target, "disc change to out-of-range disc");
            return;
        };

        if index == current {
            self.slots[index].relay("play_pause", |player| player.play_pause());
            return;
        }
        if !self.slots[index].is_active() {
            debug!(disc = target, "disc change to empty slot");
            return;
        }

        self.slots[current].relay("pause", |player| player.pause());
        self.current = Some(index);
        self.slots[index].relay("play", |player| player.play());
        changer.set_disc(target);
        changer.sync_output();
    }

    /// Accept a track metadata report from a player.
    ///
    /// Reports from non-current slots are stale (a just-detached or
    /// background player racing with a slot switch) and are discarded.
    /// Returns true when the caller should schedule the deferred status
    /// sync.
    pub fn on_player_metadata<T: BusTransport>(
        &mut self,
        slot: u8,
        track: i32,
        changer: &mut Changer<T>,
    ) -> bool {
        if slot_index(slot) != self.current {
            debug!(slot, track, "discarding metadata from non-current slot");
            return false;
        }
        changer.set_track(track);
        true
    }

    /// Drop every player handle and clear the selection. Shutdown only.
    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            slot.handle = None;
        }
        self.current = None;
    }

    /// Currently selected disc number, 0 when none.
    pub fn current_disc(&self) -> u8 {
        self.current.map(|index| index as u8 + 1).unwrap_or(0)
    }

    fn with_current(&mut self, act: impl FnOnce(&mut Slot)) {
        if let Some(index) = self.current {
            act(&mut self.slots[index]);
        }
    }
}

/// Map a disc number (1..=6) to its slot index; 0 and out-of-range map to
/// None.
fn slot_index(number: u8) -> Option<usize> {
    if (1..=MAGAZINE_SIZE).contains(&number) {
        Some(number as usize - 1)
    } else {
        None
    }
}
