//! The changer protocol engine.
//!
//! Owns the wire-visible device state and the command dispatch state
//! machine. Inbound frames mutate the state, write responses, and surface
//! playback intent as [`ChangerEvent`]s; the magazine mutates the
//! disc-presence side through [`insert_disc`](Changer::insert_disc) /
//! [`remove_disc`](Changer::remove_disc).

use ibus_protocol::{
    announce_frame, encode_track, identity_frame, is_actionable, Announce, ControlTask, Inbound,
    StatusFrame, ACK_PAUSE, ACK_PLAY, ACK_RANDOM, ACK_SCAN, ERR_NO_DISCS, MAGAZINE_SIZE,
    STAT_CD_CHECK, STAT_END_OF_TRACK, STAT_FAST_FORWARD, STAT_LOADING, STAT_NO_MAGAZINE,
    STAT_PAUSE, STAT_PLAY, STAT_REWIND, STAT_STOP,
};
use tracing::{trace, warn};

use crate::events::ChangerEvent;
use crate::transport::BusTransport;

/// Wire-visible playback status of the changer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Stopped.
    Stop,
    /// Paused.
    Pause,
    /// Playing.
    Play,
    /// Fast forward.
    FastForward,
    /// Rewind.
    Rewind,
    /// End of track reached.
    EndOfTrack,
    /// Loading a disc.
    Loading,
    /// Checking a disc.
    CdCheck,
    /// No magazine inserted.
    NoMagazine,
}

impl Status {
    /// The status byte written into the status frame.
    pub fn wire_code(self) -> u8 {
        match self {
            Status::Stop => STAT_STOP,
            Status::Pause => STAT_PAUSE,
            Status::Play => STAT_PLAY,
            Status::FastForward => STAT_FAST_FORWARD,
            Status::Rewind => STAT_REWIND,
            Status::EndOfTrack => STAT_END_OF_TRACK,
            Status::Loading => STAT_LOADING,
            Status::CdCheck => STAT_CD_CHECK,
            Status::NoMagazine => STAT_NO_MAGAZINE,
        }
    }
}

/// The CD changer protocol engine.
///
/// Generic over the bus transport so tests can drive it with a recording
/// mock. All writes are fire-and-forget: failures are logged at warn level
/// and the heartbeat restores device presence eventually.
pub struct Changer<T: BusTransport> {
    bus: T,
    status: Status,
    ack: u8,
    error_mask: u8,
    disc_mask: u8,
    disc: u8,
    track: u8,
    raw_track: i32,
}

impl<T: BusTransport> Changer<T> {
    /// Create an engine with power-on defaults: stopped, pause acknowledged,
    /// empty magazine with the no-discs error raised.
    pub fn new(bus: T) -> Self {
        Changer {
            bus,
            status: Status::Stop,
            ack: ACK_PAUSE,
            error_mask: ERR_NO_DISCS,
            disc_mask: 0,
            disc: 0,
            track: 0,
            raw_track: 0,
        }
    }

    // ========================================================================
    // Frame Handling
    // ========================================================================

    /// Interpret one raw frame from the bus.
    ///
    /// Frames outside the 5..=7 byte window are dropped without comment;
    /// unknown command or task bytes are logged and ignored. Returns the
    /// playback intent for the magazine to relay, if any.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Option<ChangerEvent> {
        if !is_actionable(frame) {
            return None;
        }

        let inbound = match Inbound::decode(frame) {
            Ok(inbound) => inbound,
            Err(err) => {
                warn!("{err}");
                return None;
            }
        };

        match inbound {
            Inbound::StatusRequest => {
                self.sync_output();
                Some(ChangerEvent::StatusRequested)
            }
            Inbound::IdentityRequest => {
                self.write(&identity_frame());
                None
            }
            Inbound::Control(task) => self.handle_control(task),
        }
    }

    fn handle_control(&mut self, task: ControlTask) -> Option<ChangerEvent> {
        trace!(?task, "control task");
        match task {
            ControlTask::StatusReq => {
                self.sync_output();
                Some(ChangerEvent::StatusRequested)
            }
            ControlTask::Stop => {
                self.status = Status::Stop;
                self.ack = ACK_PAUSE;
                self.sync_output();
                Some(ChangerEvent::Stop)
            }
            ControlTask::Pause => {
                // Head units expect the 0x0A status byte here, not the
                // nominal pause code. See test_pause_reports_no_magazine_status_code.
                self.status = Status::NoMagazine;
                self.ack = ACK_PAUSE;
                self.sync_output();
                Some(ChangerEvent::Pause)
            }
            ControlTask::Play => {
                self.status = Status::Play;
                self.ack = ACK_PLAY;
                self.sync_output();
                Some(ChangerEvent::Play)
            }
            ControlTask::Fast { forward } => {
                let event = if forward {
                    self.status = Status::FastForward;
                    ChangerEvent::FastForward
                } else {
                    self.status = Status::Rewind;
                    ChangerEvent::Rewind
                };
                self.ack = ACK_PLAY;
                self.sync_output();
                Some(event)
            }
            // Acknowledgement is implicit in the next status report.
            ControlTask::ChangeTrack { previous } => Some(if previous {
                ChangerEvent::Previous
            } else {
                ChangerEvent::Next
            }),
            // The magazine syncs after it has acted on the request.
            ControlTask::ChangeDisc { disc } => Some(ChangerEvent::DiscChangeRequested(disc)),
            ControlTask::Scan { on } => {
                let event = if on {
                    self.ack |= ACK_SCAN;
                    ChangerEvent::ScanOn
                } else {
                    self.ack &= !ACK_SCAN;
                    ChangerEvent::ScanOff
                };
                self.sync_output();
                Some(event)
            }
            ControlTask::Random { on } => {
                let event = if on {
                    self.ack |= ACK_RANDOM;
                    ChangerEvent::RandomOn
                } else {
                    self.ack &= !ACK_RANDOM;
                    ChangerEvent::RandomOff
                };
                self.sync_output();
                Some(event)
            }
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Write the current status frame to the bus.
    pub fn sync_output(&mut self) {
        let frame = StatusFrame {
            status: self.status.wire_code(),
            ack: self.ack,
            error_mask: self.error_mask,
            disc_mask: self.disc_mask,
            disc: self.disc,
            track: self.track,
        }
        .encode();
        self.write(&frame);
    }

    /// Write the periodic presence announce.
    pub fn heartbeat(&mut self) {
        self.write(&announce_frame(Announce::Present));
    }

    /// Write the one-shot startup announce.
    pub fn announce_ready(&mut self) {
        self.write(&announce_frame(Announce::Ready));
    }

    fn write(&mut self, frame: &[u8]) {
        if let Err(err) = self.bus.write_frame(frame) {
            warn!(error = %err, len = frame.len(), "bus write failed");
        }
    }

    // ========================================================================
    // State Mutation
    // ========================================================================

    /// Set the current track from its true number.
    pub fn set_track(&mut self, track: i32) {
        self.raw_track = track;
        self.track = encode_track(track as u8);
    }

    /// Select a disc. Silently ignored unless the disc is present in the
    /// magazine; the previous selection is retained otherwise.
    pub fn set_disc(&mut self, disc: u8) {
        if (1..=MAGAZINE_SIZE).contains(&disc) && self.disc_mask & (1 << (disc - 1)) != 0 {
            self.disc = disc;
        }
    }

    /// Mark a disc present. Inserting into an empty magazine selects the
    /// disc and reports Stop.
    pub fn insert_disc(&mut self, disc: u8) {
        if !(1..=MAGAZINE_SIZE).contains(&disc) {
            return;
        }
        if self.disc_mask == 0 {
            self.disc = disc;
            self.status = Status::Stop;
        }
        self.disc_mask |= 1 << (disc - 1);
    }

    /// Mark a disc absent and return the new current disc.
    ///
    /// Removing the last disc clears the selection and reports NoMagazine;
    /// removing the current disc selects the lowest-numbered one remaining.
    pub fn remove_disc(&mut self, disc: u8) -> u8 {
        if (1..=MAGAZINE_SIZE).contains(&disc) {
            self.disc_mask &= !(1 << (disc - 1));
            if self.disc_mask == 0 {
                self.disc = 0;
                self.status = Status::NoMagazine;
            } else if self.disc == disc {
                let lowest = (0..MAGAZINE_SIZE)
                    .find(|bit| self.disc_mask & (1 << bit) != 0)
                    .unwrap_or(0);
                self.disc = lowest + 1;
            }
        }
        self.disc
    }

    /// Replace the error flag mask.
    pub fn set_error(&mut self, mask: u8) {
        self.error_mask = mask;
    }

    /// Clear the given error flag bits.
    pub fn clear_error(&mut self, bits: u8) {
        self.error_mask &= !bits;
    }

    /// Replace the acknowledge flags.
    pub fn set_ack(&mut self, ack: u8) {
        self.ack = ack;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current playback status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Current acknowledge flags.
    pub fn ack(&self) -> u8 {
        self.ack
    }

    /// Current error flag mask.
    pub fn error_mask(&self) -> u8 {
        self.error_mask
    }

    /// Disc presence mask.
    pub fn disc_mask(&self) -> u8 {
        self.disc_mask
    }

    /// Currently selected disc, 0 when none.
    pub fn disc(&self) -> u8 {
        self.disc
    }

    /// True track number as last reported by the player.
    pub fn raw_track(&self) -> i32 {
        self.raw_track
    }

    /// Wire-encoded current track.
    pub fn track(&self) -> u8 {
        self.track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibus_protocol::{
        DEV_CDC, DEV_DIAG, DEV_RADIO, MSG_CD_CONTROL, MSG_DEV_STAT_REQ, MSG_DIAG_READ_IDENT,
        STATUS_FRAME_LEN, TASK_CHANGE_DISC, TASK_CHANGE_TRACK, TASK_PAUSE, TASK_PLAY, TASK_RANDOM,
        TASK_SCAN, TASK_STOP,
    };
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Transport mock recording every written frame.
    #[derive(Clone, Default)]
    struct RecordingBus {
        written: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl RecordingBus {
        fn frames(&self) -> Vec<Vec<u8>> {
            self.written.lock().unwrap().clone()
        }

        fn last(&self) -> Vec<u8> {
            self.frames().last().cloned().expect("no frame written")
        }
    }

    impl BusTransport for RecordingBus {
        fn read_frame(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "no inbound traffic"))
        }

        fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
            self.written.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }

    fn changer() -> (Changer<RecordingBus>, RecordingBus) {
        let bus = RecordingBus::default();
        (Changer::new(bus.clone()), bus)
    }

    fn control(task: u8, arg: u8) -> [u8; 6] {
        [DEV_RADIO, 0x05, DEV_CDC, MSG_CD_CONTROL, task, arg]
    }

    #[test]
    fn test_defaults_are_stopped_and_empty() {
        let (cdc, _) = changer();
        assert_eq!(cdc.status(), Status::Stop);
        assert_eq!(cdc.ack(), ACK_PAUSE);
        assert_eq!(cdc.error_mask(), ERR_NO_DISCS);
        assert_eq!(cdc.disc_mask(), 0);
        assert_eq!(cdc.disc(), 0);
        assert_eq!(cdc.track(), 0);
    }

    #[test]
    fn test_oversized_and_undersized_frames_are_dropped() {
        let (mut cdc, bus) = changer();
        assert_eq!(cdc.handle_frame(&[0u8; 4]), None);
        assert_eq!(cdc.handle_frame(&[0u8; 8]), None);
        assert_eq!(cdc.handle_frame(&[0u8; 32]), None);
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_status_request_writes_status_frame() {
        let (mut cdc, bus) = changer();
        let frame = [DEV_RADIO, 0x03, DEV_CDC, MSG_DEV_STAT_REQ, 0x00];
        assert_eq!(cdc.handle_frame(&frame), Some(ChangerEvent::StatusRequested));
        assert_eq!(bus.last().len(), STATUS_FRAME_LEN);
    }

    #[test]
    fn test_identity_request_writes_identity_frame() {
        let (mut cdc, bus) = changer();
        let frame = [DEV_DIAG, 0x03, DEV_CDC, MSG_DIAG_READ_IDENT, 0x00];
        assert_eq!(cdc.handle_frame(&frame), None);
        assert_eq!(bus.last(), identity_frame().to_vec());
    }

    #[test]
    fn test_play_sets_play_status_and_ack() {
        let (mut cdc, bus) = changer();
        assert_eq!(cdc.handle_frame(&control(TASK_PLAY, 0)), Some(ChangerEvent::Play));
        assert_eq!(cdc.status(), Status::Play);
        assert_eq!(cdc.ack(), ACK_PLAY);
        assert_eq!(bus.last()[4], STAT_PLAY);
    }

    #[test]
    fn test_stop_sets_stop_status_and_pause_ack() {
        let (mut cdc, bus) = changer();
        cdc.handle_frame(&control(TASK_PLAY, 0));
        assert_eq!(cdc.handle_frame(&control(TASK_STOP, 0)), Some(ChangerEvent::Stop));
        assert_eq!(cdc.status(), Status::Stop);
        assert_eq!(cdc.ack(), ACK_PAUSE);
        assert_eq!(bus.last()[4], STAT_STOP);
    }

    /// The pause command reports the 0x0A (no magazine) status byte instead
    /// of the nominal 0x01 pause code. This matches deployed head-unit
    /// behavior; do not "fix" without a corrected protocol reference.
    #[test]
    fn test_pause_reports_no_magazine_status_code() {
        let (mut cdc, bus) = changer();
        assert_eq!(cdc.handle_frame(&control(TASK_PAUSE, 0)), Some(ChangerEvent::Pause));
        assert_eq!(cdc.status(), Status::NoMagazine);
        assert_eq!(cdc.ack(), ACK_PAUSE);
        assert_eq!(bus.last()[4], STAT_NO_MAGAZINE);
        assert_ne!(bus.last()[4], STAT_PAUSE);
    }

    #[test]
    fn test_change_track_emits_event_without_response() {
        let (mut cdc, bus) = changer();
        assert_eq!(
            cdc.handle_frame(&control(TASK_CHANGE_TRACK, 0)),
            Some(ChangerEvent::Next)
        );
        assert_eq!(
            cdc.handle_frame(&control(TASK_CHANGE_TRACK, 1)),
            Some(ChangerEvent::Previous)
        );
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_change_disc_emits_request_without_response() {
        let (mut cdc, bus) = changer();
        assert_eq!(
            cdc.handle_frame(&control(TASK_CHANGE_DISC, 3)),
            Some(ChangerEvent::DiscChangeRequested(3))
        );
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_scan_and_random_toggle_ack_bits() {
        let (mut cdc, _) = changer();
        cdc.handle_frame(&control(TASK_SCAN, 1));
        assert_eq!(cdc.ack() & ACK_SCAN, ACK_SCAN);
        cdc.handle_frame(&control(TASK_RANDOM, 1));
        assert_eq!(cdc.ack() & ACK_RANDOM, ACK_RANDOM);
        cdc.handle_frame(&control(TASK_SCAN, 0));
        assert_eq!(cdc.ack() & ACK_SCAN, 0);
        cdc.handle_frame(&control(TASK_RANDOM, 0));
        assert_eq!(cdc.ack() & ACK_RANDOM, 0);
    }

    #[test]
    fn test_unknown_task_changes_nothing() {
        let (mut cdc, bus) = changer();
        assert_eq!(cdc.handle_frame(&control(0x55, 0)), None);
        assert_eq!(cdc.status(), Status::Stop);
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_unknown_command_changes_nothing() {
        let (mut cdc, bus) = changer();
        assert_eq!(cdc.handle_frame(&[DEV_RADIO, 0x03, DEV_CDC, 0x77, 0x00]), None);
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_insert_into_empty_magazine_selects_disc() {
        let (mut cdc, _) = changer();
        cdc.insert_disc(4);
        assert_eq!(cdc.disc(), 4);
        assert_eq!(cdc.status(), Status::Stop);
        assert_eq!(cdc.disc_mask(), 0b0000_1000);
    }

    #[test]
    fn test_insert_into_nonempty_magazine_keeps_selection() {
        let (mut cdc, _) = changer();
        cdc.insert_disc(4);
        cdc.insert_disc(1);
        assert_eq!(cdc.disc(), 4);
        assert_eq!(cdc.disc_mask(), 0b0000_1001);
    }

    #[test]
    fn test_remove_current_disc_selects_lowest_remaining() {
        let (mut cdc, _) = changer();
        cdc.insert_disc(2);
        cdc.insert_disc(5);
        cdc.insert_disc(3);
        assert_eq!(cdc.remove_disc(2), 3);
        assert_eq!(cdc.disc(), 3);
    }

    #[test]
    fn test_remove_noncurrent_disc_keeps_selection() {
        let (mut cdc, _) = changer();
        cdc.insert_disc(2);
        cdc.insert_disc(5);
        assert_eq!(cdc.remove_disc(5), 2);
        assert_eq!(cdc.disc(), 2);
    }

    #[test]
    fn test_remove_last_disc_empties_magazine() {
        let (mut cdc, _) = changer();
        cdc.insert_disc(6);
        assert_eq!(cdc.remove_disc(6), 0);
        assert_eq!(cdc.disc(), 0);
        assert_eq!(cdc.status(), Status::NoMagazine);
    }

    #[test]
    fn test_set_disc_guarded_by_presence() {
        let (mut cdc, _) = changer();
        cdc.insert_disc(2);
        cdc.set_disc(5);
        assert_eq!(cdc.disc(), 2);
        cdc.insert_disc(5);
        cdc.set_disc(5);
        assert_eq!(cdc.disc(), 5);
        cdc.set_disc(0);
        assert_eq!(cdc.disc(), 5);
        cdc.set_disc(7);
        assert_eq!(cdc.disc(), 5);
    }

    #[test]
    fn test_disc_invariants_hold_across_mutations() {
        let (mut cdc, _) = changer();
        let check = |cdc: &Changer<RecordingBus>| {
            assert_eq!(cdc.disc() == 0, cdc.disc_mask() == 0);
            if cdc.disc() != 0 {
                assert_ne!(cdc.disc_mask() & (1 << (cdc.disc() - 1)), 0);
            }
        };

        check(&cdc);
        for disc in [3u8, 1, 6, 3, 0, 9] {
            cdc.insert_disc(disc);
            check(&cdc);
        }
        cdc.set_disc(6);
        check(&cdc);
        for disc in [6u8, 1, 3, 3, 0] {
            cdc.remove_disc(disc);
            check(&cdc);
        }
        assert_eq!(cdc.disc(), 0);
        assert_eq!(cdc.status(), Status::NoMagazine);
    }

    #[test]
    fn test_track_is_encoded_into_status_frame() {
        let (mut cdc, bus) = changer();
        cdc.set_track(42);
        assert_eq!(cdc.raw_track(), 42);
        cdc.sync_output();
        assert_eq!(bus.last()[10], 0x42);
    }

    #[test]
    fn test_error_mask_set_and_clear() {
        let (mut cdc, bus) = changer();
        cdc.set_error(ERR_NO_DISCS);
        cdc.sync_output();
        assert_eq!(bus.last()[6], ERR_NO_DISCS);
        cdc.clear_error(ERR_NO_DISCS);
        cdc.sync_output();
        assert_eq!(bus.last()[6], 0);
    }

    #[test]
    fn test_announces_use_distinct_variants() {
        let (mut cdc, bus) = changer();
        cdc.announce_ready();
        cdc.heartbeat();
        let frames = bus.frames();
        assert_eq!(frames[0], announce_frame(Announce::Ready).to_vec());
        assert_eq!(frames[1], announce_frame(Announce::Present).to_vec());
    }
}
