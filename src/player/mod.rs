use serde::Serialize;

use crate::error::MusicError;
use crate::music::piece::Piece;
use crate::scoring::event::beat_length_ms;
use crate::scoring::event_list::GradingInfo;

/// Keyboard and touch input reaches us roughly this late.
pub const FIXED_INPUT_LATENCY_MS: f64 = 30.0;

/// Claps closer together than this are treated as switch bounce.
pub const CLAP_DEBOUNCE_MS: f64 = 100.0;

/// Sample names for events that carry no sound of their own.
pub const NOTE_SOUND: &str = "note";
pub const BEAT_SOUND: &str = "beat";

/// An effect the host must carry out after driving the player. The JS
/// shim maps `Started`/`Stopped`/`Completed` onto its onPlay/onStop/
/// onComplete callbacks and the sound names onto its sample bank.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    Started,
    Stopped,
    Completed,
    CountOffNote { index: usize },
    NoteStarted { index: usize },
    BeatStarted { beat: usize },
    PlaySound { name: String },
    StartBackingLoop { index: usize },
    StopBackingLoop,
}

/// Grading results for both event streams of the current piece.
#[derive(Serialize, Clone, Copy, Debug)]
pub struct PerformanceSummary {
    pub clap: GradingInfo,
    pub tap: GradingInfo,
    pub latency_suspected: bool,
}

/// Ephemeral playback state; its presence is the sole source of truth
/// for `is_playing`. All fire times are anchored to `start_ms` so timer
/// jitter never accumulates across a piece.
#[derive(Clone, Debug)]
struct Playback {
    start_ms: f64,
    beat_len_ms: f64,
    /// Index of the next note to fire; negative while counting off.
    next_note: isize,
    next_beat: usize,
    last_clap_ms: f64,
    timing_correction_ms: f64,
    loop_started: bool,
    calibrated: bool,
}

/// The real-time scheduler. The host owns the clock and the single
/// outstanding timer: it passes `now` into every call, performs the
/// returned actions, and arms one timer for `next_deadline_ms`.
pub struct Player {
    piece: Piece,
    count_off: Piece,
    tempo: f64,
    playback: Option<Playback>,
}

impl Player {
    pub fn new(piece: Piece, tempo: f64) -> Result<Self, MusicError> {
        if !(tempo > 0.0) {
            return Err(MusicError::InvalidTempo(tempo));
        }
        let count_off = piece.time_signature().count_off();
        Ok(Player {
            piece,
            count_off,
            tempo,
            playback: None,
        })
    }

    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Takes effect on the next `play`; the current playback keeps the
    /// beat length it started with.
    pub fn set_tempo(&mut self, tempo: f64) -> Result<(), MusicError> {
        if !(tempo > 0.0) {
            return Err(MusicError::InvalidTempo(tempo));
        }
        self.tempo = tempo;
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn beat_length_ms(&self) -> f64 {
        beat_length_ms(self.tempo)
    }

    /// Begin playback. Clears any previous grading, anchors the start
    /// time past the countoff, and immediately fires whatever is due.
    pub fn play(&mut self, now_ms: f64, count_off: bool) -> Vec<PlayerAction> {
        if self.is_playing() {
            return Vec::new();
        }
        self.piece.note_events_mut().remove_grading();
        self.piece.beat_events_mut().remove_grading();

        let beat_len_ms = beat_length_ms(self.tempo);
        let (next_note, delay_ms) = if count_off {
            (
                -(self.count_off.notes().len() as isize),
                self.count_off.end() * beat_len_ms,
            )
        } else {
            (0, 0.0)
        };
        self.playback = Some(Playback {
            start_ms: now_ms + delay_ms,
            beat_len_ms,
            next_note,
            next_beat: 0,
            last_clap_ms: f64::NEG_INFINITY,
            timing_correction_ms: 0.0,
            loop_started: false,
            calibrated: false,
        });
        log::info!(
            "playback started at {} bpm, countoff: {}",
            self.tempo,
            count_off
        );

        let mut actions = vec![PlayerAction::Started];
        actions.extend(self.tick(now_ms));
        actions
    }

    pub fn stop(&mut self) -> Vec<PlayerAction> {
        if !self.is_playing() {
            return Vec::new();
        }
        self.stop_internal()
    }

    fn stop_internal(&mut self) -> Vec<PlayerAction> {
        let Some(playback) = self.playback.take() else {
            unreachable!("stopping a player that is not playing")
        };
        let mut actions = Vec::new();
        if playback.loop_started && self.piece.backing_loop().is_some() {
            actions.push(PlayerAction::StopBackingLoop);
        }
        actions.push(PlayerAction::Stopped);
        log::info!("playback stopped");
        actions
    }

    /// Absolute wall-clock time of the next scheduled firing, or `None`
    /// when stopped. The host arms its single timer with this.
    pub fn next_deadline_ms(&self) -> Option<f64> {
        match (self.next_note_time(), self.next_beat_time()) {
            (Some(note), Some(beat)) => Some(beat.min(note)),
            (Some(note), None) => Some(note),
            (None, Some(beat)) => Some(beat),
            (None, None) => None,
        }
    }

    /// Fire every event due by `now_ms`, in timing order. Which stream
    /// fires next is re-derived each step by comparing absolute times;
    /// a beat wins ties so the click sounds under the note onset.
    pub fn tick(&mut self, now_ms: f64) -> Vec<PlayerAction> {
        let mut actions = Vec::new();
        while self.playback.is_some() {
            let (fire_beat, due) = match (self.next_note_time(), self.next_beat_time()) {
                (Some(note), Some(beat)) => (beat <= note, beat.min(note)),
                (Some(note), None) => (false, note),
                (None, Some(beat)) => (true, beat),
                (None, None) => break,
            };
            if due > now_ms {
                break;
            }
            if fire_beat {
                self.fire_beat(&mut actions);
            } else {
                self.fire_note(&mut actions);
            }
        }
        actions
    }

    fn next_note_time(&self) -> Option<f64> {
        let playback = self.playback.as_ref()?;
        let n = playback.next_note;
        if n < 0 {
            let index = (self.count_off.notes().len() as isize + n) as usize;
            let timing = self.count_off.note_events().get(index).timing - self.count_off.end();
            Some(playback.start_ms + timing * playback.beat_len_ms)
        } else {
            let index = n as usize;
            let count = self.piece.notes().len();
            if index < count {
                let timing = self.piece.note_events().get(index).timing;
                Some(playback.start_ms + timing * playback.beat_len_ms)
            } else if index == count {
                // One virtual firing past the last note marks completion.
                Some(playback.start_ms + self.piece.end() * playback.beat_len_ms)
            } else {
                None
            }
        }
    }

    fn next_beat_time(&self) -> Option<f64> {
        let playback = self.playback.as_ref()?;
        if playback.next_beat < self.piece.beat_events().len() {
            let timing = self.piece.beat_events().get(playback.next_beat).timing;
            Some(playback.start_ms + timing * playback.beat_len_ms)
        } else {
            None
        }
    }

    fn fire_beat(&mut self, actions: &mut Vec<PlayerAction>) {
        let backing_loop = self.piece.backing_loop();
        let Some(playback) = self.playback.as_mut() else {
            unreachable!("beat fired while stopped")
        };
        let beat = playback.next_beat;
        playback.next_beat += 1;
        if !playback.loop_started {
            playback.loop_started = true;
            if let Some(index) = backing_loop {
                actions.push(PlayerAction::StartBackingLoop { index });
            }
        }
        self.piece.beat_events_mut().enable_grading_through(beat as f64);
        actions.push(PlayerAction::BeatStarted { beat });
        actions.push(PlayerAction::PlaySound {
            name: BEAT_SOUND.to_string(),
        });
    }

    fn fire_note(&mut self, actions: &mut Vec<PlayerAction>) {
        let Some(playback) = self.playback.as_mut() else {
            unreachable!("note fired while stopped")
        };
        let n = playback.next_note;
        playback.next_note += 1;

        if n < 0 {
            let index = (self.count_off.notes().len() as isize + n) as usize;
            let sound = self.count_off.notes()[index].sound.clone();
            actions.push(PlayerAction::CountOffNote { index });
            if let Some(name) = sound {
                actions.push(PlayerAction::PlaySound { name });
            }
            return;
        }

        let index = n as usize;
        if index == self.piece.notes().len() {
            let end = self.piece.end();
            self.piece.beat_events_mut().enable_grading_through(end);
            log::info!("playback complete");
            actions.extend(self.stop_internal());
            actions.push(PlayerAction::Completed);
            return;
        }

        let timing = self.piece.note_events().get(index).timing;
        self.piece.note_events_mut().enable_grading_through(timing);
        let note = &self.piece.notes()[index];
        let performs = note.performs();
        let sound = note.sound.clone();
        actions.push(PlayerAction::NoteStarted { index });
        if performs {
            actions.push(PlayerAction::PlaySound {
                name: sound.unwrap_or_else(|| NOTE_SOUND.to_string()),
            });
        }
    }

    /// Grade a clap against the note events. Ignored while stopped or
    /// counting off, and debounced against bouncing key/touch input.
    /// Returns the indices of events whose grading changed.
    pub fn grade_clap(&mut self, now_ms: f64) -> Vec<usize> {
        let Some(playback) = self.playback.as_mut() else {
            return Vec::new();
        };
        if playback.next_note < 0 {
            return Vec::new();
        }
        if now_ms - playback.last_clap_ms < CLAP_DEBOUNCE_MS {
            return Vec::new();
        }
        playback.last_clap_ms = now_ms;
        let beats =
            (now_ms - playback.start_ms - playback.timing_correction_ms) / playback.beat_len_ms;
        self.piece.note_events_mut().grade_performance_attempt(beats)
    }

    /// Grade a tap against the beat events. Taps arrive at least a beat
    /// apart, so there is no debounce.
    pub fn grade_tap(&mut self, now_ms: f64) -> Vec<usize> {
        let Some(playback) = self.playback.as_ref() else {
            return Vec::new();
        };
        if playback.next_note < 0 {
            return Vec::new();
        }
        let beats =
            (now_ms - playback.start_ms - playback.timing_correction_ms) / playback.beat_len_ms;
        self.piece.beat_events_mut().grade_performance_attempt(beats)
    }

    /// Calibrate against the audio engine's seek read-back, relayed by
    /// the host from the backing loop's on-play callback. Device output
    /// buffering otherwise makes every grade read late. Only the first
    /// report counts; without one, timing stays uncorrected.
    pub fn backing_loop_started(&mut self, now_ms: f64, seek_ms: f64) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        if playback.calibrated {
            return;
        }
        playback.calibrated = true;
        let audio_delay_ms = seek_ms - (now_ms - playback.start_ms);
        playback.timing_correction_ms = FIXED_INPUT_LATENCY_MS - audio_delay_ms;
        log::debug!(
            "audio calibrated: delay {:.1}ms, correction {:.1}ms",
            audio_delay_ms,
            playback.timing_correction_ms
        );
    }

    pub fn summary(&self) -> PerformanceSummary {
        PerformanceSummary {
            clap: self.piece.note_events().grading_info(self.tempo, 0.0),
            tap: self.piece.beat_events().grading_info(self.tempo, 0.0),
            latency_suspected: self.piece.note_events().might_have_latency_issues(self.tempo),
        }
    }
}
