use serde::Serialize;

use crate::error::MusicError;
use crate::music::note::Note;
use crate::music::time_signature::TimeSignature;
use crate::scoring::event::MusicEvent;
use crate::scoring::event_list::EventList;

pub const FLOAT_EPSILON: f64 = 1e-5;

/// How far a swung halfway subdivision is pushed toward the next beat.
pub const SWING_SHIFT: f64 = 1.0 / 6.0;

/// Snap a value to the nearest integer when it has drifted within
/// `FLOAT_EPSILON` of one. Repeated fractional sums (thirds in compound
/// meter especially) accumulate error that would otherwise break
/// beat-boundary comparisons.
pub fn nudge_float(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < FLOAT_EPSILON {
        rounded
    } else {
        value
    }
}

/// A complete excerpt: a time signature and an ordered note sequence,
/// derived into two parallel gradable event streams — one per note
/// onset, one per whole beat. Swing is baked into the note-event
/// timings at construction; grading never re-applies it.
#[derive(Serialize, Clone, Debug)]
pub struct Piece {
    time_signature: TimeSignature,
    notes: Vec<Note>,
    end: f64,
    note_events: EventList,
    beat_events: EventList,
    backing_loop: Option<usize>,
}

impl Piece {
    pub fn new(time_signature: TimeSignature, notes: Vec<Note>) -> Result<Self, MusicError> {
        for note in &notes {
            if note.dots > 2 {
                return Err(MusicError::InvalidDots(note.dots));
            }
        }

        let bottom = time_signature.bottom().clone();
        let mut timing: f64 = 0.0;
        let mut note_events = Vec::with_capacity(notes.len());
        for note in &notes {
            let beat = timing.floor();
            let placed = beat + time_signature.swing_adjusted(timing - beat);
            note_events.push(MusicEvent::new(placed, note.performs()));
            timing = nudge_float(timing + note.relative_length(&bottom));
        }
        let end = timing;

        // One beat event per whole beat, plus the structural event on
        // the final barline, which never enters statistics.
        let last_beat = end.ceil() as usize;
        let beat_events: Vec<MusicEvent> = (0..=last_beat)
            .map(|b| MusicEvent::new(b as f64, true))
            .collect();

        Ok(Piece {
            time_signature,
            notes,
            end,
            note_events: EventList::new(note_events, false),
            beat_events: EventList::new(beat_events, true),
            backing_loop: None,
        })
    }

    pub fn with_backing_loop(mut self, index: usize) -> Self {
        self.backing_loop = Some(index);
        self
    }

    pub fn time_signature(&self) -> &TimeSignature {
        &self.time_signature
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Total length in beats.
    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn backing_loop(&self) -> Option<usize> {
        self.backing_loop
    }

    pub fn note_events(&self) -> &EventList {
        &self.note_events
    }

    pub fn beat_events(&self) -> &EventList {
        &self.beat_events
    }

    pub(crate) fn note_events_mut(&mut self) -> &mut EventList {
        &mut self.note_events
    }

    pub(crate) fn beat_events_mut(&mut self) -> &mut EventList {
        &mut self.beat_events
    }

    /// Markup consumed by the staff renderer: the signature fragment,
    /// then note tokens with barlines at measure boundaries.
    pub fn notation(&self) -> String {
        let bottom = self.time_signature.bottom().clone();
        let measure = self.time_signature.beats_per_measure();
        let mut out = self.time_signature.notation();
        out.push_str(" |");
        let mut position = 0.0;
        for note in &self.notes {
            out.push(' ');
            out.push_str(&note.notation());
            position = nudge_float(position + note.relative_length(&bottom));
            let into_measure = position % measure;
            if into_measure.abs() < FLOAT_EPSILON || (measure - into_measure).abs() < FLOAT_EPSILON
            {
                out.push_str(" |");
            }
        }
        if !out.ends_with('|') {
            out.push_str(" |");
        }
        out
    }

    /// Stable per-note key for the rendering layer.
    pub fn id_for_note_index(&self, index: usize) -> String {
        format!("note-{}", index)
    }
}
