use serde::Serialize;

use crate::error::MusicError;
use crate::music::count::Count;
use crate::music::note::Note;
use crate::music::piece::{Piece, FLOAT_EPSILON, SWING_SHIFT};

/// Beats per measure plus the note value receiving one beat. The bottom
/// is always stored normalized (no custom glyph or sound); a dotted
/// bottom makes the meter compound.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TimeSignature {
    top: u8,
    bottom: Note,
    swing: bool,
}

impl TimeSignature {
    pub fn new(top: u8, bottom: Note, swing: bool) -> Result<Self, MusicError> {
        if top == 0 || top > 10 {
            return Err(MusicError::InvalidTimeSignatureTop(top));
        }
        if bottom.dots > 1 || bottom.rest {
            return Err(MusicError::InvalidTimeSignatureBottom);
        }
        Ok(TimeSignature {
            top,
            bottom: bottom.normalized(),
            swing,
        })
    }

    pub fn two_four() -> Self {
        TimeSignature {
            top: 2,
            bottom: Note::quarter(),
            swing: false,
        }
    }

    pub fn three_four() -> Self {
        TimeSignature {
            top: 3,
            bottom: Note::quarter(),
            swing: false,
        }
    }

    pub fn four_four() -> Self {
        TimeSignature {
            top: 4,
            bottom: Note::quarter(),
            swing: false,
        }
    }

    /// Compound duple: two dotted-quarter beats, notated 6/8.
    pub fn six_eight() -> Self {
        TimeSignature {
            top: 2,
            bottom: Note::dotted_quarter(),
            swing: false,
        }
    }

    pub fn with_swing(mut self) -> Self {
        self.swing = true;
        self
    }

    pub fn top(&self) -> u8 {
        self.top
    }

    pub fn bottom(&self) -> &Note {
        &self.bottom
    }

    pub fn is_swing(&self) -> bool {
        self.swing
    }

    /// Compound meters carry a dotted beat unit, subdividing into thirds
    /// and sixths rather than halves and quarters.
    pub fn is_compound(&self) -> bool {
        self.bottom.dots == 1
    }

    pub fn beats_per_measure(&self) -> f64 {
        self.top as f64
    }

    /// Shift a within-beat fraction for swing feel: the literal halfway
    /// subdivision sounds a sixth of a beat later.
    pub fn swing_adjusted(&self, fraction: f64) -> f64 {
        if self.swing && (fraction - 0.5).abs() < FLOAT_EPSILON {
            fraction + SWING_SHIFT
        } else {
            fraction
        }
    }

    /// The counts applicable to this meter, paired with their
    /// swing-adjusted within-beat timings.
    pub fn counts(&self) -> Vec<(Count, f64)> {
        let set: &[Count] = if self.is_compound() {
            &Count::COMPOUND
        } else {
            &Count::SIMPLE
        };
        set.iter()
            .map(|c| (*c, self.swing_adjusted(c.timing())))
            .collect()
    }

    /// Notated signature. A compound meter displays its subdivision
    /// count over the undotted subdivision value, e.g. two dotted
    /// quarters render as 6/8.
    pub fn notation(&self) -> String {
        if self.is_compound() {
            format!(
                "{}/{}",
                self.top as u16 * 3,
                self.bottom.value.denominator() as u16 * 2
            )
        } else {
            format!("{}/{}", self.top, self.bottom.value.denominator())
        }
    }

    fn spoken_number(beat: u8) -> &'static str {
        match beat {
            1 => "one",
            2 => "two",
            3 => "three",
            4 => "four",
            5 => "five",
            6 => "six",
            7 => "seven",
            8 => "eight",
            9 => "nine",
            _ => "ten",
        }
    }

    /// The spoken lead-in played before the piece: one measure of
    /// numbers, then a measure ending in "ready, go" on the last two
    /// beats. With a single-beat measure the cue words each take a
    /// measure of their own so they still land on consecutive beats.
    pub fn count_off(&self) -> Piece {
        let mut sounds: Vec<&'static str> = Vec::new();
        for beat in 1..=self.top {
            sounds.push(Self::spoken_number(beat));
        }
        if self.top >= 2 {
            for beat in 1..=self.top - 2 {
                sounds.push(Self::spoken_number(beat));
            }
        }
        sounds.push("ready");
        sounds.push("go");

        let notes: Vec<Note> = sounds
            .into_iter()
            .map(|word| self.bottom.clone().with_sound(word))
            .collect();
        match Piece::new(self.clone(), notes) {
            Ok(piece) => piece,
            Err(_) => unreachable!("countoff notes are derived from a valid signature"),
        }
    }
}
