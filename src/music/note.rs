use serde::{Deserialize, Serialize};

use crate::error::MusicError;

/// The five supported note durations, identified by their denominator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl NoteValue {
    pub const ALL: [NoteValue; 5] = [
        NoteValue::Whole,
        NoteValue::Half,
        NoteValue::Quarter,
        NoteValue::Eighth,
        NoteValue::Sixteenth,
    ];

    pub fn from_denominator(denominator: u8) -> Result<Self, MusicError> {
        match denominator {
            1 => Ok(NoteValue::Whole),
            2 => Ok(NoteValue::Half),
            4 => Ok(NoteValue::Quarter),
            8 => Ok(NoteValue::Eighth),
            16 => Ok(NoteValue::Sixteenth),
            other => Err(MusicError::InvalidNoteValue(other)),
        }
    }

    pub fn denominator(self) -> u8 {
        match self {
            NoteValue::Whole => 1,
            NoteValue::Half => 2,
            NoteValue::Quarter => 4,
            NoteValue::Eighth => 8,
            NoteValue::Sixteenth => 16,
        }
    }

    /// Number of beams (or flags) drawn on the stem.
    pub fn beams(self) -> u8 {
        match self {
            NoteValue::Eighth => 1,
            NoteValue::Sixteenth => 2,
            _ => 0,
        }
    }

    pub fn has_stem(self) -> bool {
        !matches!(self, NoteValue::Whole)
    }

    /// Length as a fraction of a whole note.
    pub fn absolute_length(self) -> f64 {
        1.0 / self.denominator() as f64
    }

    pub fn name(self) -> &'static str {
        match self {
            NoteValue::Whole => "whole",
            NoteValue::Half => "half",
            NoteValue::Quarter => "quarter",
            NoteValue::Eighth => "eighth",
            NoteValue::Sixteenth => "sixteenth",
        }
    }

    /// The value lasting twice as long, if one exists.
    pub fn doubled(self) -> Result<Self, MusicError> {
        match self {
            NoteValue::Whole => Err(MusicError::NoteValueOutOfRange {
                op: "double",
                value: "whole",
            }),
            other => NoteValue::from_denominator(other.denominator() / 2),
        }
    }

    /// The value lasting half as long, if one exists.
    pub fn halved(self) -> Result<Self, MusicError> {
        match self {
            NoteValue::Sixteenth => Err(MusicError::NoteValueOutOfRange {
                op: "halve",
                value: "sixteenth",
            }),
            other => NoteValue::from_denominator(other.denominator() * 2),
        }
    }
}

impl TryFrom<u8> for NoteValue {
    type Error = MusicError;

    fn try_from(denominator: u8) -> Result<Self, Self::Error> {
        NoteValue::from_denominator(denominator)
    }
}

impl From<NoteValue> for u8 {
    fn from(value: NoteValue) -> u8 {
        value.denominator()
    }
}

/// Custom rendering wrapped around a note's glyph token.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Glyph {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
}

/// A single notated duration. A rest is the same value with `rest` set; it
/// occupies time and beat counting but never sounds and is never expected
/// to be clapped.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Note {
    pub value: NoteValue,
    #[serde(default)]
    pub dots: u8,
    #[serde(default)]
    pub rest: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyph: Option<Glyph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

impl Note {
    pub fn new(value: NoteValue, dots: u8) -> Result<Self, MusicError> {
        if dots > 2 {
            return Err(MusicError::InvalidDots(dots));
        }
        Ok(Note {
            value,
            dots,
            rest: false,
            glyph: None,
            sound: None,
        })
    }

    pub fn rest(value: NoteValue, dots: u8) -> Result<Self, MusicError> {
        let mut note = Note::new(value, dots)?;
        note.rest = true;
        Ok(note)
    }

    fn plain(value: NoteValue, dots: u8, rest: bool) -> Self {
        Note {
            value,
            dots,
            rest,
            glyph: None,
            sound: None,
        }
    }

    pub fn whole() -> Self {
        Note::plain(NoteValue::Whole, 0, false)
    }

    pub fn half() -> Self {
        Note::plain(NoteValue::Half, 0, false)
    }

    pub fn quarter() -> Self {
        Note::plain(NoteValue::Quarter, 0, false)
    }

    pub fn eighth() -> Self {
        Note::plain(NoteValue::Eighth, 0, false)
    }

    pub fn sixteenth() -> Self {
        Note::plain(NoteValue::Sixteenth, 0, false)
    }

    pub fn dotted_half() -> Self {
        Note::plain(NoteValue::Half, 1, false)
    }

    pub fn dotted_quarter() -> Self {
        Note::plain(NoteValue::Quarter, 1, false)
    }

    pub fn dotted_eighth() -> Self {
        Note::plain(NoteValue::Eighth, 1, false)
    }

    pub fn quarter_rest() -> Self {
        Note::plain(NoteValue::Quarter, 0, true)
    }

    pub fn eighth_rest() -> Self {
        Note::plain(NoteValue::Eighth, 0, true)
    }

    pub fn half_rest() -> Self {
        Note::plain(NoteValue::Half, 0, true)
    }

    pub fn with_dots(mut self, dots: u8) -> Result<Self, MusicError> {
        if dots > 2 {
            return Err(MusicError::InvalidDots(dots));
        }
        self.dots = dots;
        Ok(self)
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn with_glyph(mut self, glyph: Glyph) -> Self {
        self.glyph = Some(glyph);
        self
    }

    /// Whether this note is expected to be performed (clapped).
    pub fn performs(&self) -> bool {
        !self.rest
    }

    fn dot_multiplier(&self) -> f64 {
        match self.dots {
            0 => 1.0,
            1 => 1.5,
            _ => 1.75,
        }
    }

    /// Length as a fraction of a whole note, dots included.
    pub fn absolute_length(&self) -> f64 {
        self.value.absolute_length() * self.dot_multiplier()
    }

    /// Length of this note measured in units of `other`. This is the
    /// universal ratio used to compare durations.
    pub fn relative_length(&self, other: &Note) -> f64 {
        self.absolute_length() / other.absolute_length()
    }

    /// The same duration without any custom glyph or sound attached.
    pub fn normalized(&self) -> Note {
        Note {
            value: self.value,
            dots: self.dots,
            rest: self.rest,
            glyph: None,
            sound: None,
        }
    }

    pub fn doubled(&self) -> Result<Note, MusicError> {
        let mut note = self.clone();
        note.value = self.value.doubled()?;
        Ok(note)
    }

    pub fn halved(&self) -> Result<Note, MusicError> {
        let mut note = self.clone();
        note.value = self.value.halved()?;
        Ok(note)
    }

    /// Markup token for the staff renderer. Rests are prefixed with `r`,
    /// dots append `.` and a custom glyph wraps the token.
    pub fn notation(&self) -> String {
        let base = match self.value {
            NoteValue::Whole => "w",
            NoteValue::Half => "h",
            NoteValue::Quarter => "q",
            NoteValue::Eighth => "e",
            NoteValue::Sixteenth => "s",
        };
        let mut token = String::new();
        if self.rest {
            token.push('r');
        }
        token.push_str(base);
        for _ in 0..self.dots {
            token.push('.');
        }
        match &self.glyph {
            Some(glyph) => format!("{}{}{}", glyph.prefix, token, glyph.suffix),
            None => token,
        }
    }

    pub fn description(&self) -> String {
        let dots = match self.dots {
            0 => "",
            1 => "dotted ",
            _ => "double-dotted ",
        };
        let kind = if self.rest { "rest" } else { "note" };
        format!("{}{} {}", dots, self.value.name(), kind)
    }
}
