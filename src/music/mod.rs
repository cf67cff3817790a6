pub mod count;
pub mod note;
pub mod piece;
pub mod time_signature;

pub use count::Count;
pub use note::{Glyph, Note, NoteValue};
pub use piece::{nudge_float, Piece, FLOAT_EPSILON, SWING_SHIFT};
pub use time_signature::TimeSignature;
