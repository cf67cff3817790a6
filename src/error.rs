use thiserror::Error;

/// Errors raised by constructors and the measure generator. These all
/// indicate authoring mistakes in level data; user timing input is never
/// an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MusicError {
    #[error("invalid note value denominator: {0}")]
    InvalidNoteValue(u8),

    #[error("note dots must be between 0 and 2, got {0}")]
    InvalidDots(u8),

    #[error("cannot {op} a {value} note")]
    NoteValueOutOfRange {
        op: &'static str,
        value: &'static str,
    },

    #[error("time signature top must be between 1 and 10, got {0}")]
    InvalidTimeSignatureTop(u8),

    #[error("time signature bottom must be a sounding note with at most one dot")]
    InvalidTimeSignatureBottom,

    #[error("tempo must be positive, got {0}")]
    InvalidTempo(f64),

    #[error("a block must contain at least one note")]
    EmptyBlock,

    #[error("requested {requested} measures but {required} blocks are required")]
    TooFewMeasures { requested: usize, required: usize },

    #[error("required block {0} fits in none of the generated measures")]
    UnplaceableRequiredBlock(usize),

    #[error("the block library tiles no complete measure")]
    NoValidMeasures,
}
