use serde::Serialize;

/// A named position within a beat. Simple meters subdivide into quarters
/// of a beat ("1 e and a"); compound meters subdivide into sixths
/// ("1 di ta ti ma mi"). `And` and `Ti` land on the same timing but remain
/// distinct identities, so equality is by variant, never by timing value.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Count {
    Beat,
    E,
    And,
    A,
    Di,
    Ta,
    Ti,
    Ma,
    Mi,
}

impl Count {
    pub const SIMPLE: [Count; 4] = [Count::Beat, Count::E, Count::And, Count::A];

    pub const COMPOUND: [Count; 6] = [
        Count::Beat,
        Count::Di,
        Count::Ta,
        Count::Ti,
        Count::Ma,
        Count::Mi,
    ];

    /// Fractional position within the beat, in [0, 1).
    pub fn timing(self) -> f64 {
        match self {
            Count::Beat => 0.0,
            Count::E => 0.25,
            Count::And => 0.5,
            Count::A => 0.75,
            Count::Di => 1.0 / 6.0,
            Count::Ta => 1.0 / 3.0,
            Count::Ti => 0.5,
            Count::Ma => 2.0 / 3.0,
            Count::Mi => 5.0 / 6.0,
        }
    }

    /// The syllable spoken when counting aloud.
    pub fn spoken(self) -> &'static str {
        match self {
            Count::Beat => "beat",
            Count::E => "e",
            Count::And => "and",
            Count::A => "a",
            Count::Di => "di",
            Count::Ta => "ta",
            Count::Ti => "ti",
            Count::Ma => "ma",
            Count::Mi => "mi",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Count::Beat => "the beat",
            Count::E => "the \"e\" after the beat",
            Count::And => "the \"and\" halfway through the beat",
            Count::A => "the \"a\" before the next beat",
            Count::Di => "the \"di\" after the beat",
            Count::Ta => "the \"ta\" a third through the beat",
            Count::Ti => "the \"ti\" halfway through the beat",
            Count::Ma => "the \"ma\" two thirds through the beat",
            Count::Mi => "the \"mi\" before the next beat",
        }
    }
}
