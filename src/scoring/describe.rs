use serde::Serialize;

use crate::music::count::Count;
use crate::music::piece::nudge_float;
use crate::music::time_signature::TimeSignature;
use crate::scoring::event::beat_length_ms;

/// Offsets inside this window read as "right on" the count.
pub const ON_WINDOW_MS: f64 = 50.0;

/// Offsets beyond this read as "well" before or after rather than
/// "a little".
const FAR_WINDOW_MS: f64 = 100.0;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Short,
    Medium,
    Long,
}

/// Where an absolute beat timing falls: the nearest known count, the
/// 0-indexed beat within the measure, and how far off the timing was.
#[derive(Serialize, Clone, Debug)]
pub struct TimingDescription {
    pub count: Count,
    pub beat: usize,
    pub offset_beats: f64,
    pub offset_ms: f64,
}

impl TimingDescription {
    pub fn of(timing: f64, time_signature: &TimeSignature, tempo: f64) -> Self {
        let t = nudge_float(timing);
        let base = t.floor();
        let fraction = t - base;

        let mut count = Count::Beat;
        let mut count_timing = 0.0;
        let mut distance = f64::INFINITY;
        for (candidate, candidate_timing) in time_signature.counts() {
            let d = (fraction - candidate_timing).abs();
            if d < distance {
                distance = d;
                count = candidate;
                count_timing = candidate_timing;
            }
        }
        // The next downbeat can be nearer than any count within this beat.
        if 1.0 - fraction < distance {
            count = Count::Beat;
            count_timing = 1.0;
        }

        let beat_number = base as i64 + if count_timing >= 1.0 { 1 } else { 0 };
        let measure = time_signature.top() as i64;
        let beat = beat_number.rem_euclid(measure) as usize;
        let offset_beats = t - (base + count_timing);
        let offset_ms = offset_beats * beat_length_ms(tempo);

        TimingDescription {
            count,
            beat,
            offset_beats,
            offset_ms,
        }
    }

    fn place(&self) -> String {
        match self.count {
            Count::Beat => format!("beat {}", self.beat + 1),
            other => format!("the \"{}\" of beat {}", other.spoken(), self.beat + 1),
        }
    }

    pub fn description(&self, verbosity: Verbosity) -> String {
        match verbosity {
            Verbosity::Short => match self.count {
                Count::Beat => (self.beat + 1).to_string(),
                other => other.spoken().to_string(),
            },
            Verbosity::Medium => self.place(),
            Verbosity::Long => {
                if self.offset_ms.abs() < ON_WINDOW_MS {
                    format!("right on {}", self.place())
                } else {
                    let degree = if self.offset_ms.abs() < FAR_WINDOW_MS {
                        "a little"
                    } else {
                        "well"
                    };
                    let side = if self.offset_ms < 0.0 { "before" } else { "after" };
                    format!("{} {} {}", degree, side, self.place())
                }
            }
        }
    }
}
