use serde::Serialize;

/// Absolute timing error, in milliseconds, at which accuracy reaches zero.
pub const TIMING_THRESHOLD_MS: f64 = 200.0;

pub fn beat_length_ms(tempo: f64) -> f64 {
    60_000.0 / tempo
}

/// One gradable occurrence on the timeline: a note onset or a beat.
///
/// `timing` is in beats from the start of the piece. Performance attempts
/// are signed beat offsets from that timing, kept sorted by ascending
/// absolute value so the first entry is always the best claimed match.
#[derive(Serialize, Clone, Debug)]
pub struct MusicEvent {
    pub timing: f64,
    pub should_perform: bool,
    pub graded: bool,
    attempts: Vec<f64>,
}

impl MusicEvent {
    pub fn new(timing: f64, should_perform: bool) -> Self {
        MusicEvent {
            timing,
            should_perform,
            graded: false,
            attempts: Vec::new(),
        }
    }

    pub fn attempts(&self) -> &[f64] {
        &self.attempts
    }

    /// Insert an attempt, keeping the list sorted by absolute value.
    pub fn add_attempt(&mut self, offset: f64) {
        let at = self
            .attempts
            .iter()
            .position(|a| a.abs() > offset.abs())
            .unwrap_or(self.attempts.len());
        self.attempts.insert(at, offset);
    }

    /// The attempt closest to the event's timing, if any.
    pub fn best_attempt(&self) -> Option<f64> {
        self.attempts.first().copied()
    }

    /// The attempt earliest in wall-clock time (most negative offset).
    pub fn earliest_attempt(&self) -> Option<f64> {
        self.attempts.iter().copied().reduce(f64::min)
    }

    /// Remove and return the earliest attempt. Used when a guess is
    /// reassigned to the preceding event.
    pub fn take_earliest_attempt(&mut self) -> Option<f64> {
        let earliest = self.earliest_attempt()?;
        let at = self.attempts.iter().position(|a| *a == earliest)?;
        Some(self.attempts.remove(at))
    }

    /// Attempts beyond the first; these dilute the aggregate accuracy.
    pub fn extra_attempts(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }

    pub fn clear_grading(&mut self) {
        self.attempts.clear();
        self.graded = false;
    }

    /// Score in [0, 1]. For a performed event: linear falloff from 1 at a
    /// perfect hit to 0 at `TIMING_THRESHOLD_MS` of error. For a rest:
    /// 1 when correctly left alone, 0 when clapped at. `offset` is a
    /// correction subtracted from the best attempt before scoring.
    pub fn accuracy(&self, tempo: f64, offset: f64) -> f64 {
        if self.should_perform {
            match self.best_attempt() {
                None => 0.0,
                Some(best) => {
                    let error_ms = (best - offset).abs() * beat_length_ms(tempo);
                    (1.0 - error_ms / TIMING_THRESHOLD_MS).max(0.0)
                }
            }
        } else if self.attempts.is_empty() {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_sorted_by_absolute_value() {
        let mut event = MusicEvent::new(1.0, true);
        event.add_attempt(0.3);
        event.add_attempt(-0.1);
        event.add_attempt(0.2);
        assert_eq!(event.attempts(), &[-0.1, 0.2, 0.3]);
        assert_eq!(event.best_attempt(), Some(-0.1));
        assert_eq!(event.extra_attempts(), 2);
    }

    #[test]
    fn test_earliest_attempt_is_most_negative() {
        let mut event = MusicEvent::new(1.0, true);
        event.add_attempt(0.05);
        event.add_attempt(-0.4);
        assert_eq!(event.earliest_attempt(), Some(-0.4));
        assert_eq!(event.take_earliest_attempt(), Some(-0.4));
        assert_eq!(event.attempts(), &[0.05]);
    }

    #[test]
    fn test_accuracy_endpoints() {
        let mut event = MusicEvent::new(0.0, true);
        assert_eq!(event.accuracy(60.0, 0.0), 0.0);

        event.add_attempt(0.0);
        assert_eq!(event.accuracy(60.0, 0.0), 1.0);

        // At 60 bpm one beat is 1000ms, so 0.2 beats is exactly the
        // 200ms threshold.
        let mut late = MusicEvent::new(0.0, true);
        late.add_attempt(0.2);
        assert_eq!(late.accuracy(60.0, 0.0), 0.0);
        late.clear_grading();
        late.add_attempt(0.1);
        assert!((late.accuracy(60.0, 0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_threshold_is_tempo_scaled() {
        // 0.2 beats at 120 bpm is only 100ms of error.
        let mut event = MusicEvent::new(0.0, true);
        event.add_attempt(0.2);
        assert!((event.accuracy(120.0, 0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_monotonically_decreasing() {
        let mut last = f64::INFINITY;
        for i in 0..20 {
            let mut event = MusicEvent::new(0.0, true);
            event.add_attempt(i as f64 * 0.01);
            let acc = event.accuracy(60.0, 0.0);
            assert!(acc <= last);
            last = acc;
        }
    }

    #[test]
    fn test_rest_accuracy() {
        let mut rest = MusicEvent::new(2.0, false);
        assert_eq!(rest.accuracy(60.0, 0.0), 1.0);
        rest.add_attempt(0.01);
        assert_eq!(rest.accuracy(60.0, 0.0), 0.0);
    }

    #[test]
    fn test_offset_correction_shifts_error() {
        let mut event = MusicEvent::new(0.0, true);
        event.add_attempt(0.1);
        // Correcting by the full offset restores a perfect score.
        assert_eq!(event.accuracy(60.0, 0.1), 1.0);
    }
}
