use serde::Serialize;

use crate::scoring::event::MusicEvent;

/// Aggregate grading statistics for one event stream.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct GradingInfo {
    /// Fraction of graded events scored above zero, diluted by extra
    /// (duplicate) attempts.
    pub accuracy: f64,
    /// Mean per-event accuracy across every counted event, graded or not.
    pub timing_rating: f64,
    /// Mean best-attempt offset in beats across graded events.
    pub average_offset: f64,
}

/// An ordered sequence of timed events with the closest-match grading
/// algorithm. When `ignore_last` is set the trailing event is structural
/// (the final barline's beat) and excluded from statistics.
#[derive(Serialize, Clone, Debug)]
pub struct EventList {
    events: Vec<MusicEvent>,
    ignore_last: bool,
}

impl EventList {
    pub fn new(events: Vec<MusicEvent>, ignore_last: bool) -> Self {
        EventList {
            events,
            ignore_last,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[MusicEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> &MusicEvent {
        &self.events[index]
    }

    /// The events that participate in statistics.
    fn counted(&self) -> &[MusicEvent] {
        if self.ignore_last && !self.events.is_empty() {
            &self.events[..self.events.len() - 1]
        } else {
            &self.events
        }
    }

    /// Assign a performance attempt (in beats from the start) to the
    /// closest event and record its signed offset there. Returns the
    /// indices of every event whose attempts changed.
    ///
    /// Events are sorted by timing, so the scan tracks the minimum
    /// distance seen and stops as soon as the distance starts growing.
    ///
    /// A one-step-back correction handles the ambiguity of online
    /// grading: when the chosen event already holds an early (negative)
    /// earliest attempt and the preceding performable event has no
    /// attempt of its own, that earlier guess is rebased onto the
    /// preceding event — the first clap was evidently meant for it.
    pub fn grade_performance_attempt(&mut self, attempt: f64) -> Vec<usize> {
        assert!(
            !self.events.is_empty(),
            "cannot grade against an empty event list"
        );

        let mut closest = 0;
        let mut min_distance = f64::INFINITY;
        for (i, event) in self.events.iter().enumerate() {
            let distance = (attempt - event.timing).abs();
            if distance < min_distance {
                min_distance = distance;
                closest = i;
            } else if distance > min_distance {
                break;
            }
        }

        let mut affected = vec![closest];
        if closest > 0 {
            let previous = &self.events[closest - 1];
            let unclaimed = previous.should_perform && previous.best_attempt().is_none();
            let early_guess = self.events[closest]
                .earliest_attempt()
                .filter(|earliest| *earliest < 0.0);
            if unclaimed && early_guess.is_some() {
                let gap = self.events[closest].timing - self.events[closest - 1].timing;
                if let Some(moved) = self.events[closest].take_earliest_attempt() {
                    self.events[closest - 1].add_attempt(moved + gap);
                    affected.push(closest - 1);
                }
            }
        }

        let offset = attempt - self.events[closest].timing;
        self.events[closest].add_attempt(offset);
        affected
    }

    /// Clear all attempts and grading flags; used when restarting.
    pub fn remove_grading(&mut self) {
        for event in &mut self.events {
            event.clear_grading();
        }
    }

    /// Mark every event up to and including `time` as eligible for
    /// statistics. Called incrementally as playback passes each event.
    pub fn enable_grading_through(&mut self, time: f64) {
        for event in &mut self.events {
            if event.timing <= time {
                event.graded = true;
            } else {
                break;
            }
        }
    }

    pub fn grading_info(&self, tempo: f64, offset: f64) -> GradingInfo {
        let counted = self.counted();
        let graded: Vec<&MusicEvent> = counted.iter().filter(|e| e.graded).collect();

        let hits = graded
            .iter()
            .filter(|e| e.accuracy(tempo, offset) > 0.0)
            .count();
        let extras: usize = graded.iter().map(|e| e.extra_attempts()).sum();
        let denominator = graded.len() + extras;
        let accuracy = if denominator == 0 {
            0.0
        } else {
            hits as f64 / denominator as f64
        };

        let timing_rating = if counted.is_empty() {
            0.0
        } else {
            counted.iter().map(|e| e.accuracy(tempo, offset)).sum::<f64>() / counted.len() as f64
        };

        let offsets: Vec<f64> = graded.iter().filter_map(|e| e.best_attempt()).collect();
        let average_offset = if offsets.is_empty() {
            0.0
        } else {
            offsets.iter().sum::<f64>() / offsets.len() as f64
        };

        GradingInfo {
            accuracy,
            timing_rating,
            average_offset,
        }
    }

    /// Heuristic for a systematic late offset, e.g. wireless-audio
    /// latency. Latency reads as uniformly late, so an early average
    /// offset rules it out; otherwise re-score with the average offset
    /// subtracted and see whether that alone rescues the accuracy.
    pub fn might_have_latency_issues(&self, tempo: f64) -> bool {
        let raw = self.grading_info(tempo, 0.0);
        if raw.accuracy > 0.8 {
            return false;
        }
        if raw.average_offset <= 0.0 {
            return false;
        }
        let corrected = self.grading_info(tempo, raw.average_offset).accuracy;
        if corrected > 0.65 && corrected - raw.accuracy >= 0.25 {
            log::debug!(
                "latency suspected: accuracy {:.2} -> {:.2} after {:.0}ms correction",
                raw.accuracy,
                corrected,
                raw.average_offset * crate::scoring::event::beat_length_ms(tempo)
            );
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_list(timings: &[f64]) -> EventList {
        EventList::new(
            timings.iter().map(|t| MusicEvent::new(*t, true)).collect(),
            false,
        )
    }

    #[test]
    fn test_grade_finds_closest_event() {
        let mut list = make_list(&[0.0, 1.0, 2.0, 3.0]);
        let affected = list.grade_performance_attempt(2.1);
        assert_eq!(affected, vec![2]);
        assert_eq!(list.get(2).best_attempt(), Some(0.1));
        assert!((list.get(2).best_attempt().unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_grade_returns_in_range_indices() {
        let mut list = make_list(&[0.0, 1.0, 2.0]);
        for attempt in [-5.0, 0.4, 1.6, 99.0] {
            let affected = list.grade_performance_attempt(attempt);
            assert!(!affected.is_empty());
            assert!(affected.iter().all(|i| *i < list.len()));
        }
    }

    #[test]
    fn test_reassignment_moves_early_guess_back() {
        let mut list = make_list(&[0.0, 1.0]);
        // A first clap lands early for event 1 while event 0 is unclaimed.
        list.grade_performance_attempt(0.8);
        assert_eq!(list.get(1).best_attempt(), Some(-0.2));
        assert_eq!(list.get(0).best_attempt(), None);

        // The next clap near event 1 proves the first was meant for
        // event 0: the early guess is rebased one event back.
        let affected = list.grade_performance_attempt(1.02);
        assert!(affected.contains(&1) && affected.contains(&0));
        let rebased = list.get(0).best_attempt().unwrap();
        assert!((rebased - 0.8).abs() < 1e-12);
        let kept = list.get(1).best_attempt().unwrap();
        assert!((kept - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_no_reassignment_without_prior_guess() {
        let mut list = make_list(&[0.0, 1.0]);
        // A lone early clap for event 1 stays where it was assigned.
        let affected = list.grade_performance_attempt(0.9);
        assert_eq!(affected, vec![1]);
        assert_eq!(list.get(0).best_attempt(), None);
    }

    #[test]
    fn test_no_reassignment_onto_rest() {
        let mut events = vec![MusicEvent::new(0.0, false), MusicEvent::new(1.0, true)];
        events[1].add_attempt(-0.2);
        let mut list = EventList::new(events, false);
        let affected = list.grade_performance_attempt(1.0);
        assert_eq!(affected, vec![1]);
        assert_eq!(list.get(0).best_attempt(), None);
    }

    #[test]
    fn test_remove_grading_resets_statistics() {
        let mut list = make_list(&[0.0, 1.0]);
        list.grade_performance_attempt(0.0);
        list.enable_grading_through(1.0);
        list.remove_grading();
        let info = list.grading_info(60.0, 0.0);
        assert_eq!(info.accuracy, 0.0);
        assert_eq!(info.average_offset, 0.0);
    }

    #[test]
    fn test_enable_grading_is_incremental() {
        let mut list = make_list(&[0.0, 1.0, 2.0]);
        list.enable_grading_through(1.0);
        assert!(list.get(0).graded);
        assert!(list.get(1).graded);
        assert!(!list.get(2).graded);
    }

    #[test]
    fn test_extra_attempts_dilute_accuracy() {
        let mut list = make_list(&[0.0, 1.0]);
        list.grade_performance_attempt(0.0);
        list.grade_performance_attempt(1.0);
        // A duplicate clap right on event 1.
        list.grade_performance_attempt(1.01);
        list.enable_grading_through(2.0);
        let info = list.grading_info(60.0, 0.0);
        // 2 hits over 2 graded events + 1 extra attempt.
        assert!((info.accuracy - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_ignore_last_excludes_structural_event() {
        let events = vec![
            MusicEvent::new(0.0, true),
            MusicEvent::new(1.0, true),
            MusicEvent::new(2.0, true),
        ];
        let mut list = EventList::new(events, true);
        list.enable_grading_through(2.0);
        let info = list.grading_info(60.0, 0.0);
        // Only the first two events count; both miss.
        assert_eq!(info.accuracy, 0.0);
        assert_eq!(info.timing_rating, 0.0);

        list.grade_performance_attempt(0.0);
        list.grade_performance_attempt(1.0);
        let info = list.grading_info(60.0, 0.0);
        assert_eq!(info.accuracy, 1.0);
    }

    #[test]
    fn test_timing_rating_covers_ungraded_events() {
        let mut list = make_list(&[0.0, 1.0, 2.0, 3.0]);
        list.grade_performance_attempt(0.0);
        list.enable_grading_through(0.0);
        let info = list.grading_info(60.0, 0.0);
        // One perfect hit averaged over all four events, including the
        // three the playhead has not reached yet.
        assert!((info.timing_rating - 0.25).abs() < 1e-9);
        assert_eq!(info.accuracy, 1.0);
    }

    #[test]
    fn test_latency_heuristic_flags_systematic_lateness() {
        let mut list = make_list(&[0.0, 1.0, 2.0, 3.0]);
        // Uniformly 150ms late at 60 bpm: every accuracy is 0.25, raw
        // hit-rate 1.0 -> no flag (accuracy above 0.8).
        for t in [0.15, 1.15, 2.15, 3.15] {
            list.grade_performance_attempt(t);
        }
        list.enable_grading_through(3.0);
        assert!(!list.might_have_latency_issues(60.0));

        // Uniformly 210ms late: raw accuracy 0, corrected accuracy 1.
        list.remove_grading();
        for t in [0.21, 1.21, 2.21, 3.21] {
            list.grade_performance_attempt(t);
        }
        list.enable_grading_through(3.0);
        assert!(list.might_have_latency_issues(60.0));
    }

    #[test]
    fn test_latency_heuristic_ignores_early_offsets() {
        let mut list = make_list(&[0.0, 1.0]);
        for t in [-0.21, 0.79] {
            list.grade_performance_attempt(t);
        }
        list.enable_grading_through(1.0);
        assert!(!list.might_have_latency_issues(60.0));
    }
}
