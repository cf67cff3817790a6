use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::MusicError;
use crate::music::note::Note;
use crate::music::piece::{nudge_float, FLOAT_EPSILON};
use crate::music::time_signature::TimeSignature;

/// A fixed run of notes usable as a sub-measure building block.
///
/// `allowed_starts` lists the fractional-beat offsets within a measure
/// at which the block may begin; `None` allows any offset. Required
/// blocks are guaranteed to appear in generated exercises.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Block {
    pub notes: Vec<Note>,
    #[serde(default)]
    pub allowed_starts: Option<Vec<f64>>,
    #[serde(default)]
    pub required: bool,
}

impl Block {
    pub fn new(notes: Vec<Note>) -> Result<Self, MusicError> {
        if notes.is_empty() {
            return Err(MusicError::EmptyBlock);
        }
        Ok(Block {
            notes,
            allowed_starts: None,
            required: false,
        })
    }

    pub fn with_allowed_starts(mut self, starts: Vec<f64>) -> Self {
        self.allowed_starts = Some(starts);
        self
    }

    pub fn as_required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Combined length in beats of the given meter.
    pub fn length(&self, time_signature: &TimeSignature) -> f64 {
        let bottom = time_signature.bottom();
        nudge_float(
            self.notes
                .iter()
                .map(|n| n.relative_length(bottom))
                .sum::<f64>(),
        )
    }

    fn allows_start(&self, offset: f64) -> bool {
        match &self.allowed_starts {
            None => true,
            Some(starts) => starts.iter().any(|s| (s - offset).abs() < FLOAT_EPSILON),
        }
    }

    /// Enumerate every way to tile one measure from the library,
    /// breadth first: seed with each block allowed at offset 0, then
    /// repeatedly extend each partial sequence by each block allowed at
    /// its current length, keeping totals within the measure. Sequences
    /// that land exactly on the measure length are complete; dead ends
    /// drop out. Returns measures as lists of block indices.
    pub fn all_possible_measures(
        blocks: &[Block],
        time_signature: &TimeSignature,
    ) -> Result<Vec<Vec<usize>>, MusicError> {
        if blocks.iter().any(|b| b.notes.is_empty()) {
            return Err(MusicError::EmptyBlock);
        }
        let target = time_signature.beats_per_measure();
        let lengths: Vec<f64> = blocks.iter().map(|b| b.length(time_signature)).collect();

        let mut complete: Vec<Vec<usize>> = Vec::new();
        let mut frontier: Vec<(Vec<usize>, f64)> = blocks
            .iter()
            .enumerate()
            .filter(|(i, b)| b.allows_start(0.0) && lengths[*i] <= target + FLOAT_EPSILON)
            .map(|(i, _)| (vec![i], lengths[i]))
            .collect();

        while !frontier.is_empty() {
            let mut extended: Vec<(Vec<usize>, f64)> = Vec::new();
            for (sequence, length) in frontier {
                if (length - target).abs() < FLOAT_EPSILON {
                    complete.push(sequence);
                    continue;
                }
                for (i, block) in blocks.iter().enumerate() {
                    if block.allows_start(length) && length + lengths[i] <= target + FLOAT_EPSILON
                    {
                        let mut grown = sequence.clone();
                        grown.push(i);
                        extended.push((grown, nudge_float(length + lengths[i])));
                    }
                }
            }
            frontier = extended;
        }

        Ok(complete)
    }

    /// Build `count` random measures and flatten them to one note
    /// sequence. Every required block appears at least once, which is
    /// why `count` must cover the number of required blocks; remaining
    /// slots are uniform over all tilings and the measure order is
    /// shuffled.
    pub fn random_measures<R: Rng + ?Sized>(
        time_signature: &TimeSignature,
        count: usize,
        blocks: &[Block],
        rng: &mut R,
    ) -> Result<Vec<Note>, MusicError> {
        let required: Vec<usize> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.required)
            .map(|(i, _)| i)
            .collect();
        if count < required.len() {
            return Err(MusicError::TooFewMeasures {
                requested: count,
                required: required.len(),
            });
        }

        let all = Self::all_possible_measures(blocks, time_signature)?;
        if count > 0 && all.is_empty() {
            return Err(MusicError::NoValidMeasures);
        }
        log::debug!(
            "generating {} measures from {} tilings of {} blocks",
            count,
            all.len(),
            blocks.len()
        );

        let mut chosen: Vec<Vec<usize>> = Vec::with_capacity(count);
        for &index in &required {
            let candidates: Vec<&Vec<usize>> =
                all.iter().filter(|m| m.contains(&index)).collect();
            let pick = candidates
                .choose(rng)
                .ok_or(MusicError::UnplaceableRequiredBlock(index))?;
            chosen.push((*pick).clone());
        }
        while chosen.len() < count {
            match all.choose(rng) {
                Some(measure) => chosen.push(measure.clone()),
                None => return Err(MusicError::NoValidMeasures),
            }
        }
        chosen.shuffle(rng);

        Ok(chosen
            .iter()
            .flatten()
            .flat_map(|&i| blocks[i].notes.iter().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quarter_pair() -> Block {
        Block::new(vec![Note::quarter(), Note::quarter()])
            .unwrap()
            .with_allowed_starts(vec![0.0, 2.0])
    }

    fn half_block() -> Block {
        Block::new(vec![Note::half()])
            .unwrap()
            .with_allowed_starts(vec![0.0, 2.0])
    }

    #[test]
    fn test_empty_block_rejected() {
        assert_eq!(Block::new(vec![]), Err(MusicError::EmptyBlock));
    }

    #[test]
    fn test_block_length_in_meter() {
        let ts = TimeSignature::four_four();
        assert_eq!(quarter_pair().length(&ts), 2.0);
        assert_eq!(half_block().length(&ts), 2.0);

        // An eighth-note block spans a third of a compound beat.
        let ts = TimeSignature::six_eight();
        let block = Block::new(vec![Note::eighth(); 3]).unwrap();
        assert_eq!(block.length(&ts), 1.0);
    }

    #[test]
    fn test_all_possible_measures_in_four_four() {
        let blocks = vec![quarter_pair(), half_block()];
        let ts = TimeSignature::four_four();
        let measures = Block::all_possible_measures(&blocks, &ts).unwrap();

        // Two two-beat slots, two candidates each.
        assert_eq!(measures.len(), 4);
        assert!(measures.contains(&vec![0, 0]));
        assert!(measures.contains(&vec![1, 1]));

        for measure in &measures {
            let total: f64 = measure.iter().map(|&i| blocks[i].length(&ts)).sum();
            assert!(total <= 4.0 + FLOAT_EPSILON);
            assert!((total - 4.0).abs() < FLOAT_EPSILON);
        }
    }

    #[test]
    fn test_allowed_starts_constrain_tilings() {
        // The pair may only begin a measure; the half may only finish one.
        let start_only = Block::new(vec![Note::quarter(), Note::quarter()])
            .unwrap()
            .with_allowed_starts(vec![0.0]);
        let end_only = Block::new(vec![Note::half()])
            .unwrap()
            .with_allowed_starts(vec![2.0]);
        let measures =
            Block::all_possible_measures(&[start_only, end_only], &TimeSignature::four_four())
                .unwrap();
        assert_eq!(measures, vec![vec![0, 1]]);
    }

    #[test]
    fn test_unconstrained_block_starts_anywhere() {
        let anywhere = Block::new(vec![Note::half()]).unwrap();
        let measures =
            Block::all_possible_measures(&[anywhere], &TimeSignature::four_four()).unwrap();
        assert_eq!(measures, vec![vec![0, 0]]);
    }

    #[test]
    fn test_random_measures_flatten_and_cover_required() {
        let blocks = vec![quarter_pair(), half_block().as_required()];
        let ts = TimeSignature::four_four();
        let mut rng = StdRng::seed_from_u64(7);
        let notes = Block::random_measures(&ts, 3, &blocks, &mut rng).unwrap();

        let bottom = ts.bottom().clone();
        let total: f64 = notes.iter().map(|n| n.relative_length(&bottom)).sum();
        assert!((total - 12.0).abs() < 1e-9);
        // The required half-note block must have been placed somewhere.
        assert!(notes.iter().any(|n| *n == Note::half()));
    }

    #[test]
    fn test_random_measures_requires_enough_slots() {
        let blocks = vec![
            quarter_pair().as_required(),
            half_block().as_required(),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let result = Block::random_measures(&TimeSignature::four_four(), 1, &blocks, &mut rng);
        assert_eq!(
            result,
            Err(MusicError::TooFewMeasures {
                requested: 1,
                required: 2,
            })
        );
    }

    #[test]
    fn test_unplaceable_required_block() {
        // Allowed only at beat 1, but four beats long: fits nowhere.
        let misfit = Block::new(vec![Note::whole()])
            .unwrap()
            .with_allowed_starts(vec![1.0])
            .as_required();
        let blocks = vec![quarter_pair(), misfit];
        let mut rng = StdRng::seed_from_u64(7);
        let result = Block::random_measures(&TimeSignature::four_four(), 2, &blocks, &mut rng);
        assert_eq!(result, Err(MusicError::UnplaceableRequiredBlock(1)));
    }

    #[test]
    fn test_no_valid_measures() {
        // A three-beat block can never tile a four-beat measure.
        let awkward = Block::new(vec![Note::dotted_half()]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let result = Block::random_measures(&TimeSignature::four_four(), 2, &[awkward], &mut rng);
        assert_eq!(result, Err(MusicError::NoValidMeasures));
    }
}
