// ============================================================
// Layer 3 — Curriculum
// ============================================================
// A curriculum says how many samples each difficulty level
// contributes to one training batch:
//
//   pose     — pose pairs drawn from each level
//   matching — POSITIVE match pairs drawn from each level;
//              the match batch is topped up with the same
//              number of negatives in total
//
// The fixed schedule skips the two hardest levels entirely.

use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which schedule to build a curriculum from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CurriculumKind {
    /// Hand-tuned five-level schedule
    Fixed,
    /// Equal share per level derived from the batch size
    Uniform,
}

const FIXED_POSE:  [usize; 5] = [90, 80, 80, 0, 0];
const FIXED_MATCH: [usize; 5] = [45, 40, 40, 0, 0];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    pub pose:     Vec<usize>,
    pub matching: Vec<usize>,
}

impl Curriculum {
    pub fn fixed() -> Self {
        Self { pose: FIXED_POSE.to_vec(), matching: FIXED_MATCH.to_vec() }
    }

    pub fn uniform(batch_size: usize, levels: usize) -> Self {
        Self {
            pose:     vec![batch_size / levels; levels],
            matching: vec![batch_size / (2 * levels); levels],
        }
    }

    /// Build the schedule for a dataset with `levels` levels.
    pub fn build(kind: CurriculumKind, batch_size: usize, levels: usize) -> Result<Self> {
        if levels == 0 {
            bail!("a curriculum needs at least one level");
        }
        let curriculum = match kind {
            CurriculumKind::Fixed => {
                if levels != FIXED_POSE.len() {
                    bail!(
                        "the fixed curriculum is defined for {} levels, dataset has {levels}",
                        FIXED_POSE.len()
                    );
                }
                Self::fixed()
            }
            CurriculumKind::Uniform => Self::uniform(batch_size, levels),
        };
        if curriculum.pose_batch_size() == 0 || curriculum.match_batch_size() == 0 {
            bail!("curriculum yields an empty batch (batch_size={batch_size}, levels={levels})");
        }
        Ok(curriculum)
    }

    pub fn levels(&self) -> usize {
        self.pose.len()
    }

    pub fn pose_batch_size(&self) -> usize {
        self.pose.iter().sum()
    }

    /// Positives plus an equal number of negatives.
    pub fn match_batch_size(&self) -> usize {
        2 * self.matching.iter().sum::<usize>()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_schedule() {
        let c = Curriculum::build(CurriculumKind::Fixed, 250, 5).unwrap();
        assert_eq!(c.pose_batch_size(), 250);
        assert_eq!(c.match_batch_size(), 250);
        assert_eq!(c.levels(), 5);
    }

    #[test]
    fn test_fixed_rejects_other_level_counts() {
        assert!(Curriculum::build(CurriculumKind::Fixed, 250, 4).is_err());
    }

    #[test]
    fn test_uniform_schedule() {
        let c = Curriculum::build(CurriculumKind::Uniform, 250, 5).unwrap();
        assert_eq!(c.pose, vec![50; 5]);
        assert_eq!(c.matching, vec![25; 5]);
    }

    #[test]
    fn test_uniform_too_small_batch() {
        assert!(Curriculum::build(CurriculumKind::Uniform, 8, 5).is_err());
    }
}
