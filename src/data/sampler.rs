// ============================================================
// Layer 4 — Curriculum Sampler
// ============================================================
// Draws one training batch per task according to a Curriculum.
// Within a batch, samples of a level are drawn without
// replacement; across batches the pools are sampled afresh.
//
// The pools must have been checked with
// TaskPools::check_curriculum before sampling.

use rand::{rngs::StdRng, seq::index, SeedableRng};

use crate::data::dataset::{PairSample, TaskPools};
use crate::domain::curriculum::Curriculum;

pub struct CurriculumSampler<'a> {
    pools:      &'a TaskPools,
    curriculum: Curriculum,
    rng:        StdRng,
}

impl<'a> CurriculumSampler<'a> {
    pub fn new(pools: &'a TaskPools, curriculum: Curriculum, seed: u64) -> Self {
        Self { pools, curriculum, rng: StdRng::seed_from_u64(seed) }
    }

    /// `curriculum.pose[l]` pose pairs from every level l.
    pub fn pose_batch(&mut self) -> Vec<PairSample> {
        let mut batch = Vec::with_capacity(self.curriculum.pose_batch_size());
        for (pool, &count) in self.pools.pose.iter().zip(&self.curriculum.pose) {
            draw(&mut self.rng, pool, count, &mut batch);
        }
        batch
    }

    /// `curriculum.matching[l]` positives from every level l,
    /// followed by the same number of negatives in total.
    pub fn match_batch(&mut self) -> Vec<PairSample> {
        let mut batch = Vec::with_capacity(self.curriculum.match_batch_size());
        for (pool, &count) in self.pools.positives.iter().zip(&self.curriculum.matching) {
            draw(&mut self.rng, pool, count, &mut batch);
        }
        let negatives = batch.len();
        draw(&mut self.rng, &self.pools.negatives, negatives, &mut batch);
        batch
    }
}

fn draw(rng: &mut StdRng, pool: &[PairSample], count: usize, out: &mut Vec<PairSample>) {
    let count = count.min(pool.len());
    if count == 0 {
        return;
    }
    out.extend(index::sample(rng, pool.len(), count).into_iter().map(|i| pool[i].clone()));
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::sample;
    use crate::domain::pair::Task;

    fn pools() -> TaskPools {
        let mut pools = TaskPools::with_levels(3);
        for level in 0..3 {
            for _ in 0..10 {
                pools.insert(Task::Pose, sample(Some(level), true, 1));
                pools.insert(Task::Match, sample(Some(level), true, 1));
            }
        }
        for _ in 0..30 {
            pools.insert(Task::Match, sample(None, false, 1));
        }
        pools
    }

    #[test]
    fn test_pose_batch_follows_curriculum() {
        let pools = pools();
        let curriculum = Curriculum { pose: vec![4, 2, 0], matching: vec![1, 1, 1] };
        let mut sampler = CurriculumSampler::new(&pools, curriculum, 7);

        let batch = sampler.pose_batch();
        assert_eq!(batch.len(), 6);
        assert_eq!(batch.iter().filter(|s| s.level == Some(0)).count(), 4);
        assert_eq!(batch.iter().filter(|s| s.level == Some(1)).count(), 2);
        assert_eq!(batch.iter().filter(|s| s.level == Some(2)).count(), 0);
    }

    #[test]
    fn test_match_batch_is_balanced() {
        let pools = pools();
        let curriculum = Curriculum { pose: vec![1, 1, 1], matching: vec![5, 3, 0] };
        let mut sampler = CurriculumSampler::new(&pools, curriculum, 7);

        let batch = sampler.match_batch();
        assert_eq!(batch.len(), 16);
        assert_eq!(batch.iter().filter(|s| s.matched).count(), 8);
        assert_eq!(batch.iter().filter(|s| !s.matched).count(), 8);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut pools = TaskPools::with_levels(1);
        for i in 0..20 {
            let mut s = sample(Some(0), true, 1);
            s.pose[0] = i as f32;
            pools.insert(Task::Pose, s);
        }
        let curriculum = Curriculum { pose: vec![5], matching: vec![0] };

        let a: Vec<f32> = CurriculumSampler::new(&pools, curriculum.clone(), 3)
            .pose_batch().iter().map(|s| s.pose[0]).collect();
        let b: Vec<f32> = CurriculumSampler::new(&pools, curriculum, 3)
            .pose_batch().iter().map(|s| s.pose[0]).collect();
        assert_eq!(a, b);

        let mut unique = a.clone();
        unique.sort_by(f32::total_cmp);
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }
}
