use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use std::path::Path;

use crate::data::patch::load_patch;
use crate::domain::curriculum::Curriculum;
use crate::domain::pair::{Manifest, PairRecord, Split, Task};

/// One decoded image pair.
/// Patches are CHW u8 buffers of length 3 * patch_size * patch_size.
#[derive(Debug, Clone)]
pub struct PairSample {
    pub left:    Vec<u8>,
    pub right:   Vec<u8>,
    /// Relative pose; zeros for match pairs
    pub pose:    Vec<f32>,
    pub matched: bool,
    pub level:   Option<usize>,
}

impl PairSample {
    fn from_record(rec: &PairRecord, root: &Path, patch_size: usize, pose_dim: usize) -> Result<Self> {
        let pose = match rec.task {
            Task::Pose  => rec.pose.clone(),
            Task::Match => vec![0.0; pose_dim],
        };
        Ok(Self {
            left:    load_patch(&root.join(&rec.left), patch_size)?,
            right:   load_patch(&root.join(&rec.right), patch_size)?,
            pose,
            matched: rec.task == Task::Pose || rec.matched,
            level:   rec.curriculum_level(),
        })
    }
}

pub struct PairDataset {
    samples: Vec<PairSample>,
}

impl PairDataset {
    pub fn new(samples: Vec<PairSample>) -> Self { Self { samples } }
}

impl Dataset<PairSample> for PairDataset {
    fn get(&self, index: usize) -> Option<PairSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// All samples of one split, bucketed for the two tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskPools {
    /// Pose pairs per level
    pub pose:      Vec<Vec<PairSample>>,
    /// Positive match pairs per level
    pub positives: Vec<Vec<PairSample>>,
    /// Negative match pairs (no level)
    pub negatives: Vec<PairSample>,
}

impl TaskPools {
    pub fn with_levels(levels: usize) -> Self {
        Self {
            pose:      vec![Vec::new(); levels],
            positives: vec![Vec::new(); levels],
            negatives: Vec::new(),
        }
    }

    pub fn insert(&mut self, task: Task, sample: PairSample) {
        match (task, sample.level) {
            (Task::Pose, Some(l))                   => self.pose[l].push(sample),
            (Task::Match, Some(l)) if sample.matched => self.positives[l].push(sample),
            _                                       => self.negatives.push(sample),
        }
    }

    pub fn levels(&self) -> usize {
        self.pose.len()
    }

    pub fn pose_count(&self) -> usize {
        self.pose.iter().map(Vec::len).sum()
    }

    pub fn positive_count(&self) -> usize {
        self.positives.iter().map(Vec::len).sum()
    }

    /// Make sure every batch the curriculum asks for can be drawn
    /// without replacement.
    pub fn check_curriculum(&self, curriculum: &Curriculum) -> Result<()> {
        if curriculum.levels() != self.levels() {
            bail!(
                "curriculum has {} levels, dataset has {}",
                curriculum.levels(),
                self.levels()
            );
        }
        for (level, (&want, pool)) in curriculum.pose.iter().zip(&self.pose).enumerate() {
            if want > pool.len() {
                bail!("pose level {level}: curriculum wants {want} pairs, only {} available", pool.len());
            }
        }
        for (level, (&want, pool)) in curriculum.matching.iter().zip(&self.positives).enumerate() {
            if want > pool.len() {
                bail!("match level {level}: curriculum wants {want} positives, only {} available", pool.len());
            }
        }
        let negatives: usize = curriculum.matching.iter().sum();
        if negatives > self.negatives.len() {
            bail!(
                "curriculum wants {negatives} negatives per batch, only {} available",
                self.negatives.len()
            );
        }
        Ok(())
    }
}

/// Decoded train and validation pools for a manifest.
pub struct PairData {
    pub train:      TaskPools,
    pub valid:      TaskPools,
    pub levels:     usize,
    pub pose_dim:   usize,
    pub patch_size: usize,
}

impl PairData {
    /// Decode every image listed in the manifest.
    pub fn from_manifest(manifest: &Manifest, image_root: &Path, patch_size: usize) -> Result<Self> {
        let mut train = TaskPools::with_levels(manifest.levels);
        let mut valid = TaskPools::with_levels(manifest.levels);

        tracing::info!("Decoding {} image pairs at {}px", manifest.pairs.len(), patch_size);
        for (i, rec) in manifest.pairs.iter().enumerate() {
            let sample = PairSample::from_record(rec, image_root, patch_size, manifest.pose_dim)?;
            match rec.split {
                Split::Train => train.insert(rec.task, sample),
                Split::Valid => valid.insert(rec.task, sample),
            }
            if (i + 1) % 10_000 == 0 {
                tracing::debug!("Decoded {} pairs", i + 1);
            }
        }

        Ok(Self {
            train,
            valid,
            levels:     manifest.levels,
            pose_dim:   manifest.pose_dim,
            patch_size,
        })
    }
}
