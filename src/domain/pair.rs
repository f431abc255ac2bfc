// ============================================================
// Layer 3 — Pair Domain Types
// ============================================================
// A training example is a pair of image patches taken from two
// views of a scene. Depending on the task it carries:
//   - pose:  the relative camera transformation between views
//   - match: whether the two patches show the same 3D point
//
// Pose samples and positive match samples belong to a curriculum
// level (0 = easiest). Negative match samples have no level.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Which head of the joint model a pair is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Pose,
    Match,
}

/// Which partition of the dataset a pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Valid,
}

/// One entry of the dataset manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRecord {
    pub task:  Task,
    pub split: Split,

    /// Curriculum level; required for pose pairs and positive match pairs
    #[serde(default)]
    pub level: Option<usize>,

    /// Image paths, relative to the image root
    pub left:  String,
    pub right: String,

    /// Relative pose label (pose task only)
    #[serde(default)]
    pub pose: Vec<f32>,

    /// Correspondence label (match task only)
    #[serde(default)]
    pub matched: bool,
}

impl PairRecord {
    /// Level used for curriculum bucketing, `None` for negative match pairs.
    pub fn curriculum_level(&self) -> Option<usize> {
        match self.task {
            Task::Match if !self.matched => None,
            _ => self.level,
        }
    }
}

fn default_levels() -> usize { 5 }
fn default_pose_dim() -> usize { 6 }

/// The full dataset description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Number of curriculum levels
    #[serde(default = "default_levels")]
    pub levels: usize,

    /// Length of every pose label
    #[serde(default = "default_pose_dim")]
    pub pose_dim: usize,

    pub pairs: Vec<PairRecord>,
}

impl Manifest {
    /// Check every record against the manifest header.
    pub fn validate(&self) -> Result<()> {
        if self.levels == 0 {
            bail!("manifest declares zero curriculum levels");
        }
        if self.pose_dim == 0 {
            bail!("manifest declares a zero-length pose");
        }

        for (i, rec) in self.pairs.iter().enumerate() {
            let needs_level = rec.task == Task::Pose || rec.matched;
            match rec.level {
                None if needs_level => {
                    bail!("pair {i} ({} / {}) has no curriculum level", rec.left, rec.right)
                }
                Some(l) if needs_level && l >= self.levels => {
                    bail!("pair {i} has level {l}, manifest declares {} levels", self.levels)
                }
                _ => {}
            }
            if rec.task == Task::Pose && rec.pose.len() != self.pose_dim {
                bail!(
                    "pair {i} has a pose of length {}, expected {}",
                    rec.pose.len(),
                    self.pose_dim
                );
            }
        }
        Ok(())
    }

    /// Count records for a task and split.
    pub fn count(&self, task: Task, split: Split) -> usize {
        self.pairs
            .iter()
            .filter(|p| p.task == task && p.split == split)
            .count()
    }
}
