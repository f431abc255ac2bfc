// ============================================================
// Layer 4 — Manifest Loader
// ============================================================
// Reads the dataset manifest, a JSON file of the form
//
//   {
//     "levels": 5,
//     "pose_dim": 6,
//     "pairs": [
//       { "task": "pose",  "split": "train", "level": 0,
//         "left": "img/0001_a.png", "right": "img/0001_b.png",
//         "pose": [0.1, 0.0, 0.3, 0.02, 0.0, 0.1] },
//       { "task": "match", "split": "valid", "level": 2,
//         "left": "img/0042_a.png", "right": "img/0042_b.png",
//         "matched": true }
//     ]
//   }
//
// Image paths are resolved against an image root which defaults
// to the directory containing the manifest.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::pair::{Manifest, Split, Task};
use crate::domain::traits::PairSource;

pub struct ManifestLoader {
    path: PathBuf,
}

impl ManifestLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The directory image paths are relative to when no root is given.
    pub fn default_image_root(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

impl PairSource for ManifestLoader {
    fn load(&self) -> Result<Manifest> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read manifest '{}'", self.path.display()))?;

        let manifest: Manifest = serde_json::from_str(&json)
            .with_context(|| format!("Malformed manifest '{}'", self.path.display()))?;

        manifest
            .validate()
            .with_context(|| format!("Invalid manifest '{}'", self.path.display()))?;

        tracing::info!(
            "Manifest: {} levels, pose_dim={}, pose {}/{} and match {}/{} (train/valid)",
            manifest.levels,
            manifest.pose_dim,
            manifest.count(Task::Pose, Split::Train),
            manifest.count(Task::Pose, Split::Valid),
            manifest.count(Task::Match, Split::Train),
            manifest.count(Task::Match, Split::Valid),
        );
        Ok(manifest)
    }
}
