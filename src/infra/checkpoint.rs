// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves model weights with Burn's CompactRecorder (named
// MessagePack, half precision) and the run configuration as JSON.
// Weights are written once per improvement and once at the end,
// so a crashed run still leaves the best model behind.
//
// File layout:
//   checkpoints/
//     train_config.json     ← TrainConfig of the run
//     model_config.json     ← JointModelConfig, to rebuild the model
//     model_best.mpk        ← lowest combined validation loss
//     best_iteration.json   ← iteration model_best was taken at
//     model_final.mpk       ← weights after the last iteration
//     metrics.csv           ← written by MetricsLogger

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{JointModel, JointModelConfig};

pub const BEST: &str = "model_best";
pub const FINAL: &str = "model_final";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save model weights under `name` (the recorder adds the extension).
    pub fn save_model<B: Backend>(&self, model: &JointModel<B>, name: &str) -> Result<()> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(())
    }

    /// Save the best-so-far weights and remember the iteration.
    pub fn save_best<B: Backend>(&self, model: &JointModel<B>, iteration: usize) -> Result<()> {
        self.save_model(model, BEST)?;
        fs::write(self.dir.join("best_iteration.json"), serde_json::to_string(&iteration)?)
            .context("Failed to write best_iteration.json")?;
        Ok(())
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Architecture needed to rebuild the model before loading weights.
    pub fn save_model_config(&self, cfg: &JointModelConfig) -> Result<()> {
        let path = self.dir.join("model_config.json");
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    // Readers used to check what a run left on disk.
    impl CheckpointManager {
        /// Load weights saved under `name` into `model`.
        pub fn load_model<B: Backend>(
            &self,
            model:  JointModel<B>,
            name:   &str,
            device: &B::Device,
        ) -> Result<JointModel<B>> {
            let path = self.dir.join(name);
            let record = CompactRecorder::new()
                .load(path.clone(), device)
                .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
            Ok(model.load_record(record))
        }

        pub fn best_iteration(&self) -> Result<usize> {
            let s = fs::read_to_string(self.dir.join("best_iteration.json"))
                .context("Cannot find 'best_iteration.json'")?;
            Ok(serde_json::from_str(&s)?)
        }

        pub fn load_model_config(&self) -> Result<JointModelConfig> {
            let path = self.dir.join("model_config.json");
            JointModelConfig::load(&path)
                .map_err(|e| anyhow::anyhow!("Cannot read model config '{}': {e}", path.display()))
        }

        pub fn load_config(&self) -> Result<TrainConfig> {
            let path = self.dir.join("train_config.json");
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
            Ok(serde_json::from_str(&json)?)
        }
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("ckpt")).unwrap();

        let cfg = TrainConfig { iters: 42, loss_lambda: 0.5, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.iters, 42);
        assert_eq!(loaded.loss_lambda, 0.5);
    }

    #[test]
    fn test_best_model_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg = JointModelConfig::new(6).with_base_filters(2).with_embed_dim(4).with_head_hidden(4);

        ckpt.save_model_config(&cfg).unwrap();
        let cfg = ckpt.load_model_config().unwrap();
        assert_eq!(cfg.embed_dim, 4);

        let model: JointModel<B> = cfg.init(&device);
        ckpt.save_best(&model, 1000).unwrap();
        assert_eq!(ckpt.best_iteration().unwrap(), 1000);

        let input = Tensor::<B, 4>::ones([1, 3, 8, 8], &device);
        let expected = model.forward_pose(input.clone(), input.clone());

        let fresh: JointModel<B> = cfg.init(&device);
        let restored = ckpt.load_model(fresh, BEST, &device).unwrap();
        let actual = restored.forward_pose(input.clone(), input);

        // CompactRecorder stores weights in half precision.
        let diff: f32 = (expected - actual).abs().max().into_scalar();
        assert!(diff < 1e-2);
    }
}
