// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run:
//
//   Step 1: Validate the configuration
//   Step 2: Load the manifest                 (Layer 4 - data)
//   Step 3: Build the curriculum              (Layer 3 - domain)
//   Step 4: Decode image pairs into pools     (Layer 4 - data)
//   Step 5: Check the pools can feed batches  (Layer 4 - data)
//   Step 6: Save config, open metrics log     (Layer 6 - infra)
//   Step 7: Pick a device and train           (Layer 5/6)

use anyhow::{bail, Result};
use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray, Wgpu};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{dataset::PairData, loader::ManifestLoader};
use crate::domain::curriculum::{Curriculum, CurriculumKind};
use crate::domain::traits::PairSource;
use crate::infra::{checkpoint::CheckpointManager, device, metrics::MetricsLogger};
use crate::ml::trainer::{run_training, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// Serialisable so each run leaves its settings next to its checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub json_path:      String,
    pub image_root:     Option<String>,
    pub checkpoint_dir: String,
    pub lr:             f64,
    pub batch_size:     usize,
    pub gradient_clip:  bool,
    pub clip_norm:      f64,
    pub iters:          usize,
    pub momentum:       f64,
    pub random_seed:    u64,
    pub cuda:           bool,
    pub loss_lambda:    f64,
    pub patch_size:     usize,
    pub curriculum:     CurriculumKind,
    pub log_interval:   usize,
    pub eval_interval:  usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            json_path:      "dataset/train/regTrain/prepro.json".to_string(),
            image_root:     None,
            checkpoint_dir: "checkpoints".to_string(),
            lr:             1e-3,
            batch_size:     250,
            gradient_clip:  true,
            clip_norm:      1.0,
            iters:          200_000,
            momentum:       0.9,
            random_seed:    123,
            cuda:           true,
            loss_lambda:    1.0,
            patch_size:     64,
            curriculum:     CurriculumKind::Fixed,
            log_interval:   100,
            eval_interval:  1000,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("--batch-size must be positive");
        }
        if self.log_interval == 0 || self.eval_interval == 0 {
            bail!("--log-interval and --eval-interval must be positive");
        }
        // three 2x2 poolings in the patch trunk
        if self.patch_size < 8 {
            bail!("--patch-size must be at least 8, got {}", self.patch_size);
        }
        if self.gradient_clip && self.clip_norm <= 0.0 {
            bail!("--clip-norm must be positive when clipping is enabled");
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // Fail on a missing GPU before spending time decoding images.
        let gpu = if cfg.cuda { Some(device::require_gpu()?) } else { None };

        // ── Manifest and curriculum ───────────────────────────────────────────
        tracing::info!("Creating the data loader");
        let loader = ManifestLoader::new(&cfg.json_path);
        let manifest = loader.load()?;
        let curriculum = Curriculum::build(cfg.curriculum, cfg.batch_size, manifest.levels)?;
        tracing::info!(
            "Curriculum: pose {:?}, match positives {:?}",
            curriculum.pose,
            curriculum.matching
        );

        // ── Decode images ─────────────────────────────────────────────────────
        let image_root = cfg
            .image_root
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| loader.default_image_root());
        let data = PairData::from_manifest(&manifest, &image_root, cfg.patch_size)?;
        data.train.check_curriculum(&curriculum)?;
        tracing::info!(
            "Train pools: {} pose, {} positive / {} negative match pairs",
            data.train.pose_count(),
            data.train.positive_count(),
            data.train.negatives.len()
        );
        tracing::info!(
            "Valid pools: {} pose, {} positive / {} negative match pairs",
            data.valid.pose_count(),
            data.valid.positive_count(),
            data.valid.negatives.len()
        );

        // ── Infrastructure ────────────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir, data.levels)?;

        // ── Train ─────────────────────────────────────────────────────────────
        tracing::info!("Creating the joint model");
        match gpu {
            Some(device) => run_training::<Autodiff<Wgpu>>(cfg, &data, curriculum, &ckpt, &metrics, device),
            None => {
                tracing::info!("Using CPU (ndarray) backend");
                run_training::<Autodiff<NdArray>>(cfg, &data, curriculum, &ckpt, &metrics, NdArrayDevice::Cpu)
            }
        }
    }
}
