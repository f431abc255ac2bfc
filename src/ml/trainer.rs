// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One iteration:
//   1. draw a pose batch and a match batch by curriculum
//   2. joint forward pass through the shared trunk
//   3. loss = pose_loss + loss_lambda * match_loss
//   4. backward, clip the global gradient norm, SGD step
//
// Burn notes:
//   - training runs on B (Autodiff<Wgpu> or Autodiff<NdArray>)
//   - model.valid() drops autodiff, so validation batches are
//     built on B::InnerBackend
//   - gradients are clipped by ml::clipping before the step; the
//     optimiser's own clipping would act per parameter tensor
//
// Validation runs after the first iteration and every
// eval_interval iterations. Each curriculum level is its own
// dataset, so a batch never mixes levels and a level's loss is
// divided by that level's sample count.

use anyhow::Result;
use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{PairBatch, PairBatcher},
    dataset::{PairData, PairDataset, PairSample, TaskPools},
    sampler::CurriculumSampler,
};
use crate::domain::{curriculum::Curriculum, pair::Task};
use crate::infra::{
    checkpoint::{CheckpointManager, FINAL},
    metrics::{iteration_line, MetricsLogger, TaskLoss, ValidationMetrics},
};
use crate::ml::clipping::clip_global_norm;
use crate::ml::losses::{joint_loss, match_loss, pose_loss, Reduction};
use crate::ml::model::{JointInput, JointModel, JointModelConfig};

/// What a finished run reports back to the caller.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub final_loss:     f64,
    pub best_loss:      f64,
    pub best_iteration: Option<usize>,
}

// ─── Validation ───────────────────────────────────────────────────────────────

/// Validation pools wrapped as Burn datasets, built once per run.
pub struct ValidationSet {
    pose:      Vec<Arc<PairDataset>>,
    positives: Vec<Arc<PairDataset>>,
    negatives: Arc<PairDataset>,
}

impl ValidationSet {
    pub fn new(pools: &TaskPools) -> Self {
        let wrap = |samples: &[PairSample]| Arc::new(PairDataset::new(samples.to_vec()));
        Self {
            pose:      pools.pose.iter().map(|level| wrap(level)).collect(),
            positives: pools.positives.iter().map(|level| wrap(level)).collect(),
            negatives: wrap(&pools.negatives),
        }
    }
}

/// Summed loss and sample count over one dataset.
fn sum_loss<B: Backend>(
    model:   &JointModel<B>,
    loader:  Arc<dyn DataLoader<PairBatch<B>>>,
    task:    Task,
) -> (f64, usize) {
    let mut total = 0.0f64;
    let mut count = 0usize;

    for batch in loader.iter() {
        count += batch.len();
        let loss = match task {
            Task::Pose => pose_loss(
                model.forward_pose(batch.left, batch.right),
                batch.pose,
                Reduction::Sum,
            ),
            Task::Match => match_loss(
                model.forward_match(batch.left, batch.right),
                batch.matched,
                Reduction::Sum,
            ),
        };
        total += loss.into_scalar().elem::<f64>();
    }
    (total, count)
}

/// Full validation pass for one task.
///
/// Level losses are averaged over the level's own samples; for the
/// match task they cover positives only, and negatives contribute
/// to the mean loss alone.
pub fn evaluate<B: Backend>(
    model:      &JointModel<B>,
    set:        &ValidationSet,
    task:       Task,
    batcher:    &PairBatcher<B>,
    batch_size: usize,
) -> TaskLoss {
    let loader = |ds: &Arc<PairDataset>| {
        DataLoaderBuilder::new(batcher.clone())
            .batch_size(batch_size)
            .num_workers(1)
            .build(Arc::clone(ds))
    };

    let levels = match task {
        Task::Pose  => &set.pose,
        Task::Match => &set.positives,
    };

    let mut total = 0.0f64;
    let mut count = 0usize;
    let mut per_level = Vec::with_capacity(levels.len());
    for ds in levels {
        let (sum, n) = sum_loss(model, loader(ds), task);
        per_level.push(if n > 0 { sum / n as f64 } else { 0.0 });
        total += sum;
        count += n;
    }

    if task == Task::Match {
        let (sum, n) = sum_loss(model, loader(&set.negatives), task);
        total += sum;
        count += n;
    }

    TaskLoss {
        mean: if count > 0 { total / count as f64 } else { 0.0 },
        per_level,
    }
}

// ─── Training ─────────────────────────────────────────────────────────────────
pub fn run_training<B: AutodiffBackend>(
    cfg:        &TrainConfig,
    data:       &PairData,
    curriculum: Curriculum,
    ckpt:       &CheckpointManager,
    metrics:    &MetricsLogger,
    device:     B::Device,
) -> Result<TrainSummary> {
    B::seed(cfg.random_seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = JointModelConfig::new(data.pose_dim);
    ckpt.save_model_config(&model_cfg)?;
    let mut model: JointModel<B> = model_cfg.init(&device);
    tracing::info!("Model ready: {} parameters", model.num_params());

    // ── SGD with momentum ─────────────────────────────────────────────────────
    // v = μ*v + g
    // θ = θ - lr * v
    // Dampening is 0 so the velocity keeps the full gradient.
    let mut optim = SgdConfig::new()
        .with_momentum(Some(
            MomentumConfig::new().with_momentum(cfg.momentum).with_dampening(0.0),
        ))
        .init::<B, JointModel<B>>();

    let train_batcher = PairBatcher::<B>::new(device.clone(), data.patch_size, data.pose_dim);
    let valid_batcher = PairBatcher::<B::InnerBackend>::new(device.clone(), data.patch_size, data.pose_dim);
    let valid_set     = ValidationSet::new(&data.valid);
    let mut sampler   = CurriculumSampler::new(&data.train, curriculum, cfg.random_seed);

    let mut best_loss      = f64::INFINITY;
    let mut best_iteration = None;
    let mut last_loss      = f64::NAN;

    for iter_no in 0..cfg.iters {
        let pose     = train_batcher.batch(sampler.pose_batch());
        let matching = train_batcher.batch(sampler.match_batch());

        let out = model.forward(JointInput {
            pose_left:   pose.left,
            pose_right:  pose.right,
            match_left:  matching.left,
            match_right: matching.right,
        });

        let loss_pose  = pose_loss(out.pose, pose.pose, Reduction::Mean);
        let loss_match = match_loss(out.match_logits, matching.matched, Reduction::Mean);
        let loss_total = joint_loss(loss_pose, loss_match, cfg.loss_lambda);
        last_loss = loss_total.clone().into_scalar().elem::<f64>();

        let grads = loss_total.backward();
        let mut grads = GradientsParams::from_grads(grads, &model);
        if cfg.gradient_clip {
            grads = clip_global_norm::<B, _>(&model, grads, cfg.clip_norm);
        }
        model = optim.step(cfg.lr, model, grads);

        let iteration = iter_no + 1;
        if iteration % cfg.log_interval == 0 {
            println!("{}", iteration_line(iteration, last_loss));
        }

        if iter_no == 0 || iteration % cfg.eval_interval == 0 {
            // model.valid() → JointModel<B::InnerBackend>, no autodiff, dropout off
            let model_valid = model.valid();
            let pose     = evaluate(&model_valid, &valid_set, Task::Pose,  &valid_batcher, cfg.batch_size);
            let matching = evaluate(&model_valid, &valid_set, Task::Match, &valid_batcher, cfg.batch_size);

            println!("Pose loss: {:.4}", pose.mean);
            println!("{}", pose.level_line());
            println!("Match loss: {:.4}", matching.mean);
            println!("{}", matching.level_line());

            let m = ValidationMetrics { iteration, train_loss: last_loss, pose, matching };
            metrics.log(&m)?;

            if m.is_improvement(best_loss, cfg.loss_lambda) {
                best_loss = m.combined(cfg.loss_lambda);
                best_iteration = Some(iteration);
                ckpt.save_best(&model, iteration)?;
                tracing::info!("New best validation loss {:.4} at iteration {}", best_loss, iteration);
            }
        }
    }

    ckpt.save_model(&model, FINAL)?;
    tracing::info!("Training complete!");

    Ok(TrainSummary { final_loss: last_loss, best_loss, best_iteration })
}
