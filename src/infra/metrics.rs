// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per validation pass:
//
//   iteration,train_loss,pose_loss,match_loss,pose_lvl0,...,match_lvl0,...
//   1,2.104417,1.998120,0.693014,1.20,...
//   1000,0.884210,0.861002,0.412230,0.55,...
//
// The per-level columns depend on the number of curriculum
// levels, so the header is written when the file is created and
// checked when an existing file is reopened.

use anyhow::{bail, Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// Training progress line printed every log_interval iterations:
/// `===> Iteration:   100,          Loss:  0.5000`
pub fn iteration_line(iteration: usize, loss: f64) -> String {
    format!("===> Iteration: {:5},          Loss:{:8.4}", iteration, loss)
}

// ─── TaskLoss ─────────────────────────────────────────────────────────────────

/// Validation loss for one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskLoss {
    /// Loss summed over all validation samples / number of samples
    pub mean: f64,
    /// Loss over a level's samples / number of samples in the level
    pub per_level: Vec<f64>,
}

impl TaskLoss {
    /// `Lvl 0: 0.1234   Lvl 1: 0.5678   ...`
    pub fn level_line(&self) -> String {
        self.per_level
            .iter()
            .enumerate()
            .map(|(i, v)| format!("Lvl {i}: {v:.4}"))
            .collect::<Vec<_>>()
            .join("   ")
    }
}

/// One validation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// 1-based iteration the pass ran after
    pub iteration:  usize,
    pub train_loss: f64,
    pub pose:       TaskLoss,
    pub matching:   TaskLoss,
}

impl ValidationMetrics {
    /// pose + lambda * match, the quantity model selection uses
    pub fn combined(&self, loss_lambda: f64) -> f64 {
        self.pose.mean + loss_lambda * self.matching.mean
    }

    pub fn is_improvement(&self, best: f64, loss_lambda: f64) -> bool {
        self.combined(loss_lambda) < best
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
pub struct MetricsLogger {
    csv_path: PathBuf,
    levels:   usize,
}

fn header(levels: usize) -> String {
    let mut columns = vec![
        "iteration".to_string(),
        "train_loss".to_string(),
        "pose_loss".to_string(),
        "match_loss".to_string(),
    ];
    columns.extend((0..levels).map(|i| format!("pose_lvl{i}")));
    columns.extend((0..levels).map(|i| format!("match_lvl{i}")));
    columns.join(",")
}

impl MetricsLogger {
    /// Open (or create) `dir/metrics.csv` for a run with `levels` levels.
    ///
    /// An existing file is appended to only if its header has the same
    /// columns; a file from a run with another level count is an error.
    pub fn new(dir: impl Into<PathBuf>, levels: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let csv_path = dir.join("metrics.csv");
        let expected = header(levels);

        if csv_path.exists() {
            let existing = fs::read_to_string(&csv_path)
                .with_context(|| format!("Cannot read '{}'", csv_path.display()))?;
            let found = existing.lines().next().unwrap_or_default();
            if found != expected {
                bail!(
                    "'{}' has header '{}', this run writes '{}'; use another checkpoint dir",
                    csv_path.display(),
                    found,
                    expected
                );
            }
            tracing::debug!("Appending to metrics CSV: '{}'", csv_path.display());
        } else {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{expected}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path, levels })
    }

    pub fn log(&self, m: &ValidationMetrics) -> Result<()> {
        let mut row = vec![
            m.iteration.to_string(),
            format!("{:.6}", m.train_loss),
            format!("{:.6}", m.pose.mean),
            format!("{:.6}", m.matching.mean),
        ];
        let cell = |levels: &[f64], i: usize| format!("{:.6}", levels.get(i).copied().unwrap_or(0.0));
        row.extend((0..self.levels).map(|i| cell(&m.pose.per_level, i)));
        row.extend((0..self.levels).map(|i| cell(&m.matching.per_level, i)));

        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{}", row.join(","))?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
