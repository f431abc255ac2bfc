// ============================================================
// Layer 2 — ReportUseCase
// ============================================================
// Reads predicted labels, true labels and a validity mask, each
// a JSON array of shape N x H x W, and computes the binned and
// unbinned surface-normal accuracies.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::fs;

use crate::ml::normals::{get_report, NormalReport};

type Grid<T> = Vec<Vec<Vec<T>>>;

pub struct ReportUseCase {
    predicted:   String,
    truth:       String,
    mask:        String,
    num_classes: usize,
}

impl ReportUseCase {
    pub fn new(predicted: String, truth: String, mask: String, num_classes: usize) -> Self {
        Self { predicted, truth, mask, num_classes }
    }

    pub fn execute(&self) -> Result<NormalReport> {
        let (pred_shape, predicted) = read_grid::<i64>(&self.predicted)?;
        let (truth_shape, truth)    = read_grid::<i64>(&self.truth)?;
        let (mask_shape, mask)      = read_grid::<f32>(&self.mask)?;

        if pred_shape != truth_shape || truth_shape != mask_shape {
            bail!(
                "shape mismatch: predicted {:?}, truth {:?}, mask {:?}",
                pred_shape,
                truth_shape,
                mask_shape
            );
        }
        tracing::info!("Scoring {:?} label grid over {} classes", truth_shape, self.num_classes);

        get_report(&predicted, &truth, &mask, self.num_classes)
    }
}

/// Read an N x H x W JSON array and return its shape and flattened values.
fn read_grid<T: DeserializeOwned>(path: &str) -> Result<([usize; 3], Vec<T>)> {
    let json = fs::read_to_string(path).with_context(|| format!("Cannot read '{path}'"))?;
    let grid: Grid<T> =
        serde_json::from_str(&json).with_context(|| format!("'{path}' is not an N x H x W array"))?;

    let n = grid.len();
    let h = grid.first().map_or(0, Vec::len);
    let w = grid.first().and_then(|rows| rows.first()).map_or(0, Vec::len);
    if grid.iter().any(|rows| rows.len() != h || rows.iter().any(|row| row.len() != w)) {
        bail!("'{path}' is a ragged array");
    }

    Ok(([n, h, w], grid.into_iter().flatten().flatten().collect()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, json: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, json).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_perfect_prediction_report() {
        let dir = tempfile::tempdir().unwrap();
        let labels = write(&dir, "labels.json", "[[[0, 1], [1, 0]]]");
        let mask = write(&dir, "mask.json", "[[[1, 1], [1, 1]]]");

        let report = ReportUseCase::new(labels.clone(), labels, mask, 2).execute().unwrap();
        assert_eq!(report, NormalReport { unbinned: 1.0, binned: 1.0 });
    }

    #[test]
    fn test_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let pred = write(&dir, "pred.json", "[[[0, 1], [1, 0]]]");
        let truth = write(&dir, "truth.json", "[[[0, 1, 1, 0]]]");
        let mask = write(&dir, "mask.json", "[[[1, 1], [1, 1]]]");
        assert!(ReportUseCase::new(pred, truth, mask, 2).execute().is_err());
    }

    #[test]
    fn test_ragged_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ragged.json", "[[[0, 1], [1]]]");
        assert!(read_grid::<i64>(&path).is_err());
    }
}
