// ============================================================
// Layer 5 — Surface Normal Utilities
// ============================================================
// Surface normals are predicted as a per-pixel class (a bin on
// the sphere of directions), so evaluation is a classification
// problem under a validity mask:
//
//   unbinned accuracy — plain accuracy over valid pixels
//   binned accuracy   — every pixel weighted by 1 / |its class|,
//                       i.e. the macro-average of per-class
//                       accuracies over the classes present
//
// The binned number is the one to watch: normal bins are very
// unbalanced (floors and walls dominate indoor scenes), and the
// unbinned accuracy mostly measures those few large classes.
//
// masked_cross_entropy_2d is the matching training loss:
//
//   [N, C, H, W] logits → [N*H*W, C] → log_softmax over C
//   loss = Σ_valid −log p(target) / Σ mask
//
// It is exposed for model code that trains a normal head; the
// CLI only needs the report.

use anyhow::{bail, Result};
use burn::{prelude::*, tensor::activation::log_softmax};
use serde::Serialize;

// ─── Accuracy Report ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalReport {
    pub unbinned: f64,
    pub binned:   f64,
}

/// Accuracies for flattened N x H x W label grids.
///
/// Pixels with `mask > 0` are valid. True labels outside
/// `0..num_classes` count towards the unbinned accuracy but carry
/// zero weight in the binned one.
pub fn get_report(
    predicted:   &[i64],
    truth:       &[i64],
    mask:        &[f32],
    num_classes: usize,
) -> Result<NormalReport> {
    if predicted.len() != truth.len() || truth.len() != mask.len() {
        bail!(
            "shape mismatch: {} predicted, {} true, {} mask values",
            predicted.len(),
            truth.len(),
            mask.len()
        );
    }

    // (predicted, true) for every pixel under the mask
    let valid: Vec<(i64, i64)> = predicted
        .iter()
        .zip(truth)
        .zip(mask)
        .filter(|&(_, &m)| m > 0.0)
        .map(|((&p, &t), _)| (p, t))
        .collect();
    if valid.is_empty() {
        bail!("mask has no valid pixels");
    }

    let class_of = |t: i64| usize::try_from(t).ok().filter(|&c| c < num_classes);

    // |class c| among valid pixels
    let mut class_counts = vec![0usize; num_classes];
    for &(_, t) in &valid {
        if let Some(c) = class_of(t) {
            class_counts[c] += 1;
        }
    }

    let mut correct = 0usize;
    let mut weighted_correct = 0.0f64;
    let mut total_weight = 0.0f64;
    for &(p, t) in &valid {
        // Zero-count classes never reach this point: t's class has at least this pixel.
        let weight = class_of(t).map_or(0.0, |c| 1.0 / class_counts[c] as f64);
        total_weight += weight;
        if p == t {
            correct += 1;
            weighted_correct += weight;
        }
    }
    if total_weight == 0.0 {
        bail!("no valid pixel has a true class in 0..{num_classes}");
    }

    Ok(NormalReport {
        unbinned: correct as f64 / valid.len() as f64,
        binned:   weighted_correct / total_weight,
    })
}

// ─── Masked Cross-Entropy ─────────────────────────────────────────────────────

/// Per-pixel cross-entropy averaged over valid pixels.
///
/// logits: [N, C, H, W], targets: [N, H, W] class ids,
/// masks: [N, H, W] with 1 for valid pixels and 0 otherwise.
/// Returns NaN when the mask is empty.
#[allow(dead_code)]
pub fn masked_cross_entropy_2d<B: Backend>(
    logits:  Tensor<B, 4>,
    targets: Tensor<B, 3, Int>,
    masks:   Tensor<B, 3>,
) -> Tensor<B, 1> {
    let [n, c, h, w] = logits.dims();
    let pixels = n * h * w;

    // [N, C, H, W] → [N, H, W, C] → [N*H*W, C]
    let logits_flat = logits.swap_dims(1, 2).swap_dims(2, 3).reshape([pixels, c]);
    let log_probs_flat = log_softmax(logits_flat, 1);

    let targets_flat = targets.reshape([pixels, 1]);
    let masks_flat = masks.reshape([pixels, 1]);

    let losses_flat = log_probs_flat.gather(1, targets_flat).neg() * masks_flat.clone();
    losses_flat.sum() / masks_flat.sum()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::TensorData};

    type B = NdArray<f32>;

    #[test]
    fn test_perfect_two_by_two_grid() {
        let truth = [0, 1, 1, 0];
        let report = get_report(&truth, &truth, &[1.0; 4], 2).unwrap();
        assert_eq!(report, NormalReport { unbinned: 1.0, binned: 1.0 });
    }

    #[test]
    fn test_binned_is_macro_average() {
        // class 0: 3 of 4 correct, class 1: 0 of 1 correct
        let truth     = [0, 0, 0, 0, 1];
        let predicted = [0, 0, 0, 1, 0];
        let report = get_report(&predicted, &truth, &[1.0; 5], 2).unwrap();
        assert!((report.unbinned - 3.0 / 5.0).abs() < 1e-12);
        assert!((report.binned - (0.75 + 0.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_absent_class_does_not_divide_by_zero() {
        let truth     = [0, 0, 2, 2];
        let predicted = [0, 1, 2, 2];
        let report = get_report(&predicted, &truth, &[1.0; 4], 4).unwrap();
        assert!(report.binned.is_finite());
        assert!((report.binned - (0.5 + 1.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_masked_pixels_are_ignored() {
        let truth     = [0, 1, 1, 0];
        let predicted = [0, 0, 1, 1];
        let mask      = [1.0, 0.0, 1.0, 0.0];
        let report = get_report(&predicted, &truth, &mask, 2).unwrap();
        assert_eq!(report, NormalReport { unbinned: 1.0, binned: 1.0 });
    }

    #[test]
    fn test_out_of_range_truth_has_no_binned_weight() {
        let truth     = [0, 0, 5];
        let predicted = [0, 1, 5];
        let report = get_report(&predicted, &truth, &[1.0; 3], 2).unwrap();
        assert!((report.unbinned - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.binned - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_report_errors() {
        assert!(get_report(&[0], &[0, 1], &[1.0, 1.0], 2).is_err());
        assert!(get_report(&[0, 1], &[0, 1], &[0.0, 0.0], 2).is_err());
        assert!(get_report(&[3], &[3], &[1.0], 2).is_err());
    }

    #[test]
    fn test_masked_cross_entropy_uniform_logits() {
        let device = Default::default();
        // 1 x 3 x 1 x 2, all-zero logits → every pixel costs ln 3
        let logits = Tensor::<B, 4>::zeros([1, 3, 1, 2], &device);
        let targets = Tensor::<B, 3, Int>::from_data(TensorData::new(vec![0i64, 2], [1, 1, 2]), &device);
        let masks = Tensor::<B, 3>::from_data(TensorData::new(vec![1.0f32, 1.0], [1, 1, 2]), &device);

        let loss: f32 = masked_cross_entropy_2d(logits, targets, masks).into_scalar();
        assert!((loss - 3.0f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_masked_cross_entropy_ignores_masked_pixels() {
        let device = Default::default();
        // Two pixels, two classes. Channel-major layout: [c0p0, c0p1, c1p0, c1p1].
        // Pixel 0 logits (0, ln 3) → p(class 1) = 3/4. Pixel 1 is masked out.
        let logits = Tensor::<B, 4>::from_data(
            TensorData::new(vec![0.0f32, 100.0, 3.0f32.ln(), -100.0], [1, 2, 1, 2]),
            &device,
        );
        let targets = Tensor::<B, 3, Int>::from_data(TensorData::new(vec![1i64, 1], [1, 1, 2]), &device);
        let masks = Tensor::<B, 3>::from_data(TensorData::new(vec![1.0f32, 0.0], [1, 1, 2]), &device);

        let loss: f32 = masked_cross_entropy_2d(logits, targets, masks).into_scalar();
        assert!((loss - -(0.75f32.ln())).abs() < 1e-5);
    }
}
