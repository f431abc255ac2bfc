// ============================================================
// Layer 5 — Task Losses
// ============================================================
// pose_loss  — robust regression on the squared L2 error e2:
//
//     f(e2) = log(relu(e2 - 1) + 1) - relu(1 - e2) + 1
//
//              ⎧ e2              e2 <= 1
//            = ⎨
//              ⎩ ln(e2) + 1      e2 >= 1
//
//   Small errors are penalised quadratically, large ones only
//   logarithmically, so outlier pairs cannot dominate a batch.
//
// match_loss — binary cross-entropy on logits, in the stable
//   form max(x, 0) - x*y + log(1 + exp(-|x|)).
//
// joint_loss — the training objective, pose + λ · match, where
//   λ (loss_lambda) trades the two heads off against each other.

use burn::{prelude::*, tensor::activation::relu};

/// How per-sample losses are folded into one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Mean,
    Sum,
}

fn reduce<B: Backend>(per_sample: Tensor<B, 1>, reduction: Reduction) -> Tensor<B, 1> {
    match reduction {
        Reduction::Mean => per_sample.mean(),
        Reduction::Sum  => per_sample.sum(),
    }
}

/// pred, labels: [batch, pose_dim]
pub fn pose_loss<B: Backend>(pred: Tensor<B, 2>, labels: Tensor<B, 2>, reduction: Reduction) -> Tensor<B, 1> {
    let diff = pred - labels;
    let e2: Tensor<B, 1> = (diff.clone() * diff).sum_dim(1).flatten(0, 1);

    let large = (relu(e2.clone().sub_scalar(1.0)).add_scalar(1.0)).log();
    let small = relu(e2.neg().add_scalar(1.0));
    reduce(large - small + 1.0, reduction)
}

/// logits, labels: [batch], labels in {0, 1}
pub fn match_loss<B: Backend>(logits: Tensor<B, 1>, labels: Tensor<B, 1>, reduction: Reduction) -> Tensor<B, 1> {
    let per_sample = relu(logits.clone())
        - logits.clone() * labels
        + logits.abs().neg().exp().log1p();
    reduce(per_sample, reduction)
}

/// pose + loss_lambda * match, both already reduced to scalars.
pub fn joint_loss<B: Backend>(pose: Tensor<B, 1>, matching: Tensor<B, 1>, loss_lambda: f64) -> Tensor<B, 1> {
    pose + matching.mul_scalar(loss_lambda)
}
