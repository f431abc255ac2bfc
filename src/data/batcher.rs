// ============================================================
// Layer 4 — Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<PairSample>
// into tensors on the target device.
//
//   Input:  N PairSamples, patches of 3 x S x S bytes
//   Output: PairBatch with
//             left, right : [N, 3, S, S]  floats in [0, 1]
//             pose        : [N, D]
//             matched     : [N]           0.0 / 1.0
//
// The same batch type feeds both heads; the pose head ignores
// `matched` and the match head ignores `pose`.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::PairSample;
use crate::data::patch::CHANNELS;

#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub left:    Tensor<B, 4>,
    pub right:   Tensor<B, 4>,
    pub pose:    Tensor<B, 2>,
    pub matched: Tensor<B, 1>,
}

impl<B: Backend> PairBatch<B> {
    pub fn len(&self) -> usize {
        self.matched.dims()[0]
    }
}

#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device:     B::Device,
    pub patch_size: usize,
    pub pose_dim:   usize,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device, patch_size: usize, pose_dim: usize) -> Self {
        Self { device, patch_size, pose_dim }
    }

    fn patches(&self, items: &[PairSample], pick: impl Fn(&PairSample) -> &[u8]) -> Tensor<B, 4> {
        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| pick(s).iter().map(|&v| v as f32 / 255.0))
            .collect();
        let shape = [items.len(), CHANNELS, self.patch_size, self.patch_size];
        Tensor::from_data(TensorData::new(flat, shape), &self.device)
    }
}

impl<B: Backend> Batcher<PairSample, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairSample>) -> PairBatch<B> {
        let n = items.len();

        let left  = self.patches(&items, |s| &s.left);
        let right = self.patches(&items, |s| &s.right);

        let pose_flat: Vec<f32> = items.iter().flat_map(|s| s.pose.iter().copied()).collect();
        let pose = Tensor::from_data(TensorData::new(pose_flat, [n, self.pose_dim]), &self.device);

        let labels: Vec<f32> = items
            .iter()
            .map(|s| if s.matched { 1.0 } else { 0.0 })
            .collect();
        let matched = Tensor::from_data(TensorData::new(labels, [n]), &self.device);

        PairBatch { left, right, pose, matched }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::sample;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_batch_shapes_and_scaling() {
        let batcher = PairBatcher::<B>::new(Default::default(), 2, 6);
        let items = vec![sample(Some(0), true, 2), sample(None, false, 2)];
        let batch = batcher.batch(items);

        assert_eq!(batch.left.dims(), [2, 3, 2, 2]);
        assert_eq!(batch.right.dims(), [2, 3, 2, 2]);
        assert_eq!(batch.pose.dims(), [2, 6]);
        assert_eq!(batch.len(), 2);

        let left_max: f32 = batch.left.max().into_scalar();
        let right_max: f32 = batch.right.max().into_scalar();
        assert_eq!(left_max, 1.0);
        assert_eq!(right_max, 0.0);

        let labels = batch.matched.into_data().to_vec::<f32>().unwrap();
        assert_eq!(labels, vec![1.0, 0.0]);
    }
}
