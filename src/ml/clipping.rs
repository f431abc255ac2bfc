// ============================================================
// Layer 5 — Global Gradient Clipping
// ============================================================
// Burn's GradientClippingConfig::Norm clips every parameter
// tensor on its own, so with k tensors the update can still have
// a norm of up to √k · max_norm. Here the norm is taken over all
// gradients of the model together:
//
//   total = √( Σ_p ‖g_p‖² )
//   g_p  ← g_p · max_norm / (total + 1e-6)      if total > max_norm
//
// Parameters are walked with a ModuleVisitor. Gradients live on
// the inner (non-autodiff) backend, keyed by ParamId.

use burn::{
    module::{ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

const EPS: f64 = 1e-6;

/// Accumulates Σ ‖g‖² on the device, one parameter at a time.
struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    total: Option<Tensor<B::InnerBackend, 1>>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            let squared = grad.powf_scalar(2.0).sum();
            self.total = Some(match self.total.take() {
                Some(total) => total + squared,
                None => squared,
            });
        }
    }
}

struct Rescale<'a> {
    grads:  &'a mut GradientsParams,
    factor: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register(id, grad.mul_scalar(self.factor));
        }
    }
}

/// L2 norm of all of `module`'s gradients taken as one vector.
pub fn global_norm<B, M>(module: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let mut visitor = SquaredNorm::<B> { grads, total: None };
    module.visit(&mut visitor);
    visitor
        .total
        .map_or(0.0, |total| total.into_scalar().elem::<f64>().sqrt())
}

/// Rescale every gradient so the global norm is at most `max_norm`.
pub fn clip_global_norm<B, M>(module: &M, mut grads: GradientsParams, max_norm: f64) -> GradientsParams
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let norm = global_norm::<B, M>(module, &grads);
    if norm > max_norm {
        tracing::trace!("Clipping gradient norm {:.4} to {:.4}", norm, max_norm);
        let mut visitor = Rescale { grads: &mut grads, factor: max_norm / (norm + EPS) };
        module.visit(&mut visitor);
    }
    grads
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        nn::{Linear, LinearConfig},
    };

    type B = NdArray<f32>;
    type AD = Autodiff<NdArray<f32>>;

    /// Gradients of `scale * sum(linear(ones))` for a 4 → 3 layer.
    ///
    /// With a batch of 2 every weight and bias gradient entry is 2 * scale.
    fn linear_grads(scale: f64) -> (Linear<AD>, GradientsParams) {
        let device = Default::default();
        let model: Linear<AD> = LinearConfig::new(4, 3).init(&device);
        let x = Tensor::<AD, 2>::ones([2, 4], &device);
        let loss = model.forward(x).sum().mul_scalar(scale);
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        (model, grads)
    }

    fn tensor_norm<const D: usize>(t: Tensor<B, D>) -> f64 {
        t.powf_scalar(2.0).sum().into_scalar().elem::<f64>().sqrt()
    }

    #[test]
    fn test_global_norm_covers_all_parameters() {
        let (model, grads) = linear_grads(0.5);
        // 15 entries (12 weight + 3 bias), each equal to 1.0
        assert!((global_norm(&model, &grads) - 15f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_clips_combined_norm_when_each_tensor_is_below_the_limit() {
        // weight: 2 * 0.14 * √12 ≈ 0.970, bias: 2 * 0.14 * √3 ≈ 0.485, total ≈ 1.084
        let (model, grads) = linear_grads(0.14);
        let weight = grads.get::<B, 2>(model.weight.id).unwrap();
        let bias = grads.get::<B, 1>(model.bias.as_ref().unwrap().id).unwrap();
        assert!(tensor_norm(weight) < 1.0);
        assert!(tensor_norm(bias) < 1.0);
        assert!(global_norm(&model, &grads) > 1.0);

        let clipped = clip_global_norm(&model, grads, 1.0);
        let norm = global_norm(&model, &clipped);
        assert!(norm <= 1.0, "norm after clipping: {norm}");
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_large_gradients_keep_their_direction() {
        let (model, grads) = linear_grads(100.0);
        let clipped = clip_global_norm(&model, grads, 1.0);
        assert!((global_norm(&model, &clipped) - 1.0).abs() < 1e-4);

        // every entry was 200, so after clipping all entries are 1/√15
        let weight: Vec<f32> = clipped.get::<B, 2>(model.weight.id).unwrap().into_data().to_vec().unwrap();
        for w in weight {
            assert!((w as f64 - 1.0 / 15f64.sqrt()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_small_gradients_are_untouched() {
        let (model, grads) = linear_grads(0.05);
        let before = global_norm(&model, &grads);
        let clipped = clip_global_norm(&model, grads, 1.0);
        assert_eq!(global_norm(&model, &clipped), before);
    }
}
