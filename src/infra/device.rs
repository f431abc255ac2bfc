// ============================================================
// Layer 6 — Device Selection
// ============================================================
// Burn's WGPU backend panics when asked for an adapter the
// machine does not have, so availability is probed by running
// a tiny tensor op under catch_unwind with the panic hook muted.

use anyhow::{bail, Result};
use burn::{
    backend::wgpu::{Wgpu, WgpuDevice},
    prelude::*,
};
use std::panic::{self, AssertUnwindSafe};

fn probe(device: &WgpuDevice) -> bool {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let ok = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = Tensor::<Wgpu, 1>::zeros([1], device).into_data();
    }))
    .is_ok();
    panic::set_hook(previous);
    ok
}

/// First hardware GPU that can run a kernel.
pub fn find_gpu() -> Option<WgpuDevice> {
    [WgpuDevice::DiscreteGpu(0), WgpuDevice::IntegratedGpu(0)]
        .into_iter()
        .find(probe)
}

/// The GPU to train on, or the fatal error for a `--cuda` run without one.
pub fn require_gpu() -> Result<WgpuDevice> {
    match find_gpu() {
        Some(device) => {
            tracing::info!("Using GPU device: {:?}", device);
            Ok(device)
        }
        None => bail!("No GPU found, please run without --cuda"),
    }
}
