// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the application and ML layers:
//
//   checkpoint.rs — model weights via Burn's CompactRecorder,
//                   plus the run's TrainConfig as JSON
//
//   metrics.rs    — validation losses per task and level,
//                   appended to metrics.csv
//
//   device.rs     — GPU discovery for --cuda runs

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Validation metrics CSV logger
pub mod metrics;

/// GPU availability check
pub mod device;
