// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
//   model.rs    — siamese patch trunk with pose and match heads
//   losses.rs   — robust pose loss, BCE-with-logits match loss
//   clipping.rs — global gradient-norm clipping
//   trainer.rs  — curriculum training loop and validation
//   normals.rs  — surface-normal accuracy report and masked
//                 2D cross-entropy

/// Joint pose / match network
pub mod model;

/// Task loss functions
pub mod losses;

/// Gradient clipping over the whole model
pub mod clipping;

/// Training loop with per-level validation and checkpointing
pub mod trainer;

/// Surface-normal evaluation utilities
pub mod normals;
