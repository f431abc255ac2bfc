// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a JSON manifest to tensor batches:
//
//   manifest.json
//       │
//       ▼
//   ManifestLoader    → parses and validates the pair records
//       │
//       ▼
//   load_patch        → decodes each image into a CHW u8 patch
//       │
//       ▼
//   PairData          → train/valid TaskPools, bucketed by level
//       │
//       ├──► CurriculumSampler → per-level training batches
//       │
//       └──► PairDataset       → Burn Dataset for validation passes
//                  │
//                  ▼
//            PairBatcher       → stacks samples into tensors

/// Reads the pair manifest from disk
pub mod loader;

/// Image decoding and resizing
pub mod patch;

/// Decoded samples, level pools and Burn's Dataset trait
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Curriculum-driven training batch sampling
pub mod sampler;
