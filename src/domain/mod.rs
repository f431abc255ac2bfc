// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the problem:
// image pairs, tasks, splits and the curriculum.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// An image pair as listed in the dataset manifest
pub mod pair;

// Per-level batch composition
pub mod curriculum;

// Core abstractions (traits) that other layers implement
pub mod traits;
