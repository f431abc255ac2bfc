// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits so that
// the on-disk format can change without touching the workflow.

use anyhow::Result;
use crate::domain::pair::Manifest;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can produce a validated pair manifest.
///
/// Implementations:
///   - ManifestLoader → reads a JSON manifest from disk
pub trait PairSource {
    /// Load and validate the manifest.
    fn load(&self) -> Result<Manifest>;
}
