// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no ML math, no printing, no
// direct file formats. Each use case wires the data, ml and
// infra layers together for one command.

// The training workflow
pub mod train_use_case;

// Surface-normal accuracy reporting
pub mod report_use_case;
