// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns that no business layer owns:
//
//   artifacts.rs  - the workspace directory: file names, JSON
//                   documents, processed outputs and the run lock
//                   that keeps two runs from writing at once
//
//   checkpoint.rs - final model weights via Burn's NamedMpkFileRecorder,
//                   plus the config of the run that produced them
//
//   metrics.rs    - per-epoch training history CSV
//
//   progress.rs   - the tokio channel that carries training events
//                   to whoever is listening

/// Workspace layout, JSON documents and the run lock
pub mod artifacts;

/// Model weight saving and loading
pub mod checkpoint;

/// Training history CSV logger
pub mod metrics;

/// Progress event channel
pub mod progress;
