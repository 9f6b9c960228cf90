// src/lib.rs
// ============================================================================
// CKPT-DUMP - Volcado de variables de checkpoint a blobs raw + manifest JSON
// ============================================================================

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod exporter;
pub mod manifest;
pub mod merge;
pub mod variables;
pub mod verify;

// Re-exports principales
pub use checkpoint::{open_checkpoint, CheckpointReader, MemoryCheckpoint, SafetensorCheckpoint};
pub use config::{expand_user, ExportConfig};
pub use error::{ExportError, Result};
pub use exporter::{export_checkpoint, run_export, ExportOutcome, ExportStats, GLOBAL_STEP};
pub use manifest::{Manifest, ManifestEntry, MANIFEST_FILENAME};
pub use variables::{display_name, filter_latest_variants, var_name_to_filename, ShapeMap};
