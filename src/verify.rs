// src/verify.rs
// ============================================================================
// VERIFY - Auditoría de un directorio exportado
// ============================================================================
//
// Comprueba, para cada entrada del manifest:
//   1. El fichero existe
//   2. Su tamaño es numel × element_bytes
//   3. El nombre solo usa [A-Za-z0-9_]
// Además: manifest en forma canónica y ficheros huérfanos (warning).
//
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{ExportError, Result};
use crate::manifest::{Manifest, MANIFEST_FILENAME};
use crate::variables::is_filename_char;

/// Resultado de la verificación
#[derive(Debug, Default)]
pub struct VerifyReport {
    pub valid: bool,
    pub checked: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Verifica `<dir>/manifest.json` contra los blobs del directorio
pub fn verify_output_dir(dir: &Path, element_bytes: usize) -> Result<VerifyReport> {
    let mut report = VerifyReport {
        valid: true,
        ..Default::default()
    };

    let manifest_path = dir.join(MANIFEST_FILENAME);
    let text = std::fs::read_to_string(&manifest_path).map_err(|e| ExportError::io(&manifest_path, e))?;
    let manifest: Manifest = serde_json::from_str(&text)?;

    if manifest.to_json()? != text {
        report
            .warnings
            .push("manifest.json is not canonical (sorted keys, 2-space indent)".to_string());
    }

    let mut referenced = BTreeSet::new();

    for (display, entry) in manifest.iter() {
        report.checked += 1;
        referenced.insert(entry.filename.clone());

        if entry.filename.is_empty() || !entry.filename.chars().all(is_filename_char) {
            report.valid = false;
            report
                .errors
                .push(format!("{}: invalid filename '{}'", display, entry.filename));
            continue;
        }

        let path = dir.join(&entry.filename);
        let len = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() as usize,
            Err(_) => {
                report.valid = false;
                report
                    .errors
                    .push(format!("{}: missing file '{}'", display, entry.filename));
                continue;
            }
        };

        let expected = match entry.numel().and_then(|n| n.checked_mul(element_bytes)) {
            Some(expected) => expected,
            None => {
                report.valid = false;
                report
                    .errors
                    .push(format!("{}: shape {:?} overflows", display, entry.shape));
                continue;
            }
        };
        if len != expected {
            report.valid = false;
            report.errors.push(format!(
                "{}: '{}' is {} bytes, expected {} (shape {:?} × {})",
                display, entry.filename, len, expected, entry.shape, element_bytes
            ));
        }
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ExportError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ExportError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name != MANIFEST_FILENAME && !referenced.contains(&name) {
            report
                .warnings
                .push(format!("unreferenced file '{}'", name));
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpoint;
    use crate::exporter::export_checkpoint;
    use crate::manifest::ManifestEntry;

    #[test]
    fn test_fresh_export_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = MemoryCheckpoint::new()
            .with_f32("conv1/weights_1", &[3, 3, 4], &[0.1; 36])
            .with_f32("conv1/biases_1", &[4], &[0.0; 4]);
        export_checkpoint(&ckpt, dir.path(), None).unwrap();

        let report = verify_output_dir(dir.path(), 4).unwrap();
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.checked, 2);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_wrong_width_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = MemoryCheckpoint::new().with_f32("fc/w_1", &[2, 2], &[1.0; 4]);
        export_checkpoint(&ckpt, dir.path(), None).unwrap();

        let report = verify_output_dir(dir.path(), 2).unwrap();
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_missing_and_orphan_files() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = MemoryCheckpoint::new().with_f32("fc/w_1", &[1], &[1.0]);
        export_checkpoint(&ckpt, dir.path(), None).unwrap();
        std::fs::remove_file(dir.path().join("fc_w")).unwrap();
        std::fs::write(dir.path().join("old_blob"), [0u8; 4]).unwrap();

        let report = verify_output_dir(dir.path(), 4).unwrap();
        assert!(!report.valid);
        assert!(report.errors[0].contains("missing file"));
        assert!(report.warnings.iter().any(|w| w.contains("old_blob")));
    }

    #[test]
    fn test_non_canonical_manifest_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x"), [0u8; 4]).unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILENAME),
            r#"{"x": {"filename": "x", "shape": [1]}}"#,
        )
        .unwrap();

        let report = verify_output_dir(dir.path(), 4).unwrap();
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_overflowing_shape_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("w_k"), [0u8; 4]).unwrap();
        let mut manifest = Manifest::new();
        manifest.insert(
            "w/k",
            ManifestEntry {
                filename: "w_k".to_string(),
                shape: vec![1 << 40, 1 << 40],
            },
        );
        manifest.write_to(dir.path()).unwrap();

        let report = verify_output_dir(dir.path(), 4).unwrap();
        assert!(!report.valid);
        assert!(report.errors[0].contains("overflows"), "{:?}", report.errors);
    }

    #[test]
    fn test_bad_filename_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILENAME),
            r#"{"x": {"filename": "../x", "shape": [1]}}"#,
        )
        .unwrap();

        let report = verify_output_dir(dir.path(), 4).unwrap();
        assert!(!report.valid);
        assert!(report.errors[0].contains("invalid filename"));
    }
}
