// src/exporter.rs
// ============================================================================
// EXPORTER - Orquestador del volcado checkpoint → blobs + manifest
// ============================================================================
//
// El exporter es TONTO:
// - NO decide qué variantes quedan (lo hace el filtro)
// - NO interpreta los tensores (copia bytes raw)
// - Solo filtra, excluye, escribe y apunta en el manifest
//
// Cualquier error de I/O aborta sin limpiar. El manifest se escribe al final,
// así que una ejecución abortada deja blobs sueltos pero ningún manifest nuevo.
//
// ============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::Regex;

use crate::checkpoint::{open_checkpoint, shape_byte_len, CheckpointReader};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::manifest::{Manifest, ManifestEntry};
use crate::variables::{
    display_name, filter_latest_variants, has_multi_digit_suffix, var_name_to_filename,
};

/// Contador de pasos de entrenamiento: nunca se exporta
pub const GLOBAL_STEP: &str = "global_step";

/// Estadísticas del volcado
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportStats {
    /// Variables en el checkpoint
    pub total_variables: usize,
    /// Variables que sobreviven al filtro
    pub filtered_variables: usize,
    pub written: usize,
    pub skipped: usize,
    pub total_bytes: usize,
    /// Claves del manifest pisadas por otra variable (gana la última)
    pub manifest_overwrites: usize,
    /// Ficheros pisados por otro display name con el mismo nombre codificado
    pub filename_collisions: usize,
}

/// Resultado de una exportación completa
#[derive(Debug)]
pub struct ExportOutcome {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub stats: ExportStats,
}

/// true si la variable no debe exportarse
pub fn is_excluded(var_name: &str, remove_variables: Option<&Regex>) -> bool {
    var_name == GLOBAL_STEP || remove_variables.map_or(false, |re| re.is_match(var_name))
}

/// Abre el checkpoint de la config y lo vuelca
pub fn run_export(config: &ExportConfig) -> Result<ExportOutcome> {
    let reader = open_checkpoint(&config.checkpoint_file)?;
    debug!(
        "checkpoint {} ({})",
        config.checkpoint_file.display(),
        reader.format()
    );
    export_checkpoint(reader.as_ref(), &config.output_dir, config.remove_variables.as_ref())
}

/// Vuelca las variables filtradas de `reader` en `output_dir`
pub fn export_checkpoint(
    reader: &dyn CheckpointReader,
    output_dir: &Path,
    remove_variables: Option<&Regex>,
) -> Result<ExportOutcome> {
    let mut stats = ExportStats::default();

    let shapes = reader.variable_shapes()?;
    stats.total_variables = shapes.len();

    // Falla antes de tocar el disco si algún nombre rompe la convención
    let filtered = filter_latest_variants(&shapes)?;
    stats.filtered_variables = filtered.len();

    std::fs::create_dir_all(output_dir).map_err(|e| ExportError::io(output_dir, e))?;

    let mut manifest = Manifest::new();
    // filename → display name que lo escribió
    let mut written_files: HashMap<String, String> = HashMap::new();

    for (name, shape) in &filtered {
        if is_excluded(name, remove_variables) {
            println!("Ignoring {}", name);
            stats.skipped += 1;
            continue;
        }

        if has_multi_digit_suffix(name) {
            warn!(
                "'{}' has a multi-digit step suffix; display name keeps only part of it",
                name
            );
        }

        let display = display_name(name);
        let filename = var_name_to_filename(&display);

        let entry = ManifestEntry {
            filename: filename.clone(),
            shape: shape.clone(),
        };
        if manifest.insert(display.clone(), entry).is_some() {
            warn!("manifest entry '{}' overwritten by {}", display, name);
            stats.manifest_overwrites += 1;
        }

        println!("Writing variable {} as {}", name, display);
        let data = reader.read_tensor(name)?;

        if let Some(width) = reader.element_size(name) {
            match shape_byte_len(shape, width) {
                Some(expected) if data.len() != expected => warn!(
                    "{}: {} bytes, expected {} for shape {:?}",
                    name,
                    data.len(),
                    expected,
                    shape
                ),
                Some(_) => {}
                None => warn!("{}: shape {:?} overflows, {} bytes written as-is", name, shape, data.len()),
            }
        }

        if let Some(previous) = written_files.insert(filename.clone(), display.clone()) {
            if previous != display {
                warn!(
                    "filename '{}' collision: '{}' overwrites '{}'",
                    filename, display, previous
                );
                stats.filename_collisions += 1;
            }
        }

        let path = output_dir.join(&filename);
        std::fs::write(&path, &data).map_err(|e| ExportError::io(&path, e))?;

        stats.written += 1;
        stats.total_bytes += data.len();
    }

    let manifest_path = output_dir.join(crate::manifest::MANIFEST_FILENAME);
    println!("Writing manifest to {}", manifest_path.display());
    manifest.write_to(output_dir)?;

    Ok(ExportOutcome {
        manifest,
        manifest_path,
        stats,
    })
}
