// src/checkpoint/mod.rs
// ============================================================================
// CHECKPOINT - Lectores de checkpoints
// ============================================================================
//
// El pipeline solo necesita dos cosas del checkpoint:
//   - nombre de variable → shape
//   - nombre de variable → bytes raw (tipo y layout nativos, sin convertir)
//
// ============================================================================

pub mod memory;
pub mod safetensor;

use std::borrow::Cow;
use std::path::Path;

use crate::error::{ExportError, Result};
use crate::variables::ShapeMap;

pub use memory::MemoryCheckpoint;
pub use safetensor::{SafetensorCheckpoint, SafetensorFile, TensorInfo};

/// Interfaz del lector de checkpoints.
///
/// El lector es OPACO para el pipeline: no se valida el contenido de los
/// tensores, solo se copian sus bytes.
pub trait CheckpointReader {
    /// Formato del checkpoint (ej: "safetensors")
    fn format(&self) -> &str;

    /// Mapa completo nombre → shape
    fn variable_shapes(&self) -> Result<ShapeMap>;

    /// Bytes raw de un tensor
    fn read_tensor(&self, name: &str) -> Result<Cow<'_, [u8]>>;

    /// Ancho en bytes de un elemento, si el formato lo conoce
    fn element_size(&self, _name: &str) -> Option<usize> {
        None
    }
}

/// Ancho en bytes de un dtype safetensors
pub fn dtype_size(dtype: &str) -> Option<usize> {
    match dtype {
        "F64" | "I64" | "U64" => Some(8),
        "F32" | "I32" | "U32" => Some(4),
        "F16" | "BF16" | "I16" | "U16" => Some(2),
        "I8" | "U8" | "BOOL" | "F8_E4M3" | "F8_E5M2" => Some(1),
        _ => None,
    }
}

/// Bytes que ocupa un tensor de `shape` con elementos de `element_size`.
/// `None` si el producto desborda `usize`.
pub fn shape_byte_len(shape: &[usize], element_size: usize) -> Option<usize> {
    shape
        .iter()
        .try_fold(element_size, |acc, &dim| acc.checked_mul(dim))
}

/// Abre el checkpoint correcto según la ruta:
/// - directorio → todos los .safetensors dentro (shards)
/// - fichero    → un único .safetensors
pub fn open_checkpoint(path: &Path) -> Result<Box<dyn CheckpointReader>> {
    let metadata = std::fs::metadata(path).map_err(|e| ExportError::io(path, e))?;

    if metadata.is_dir() {
        Ok(Box::new(SafetensorCheckpoint::from_folder(path)?))
    } else {
        Ok(Box::new(SafetensorCheckpoint::from_file(path)?))
    }
}
