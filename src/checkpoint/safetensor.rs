// src/checkpoint/safetensor.rs
// ============================================================================
// SAFETENSOR READER - Checkpoints en formato safetensors
// ============================================================================
//
// Layout:
//   [u64 LE: tamaño header][header JSON][datos]
//
// Los datos se leen por mmap y se devuelven tal cual, sin convertir dtype.
//
// ============================================================================

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use memmap2::Mmap;
use serde::Deserialize;

use super::{dtype_size, shape_byte_len, CheckpointReader};
use crate::error::{ExportError, Result};
use crate::variables::ShapeMap;

/// Información de un tensor en el archivo safetensor
#[derive(Debug, Clone, Deserialize)]
pub struct TensorInfo {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data_offsets: [usize; 2],
}

impl TensorInfo {
    /// Bytes declarados por `data_offsets`
    pub fn byte_len(&self) -> usize {
        self.data_offsets[1] - self.data_offsets[0]
    }
}

/// Header del archivo safetensor
#[derive(Debug, Deserialize)]
struct SafetensorHeader {
    #[serde(flatten)]
    tensors: HashMap<String, TensorInfo>,
    #[serde(rename = "__metadata__")]
    #[allow(dead_code)]
    metadata: Option<HashMap<String, String>>,
}

/// Archivo safetensor abierto
pub struct SafetensorFile {
    pub path: PathBuf,
    tensors: HashMap<String, TensorInfo>,
    data_start: usize,
    mmap: Mmap,
}

impl SafetensorFile {
    /// Abre y valida un archivo safetensor
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let malformed = |reason: String| ExportError::MalformedCheckpoint {
            path: path.clone(),
            reason,
        };

        let file = File::open(&path).map_err(|e| ExportError::io(&path, e))?;
        let file_len = file.metadata().map_err(|e| ExportError::io(&path, e))?.len();

        // Tamaño del header (primeros 8 bytes, little-endian u64)
        let mut reader = BufReader::new(&file);
        let header_size = reader
            .read_u64::<LittleEndian>()
            .map_err(|_| malformed(format!("file too small: {} bytes", file_len)))?;

        if header_size > file_len.saturating_sub(8) {
            return Err(malformed(format!(
                "header size {} exceeds file size {}",
                header_size, file_len
            )));
        }

        let mut header_bytes = vec![0u8; header_size as usize];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| ExportError::io(&path, e))?;

        let header: SafetensorHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| malformed(format!("invalid header JSON: {}", e)))?;

        // Memory map el archivo
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ExportError::io(&path, e))?;

        let data_start = 8 + header_size as usize;
        // El fichero puede haber cambiado desde metadata()
        let data_len = data_section_len(mmap.len(), data_start).map_err(malformed)?;

        for (name, info) in &header.tensors {
            check_tensor_info(name, info, data_len).map_err(malformed)?;
        }

        debug!("opened {} ({} tensors)", path.display(), header.tensors.len());

        Ok(Self {
            path,
            tensors: header.tensors,
            data_start,
            mmap,
        })
    }

    /// Lista nombres de tensores
    pub fn tensor_names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(|s| s.as_str())
    }

    /// Obtiene información de un tensor
    pub fn tensor_info(&self, name: &str) -> Option<&TensorInfo> {
        self.tensors.get(name)
    }

    /// Lee un tensor como bytes raw
    pub fn read_raw(&self, name: &str) -> Result<&[u8]> {
        let info = self
            .tensors
            .get(name)
            .ok_or_else(|| ExportError::TensorNotFound(name.to_string()))?;

        let start = self.data_start + info.data_offsets[0];
        let end = self.data_start + info.data_offsets[1];

        Ok(&self.mmap[start..end])
    }
}

/// Longitud de la sección de datos de un fichero de `mapped_len` bytes
fn data_section_len(mapped_len: usize, data_start: usize) -> std::result::Result<usize, String> {
    mapped_len.checked_sub(data_start).ok_or_else(|| {
        format!(
            "file is {} bytes, shorter than its {} byte header",
            mapped_len, data_start
        )
    })
}

/// Valida offsets y shape de un tensor contra la sección de datos.
/// Con dtype conocido, shape × ancho debe coincidir con los offsets.
fn check_tensor_info(name: &str, info: &TensorInfo, data_len: usize) -> std::result::Result<(), String> {
    let [begin, end] = info.data_offsets;
    if begin > end || end > data_len {
        return Err(format!(
            "tensor '{}' offsets [{}, {}] outside data section of {} bytes",
            name, begin, end, data_len
        ));
    }

    let width = dtype_size(&info.dtype).unwrap_or(1);
    let expected = shape_byte_len(&info.shape, width)
        .ok_or_else(|| format!("tensor '{}' shape {:?} overflows", name, info.shape))?;

    if dtype_size(&info.dtype).is_some() && expected != info.byte_len() {
        return Err(format!(
            "tensor '{}' shape {:?} × {} bytes is {} bytes, offsets hold {}",
            name,
            info.shape,
            width,
            expected,
            info.byte_len()
        ));
    }

    Ok(())
}

/// Checkpoint safetensors: un archivo o una carpeta con shards
pub struct SafetensorCheckpoint {
    files: Vec<SafetensorFile>,
    tensor_to_file: HashMap<String, usize>,
}

impl SafetensorCheckpoint {
    /// Abre un único archivo
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_paths(&[path.as_ref().to_path_buf()])
    }

    /// Abre todos los safetensors de un directorio
    pub fn from_folder(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let entries = std::fs::read_dir(dir).map_err(|e| ExportError::io(dir, e))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |e| e == "safetensors"))
            .collect();

        if paths.is_empty() {
            return Err(ExportError::MalformedCheckpoint {
                path: dir.to_path_buf(),
                reason: "no .safetensors files".to_string(),
            });
        }

        // Ordenar para consistencia: en duplicados gana el último shard
        paths.sort();
        Self::from_paths(&paths)
    }

    fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        let mut tensor_to_file = HashMap::new();

        for (idx, path) in paths.iter().enumerate() {
            let file = SafetensorFile::open(path)?;

            for name in file.tensor_names() {
                tensor_to_file.insert(name.to_string(), idx);
            }

            files.push(file);
        }

        Ok(Self { files, tensor_to_file })
    }

    /// Número total de tensores
    pub fn len(&self) -> usize {
        self.tensor_to_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensor_to_file.is_empty()
    }

    /// Obtiene información de un tensor
    pub fn tensor_info(&self, name: &str) -> Option<&TensorInfo> {
        let file_idx = self.tensor_to_file.get(name)?;
        self.files[*file_idx].tensor_info(name)
    }

    /// Dtype de un tensor
    pub fn dtype(&self, name: &str) -> Option<&str> {
        self.tensor_info(name).map(|info| info.dtype.as_str())
    }
}

impl CheckpointReader for SafetensorCheckpoint {
    fn format(&self) -> &str {
        "safetensors"
    }

    fn variable_shapes(&self) -> Result<ShapeMap> {
        let mut shapes = ShapeMap::new();
        for (name, &file_idx) in &self.tensor_to_file {
            if let Some(info) = self.files[file_idx].tensor_info(name) {
                shapes.insert(name.clone(), info.shape.clone());
            }
        }
        Ok(shapes)
    }

    fn read_tensor(&self, name: &str) -> Result<Cow<'_, [u8]>> {
        let file_idx = self
            .tensor_to_file
            .get(name)
            .ok_or_else(|| ExportError::TensorNotFound(name.to_string()))?;
        Ok(Cow::Borrowed(self.files[*file_idx].read_raw(name)?))
    }

    fn element_size(&self, name: &str) -> Option<usize> {
        self.dtype(name).and_then(dtype_size)
    }
}

/// Escribe un safetensors mínimo para tests
#[cfg(test)]
pub(crate) fn write_safetensors(path: &Path, tensors: &[(&str, &str, &[usize], &[u8])]) {
    use byteorder::WriteBytesExt;
    use std::io::Write;

    let mut header = serde_json::Map::new();
    header.insert(
        "__metadata__".to_string(),
        serde_json::json!({ "format": "pt" }),
    );

    let mut offset = 0usize;
    for (name, dtype, shape, data) in tensors {
        header.insert(
            name.to_string(),
            serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }),
        );
        offset += data.len();
    }

    let header_bytes = serde_json::to_vec(&header).unwrap();
    let mut file = File::create(path).unwrap();
    file.write_u64::<LittleEndian>(header_bytes.len() as u64).unwrap();
    file.write_all(&header_bytes).unwrap();
    for (_, _, _, data) in tensors {
        file.write_all(data).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_single_file_shapes_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        let weights = f32_bytes(&[1.0, 2.0, 3.0, 4.0]);
        let bias = vec![7u8, 8];
        write_safetensors(
            &path,
            &[
                ("layer1/weights_1", "F32", &[2, 2], weights.as_slice()),
                ("layer1/bias_1", "F16", &[1], bias.as_slice()),
            ],
        );

        let ckpt = SafetensorCheckpoint::from_file(&path).unwrap();
        assert_eq!(ckpt.len(), 2);
        assert_eq!(ckpt.format(), "safetensors");

        let shapes = ckpt.variable_shapes().unwrap();
        assert_eq!(shapes["layer1/weights_1"], vec![2, 2]);
        assert_eq!(shapes["layer1/bias_1"], vec![1]);

        assert_eq!(ckpt.read_tensor("layer1/weights_1").unwrap().as_ref(), weights.as_slice());
        assert_eq!(ckpt.read_tensor("layer1/bias_1").unwrap().as_ref(), bias.as_slice());
        assert_eq!(ckpt.element_size("layer1/weights_1"), Some(4));
        assert_eq!(ckpt.element_size("layer1/bias_1"), Some(2));
    }

    #[test]
    fn test_missing_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        write_safetensors(&path, &[("a_1", "U8", &[1], &[0])]);

        let ckpt = SafetensorCheckpoint::from_file(&path).unwrap();
        assert!(matches!(
            ckpt.read_tensor("b_1"),
            Err(ExportError::TensorNotFound(ref n)) if n == "b_1"
        ));
    }

    #[test]
    fn test_folder_merges_shards() {
        let dir = tempfile::tempdir().unwrap();
        write_safetensors(
            &dir.path().join("model-00001-of-00002.safetensors"),
            &[("enc/w_1", "U8", &[2], &[1, 2])],
        );
        write_safetensors(
            &dir.path().join("model-00002-of-00002.safetensors"),
            &[("dec/w_1", "U8", &[3], &[3, 4, 5])],
        );
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();

        let ckpt = SafetensorCheckpoint::from_folder(dir.path()).unwrap();
        let shapes = ckpt.variable_shapes().unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(ckpt.read_tensor("dec/w_1").unwrap().as_ref(), &[3, 4, 5]);
    }

    #[test]
    fn test_empty_folder_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SafetensorCheckpoint::from_folder(dir.path()),
            Err(ExportError::MalformedCheckpoint { .. })
        ));
    }

    #[test]
    fn test_out_of_range_offsets_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.safetensors");

        let header = br#"{"w_1":{"dtype":"F32","shape":[4],"data_offsets":[0,16]}}"#;
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header);
        bytes.extend_from_slice(&[0u8; 8]);
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            SafetensorFile::open(&path),
            Err(ExportError::MalformedCheckpoint { .. })
        ));
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.safetensors");
        write_safetensors(&path, &[("w/k_1", "F32", &[1 << 40, 1 << 40], &[0u8; 4])]);

        let err = SafetensorFile::open(&path).err().unwrap();
        assert!(
            matches!(err, ExportError::MalformedCheckpoint { ref reason, .. } if reason.contains("overflows")),
            "{}",
            err
        );
    }

    #[test]
    fn test_shape_offsets_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.safetensors");
        // [2, 2] F32 son 16 bytes, los offsets solo cubren 12
        write_safetensors(&path, &[("w_1", "F32", &[2, 2], &[0u8; 12])]);

        assert!(matches!(
            SafetensorCheckpoint::from_file(&path),
            Err(ExportError::MalformedCheckpoint { .. })
        ));
    }

    #[test]
    fn test_unknown_dtype_skips_width_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packed.safetensors");
        write_safetensors(&path, &[("q_1", "Q4_K", &[64], &[0u8; 36])]);

        let ckpt = SafetensorCheckpoint::from_file(&path).unwrap();
        assert_eq!(ckpt.element_size("q_1"), None);
        assert_eq!(ckpt.tensor_info("q_1").unwrap().byte_len(), 36);
    }

    #[test]
    fn test_check_tensor_info() {
        let info = |dtype: &str, shape: &[usize], offsets: [usize; 2]| TensorInfo {
            dtype: dtype.to_string(),
            shape: shape.to_vec(),
            data_offsets: offsets,
        };

        assert!(check_tensor_info("a", &info("F16", &[3], [2, 8]), 8).is_ok());
        assert!(check_tensor_info("a", &info("F16", &[3], [8, 2]), 8).is_err());
        assert!(check_tensor_info("a", &info("F16", &[3], [2, 8]), 6).is_err());
        assert!(check_tensor_info("a", &info("F16", &[4], [2, 8]), 8).is_err());
        assert!(check_tensor_info("a", &info("X", &[usize::MAX, 2], [0, 0]), 0).is_err());
    }

    #[test]
    fn test_data_section_len_of_shrunk_file() {
        assert_eq!(data_section_len(40, 24), Ok(16));
        assert_eq!(data_section_len(24, 24), Ok(0));
        assert!(data_section_len(10, 24).unwrap_err().contains("shorter"));
    }

    #[test]
    fn test_truncated_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.safetensors");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        assert!(matches!(
            SafetensorFile::open(&path),
            Err(ExportError::MalformedCheckpoint { .. })
        ));
    }
}
