// src/checkpoint/memory.rs
// ============================================================================
// MEMORY CHECKPOINT - Checkpoint en memoria (embebido / tests)
// ============================================================================

use std::borrow::Cow;
use std::collections::BTreeMap;

use super::CheckpointReader;
use crate::error::{ExportError, Result};
use crate::variables::ShapeMap;

#[derive(Debug, Clone)]
struct MemoryTensor {
    shape: Vec<usize>,
    bytes: Vec<u8>,
    element_size: Option<usize>,
}

/// Checkpoint construido a mano, nombre → (shape, bytes)
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpoint {
    tensors: BTreeMap<String, MemoryTensor>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Añade un tensor con bytes ya serializados
    pub fn insert_raw(
        &mut self,
        name: impl Into<String>,
        shape: &[usize],
        bytes: Vec<u8>,
        element_size: Option<usize>,
    ) {
        self.tensors.insert(
            name.into(),
            MemoryTensor {
                shape: shape.to_vec(),
                bytes,
                element_size,
            },
        );
    }

    /// Añade un tensor f32 (orden de bytes nativo)
    pub fn insert_f32(&mut self, name: impl Into<String>, shape: &[usize], values: &[f32]) {
        let bytes = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        self.insert_raw(name, shape, bytes, Some(4));
    }

    /// Builder: versión encadenable de insert_f32
    pub fn with_f32(mut self, name: impl Into<String>, shape: &[usize], values: &[f32]) -> Self {
        self.insert_f32(name, shape, values);
        self
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl CheckpointReader for MemoryCheckpoint {
    fn format(&self) -> &str {
        "memory"
    }

    fn variable_shapes(&self) -> Result<ShapeMap> {
        Ok(self
            .tensors
            .iter()
            .map(|(name, t)| (name.clone(), t.shape.clone()))
            .collect())
    }

    fn read_tensor(&self, name: &str) -> Result<Cow<'_, [u8]>> {
        self.tensors
            .get(name)
            .map(|t| Cow::Borrowed(t.bytes.as_slice()))
            .ok_or_else(|| ExportError::TensorNotFound(name.to_string()))
    }

    fn element_size(&self, name: &str) -> Option<usize> {
        self.tensors.get(name).and_then(|t| t.element_size)
    }
}
