// src/manifest.rs
// ============================================================================
// MANIFEST - Índice JSON de los tensores exportados
// ============================================================================
//
// Formato (claves ordenadas, indentación de 2 espacios):
//
//   {
//     "b/w": {
//       "filename": "b_w",
//       "shape": [
//         4
//       ]
//     }
//   }
//
// Todo carácter fuera de ASCII imprimible se escapa como \uXXXX (pares
// suplentes fuera del BMP), igual que json.dumps con ensure_ascii.
//
// ============================================================================

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, PrettyFormatter};

use crate::error::{ExportError, Result};

/// Nombre fijo del manifest dentro del directorio de salida
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Entrada del manifest: fichero y shape de un tensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub shape: Vec<usize>,
}

impl ManifestEntry {
    /// Número de elementos del tensor, `None` si desborda
    pub fn numel(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }
}

/// PrettyFormatter de 2 espacios que solo emite ASCII
struct AsciiPrettyFormatter {
    inner: PrettyFormatter<'static>,
}

impl AsciiPrettyFormatter {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiPrettyFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            // serde_json ya escapa comillas, '\\' y controles; queda DEL y lo no-ASCII
            if (' '..='~').contains(&c) {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// display name → entrada. BTreeMap para serializar con claves ordenadas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta una entrada. Si la clave ya existía gana la última y se
    /// devuelve la anterior.
    pub fn insert(&mut self, display_name: impl Into<String>, entry: ManifestEntry) -> Option<ManifestEntry> {
        self.entries.insert(display_name.into(), entry)
    }

    pub fn get(&self, display_name: &str) -> Option<&ManifestEntry> {
        self.entries.get(display_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Itera en orden de clave
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON ASCII con claves ordenadas e indentación de 2 espacios, sin salto final
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiPrettyFormatter::new());
        self.serialize(&mut ser)?;
        // Solo ASCII: la conversión no pierde nada
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Escribe `<dir>/manifest.json`, sobrescribiendo el anterior
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILENAME);
        let json = self.to_json()?;
        std::fs::write(&path, json).map_err(|e| ExportError::io(&path, e))?;
        Ok(path)
    }

    /// Lee `<dir>/manifest.json`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILENAME);
        let data = std::fs::read_to_string(&path).map_err(|e| ExportError::io(&path, e))?;
        Ok(serde_json::from_str(&data)?)
    }
}
