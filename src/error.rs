// src/error.rs
// ============================================================================
// ERRORES - Taxonomía de fallos del volcado
// ============================================================================
//
// Todo error es fatal: no hay reintentos ni rollback. Lo ya escrito en disco
// se queda ahí.
//
// ============================================================================

use std::path::PathBuf;

/// Errores del pipeline de exportación
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Nombre sin '_' ni '/': no se puede derivar el nombre base
    #[error("variable name '{0}' violates naming convention (expected '_' or '/')")]
    NamingConvention(String),

    #[error("invalid remove_variables_regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("tensor '{0}' not found in checkpoint")]
    TensorNotFound(String),

    #[error("malformed checkpoint {path}: {reason}")]
    MalformedCheckpoint { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fichero sin número antes de la extensión (merge)
    #[error("no file number found in {0}")]
    MissingFileNumber(PathBuf),

    #[error("cannot merge {0}: destination entry exists and is not a directory")]
    MergeConflict(PathBuf),
}

impl ExportError {
    /// Atajo para envolver un io::Error con la ruta afectada
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_convention_display() {
        let err = ExportError::NamingConvention("bias".to_string());
        assert_eq!(
            err.to_string(),
            "variable name 'bias' violates naming convention (expected '_' or '/')"
        );
    }

    #[test]
    fn test_io_display_includes_path() {
        let err = ExportError::io(
            "/tmp/out/w",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error on /tmp/out/w: denied");
    }

    #[test]
    fn test_invalid_regex_display() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = ExportError::InvalidRegex {
            pattern: "(".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("invalid remove_variables_regex '('"));
    }
}
