// src/config.rs
// ============================================================================
// CONFIG - Configuración explícita del volcado
// ============================================================================
//
// Nada de estado global: el CLI construye un ExportConfig y se lo pasa al
// pipeline. Todos los errores de configuración salen aquí, antes de tocar
// el disco.
//
// ============================================================================

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{ExportError, Result};

/// Parámetros de una ejecución
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Checkpoint de origen (fichero o carpeta de shards)
    pub checkpoint_file: PathBuf,
    /// Directorio de salida (se crea si no existe)
    pub output_dir: PathBuf,
    /// Variables que casan desde el inicio del nombre se excluyen
    pub remove_variables: Option<Regex>,
}

impl ExportConfig {
    /// Construye la config expandiendo `~` y compilando la regex.
    /// Una regex vacía significa "no excluir nada".
    pub fn new(
        checkpoint_file: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        remove_variables_regex: &str,
    ) -> Result<Self> {
        Ok(Self {
            checkpoint_file: expand_user(checkpoint_file.as_ref()),
            output_dir: expand_user(output_dir.as_ref()),
            remove_variables: compile_exclusion(remove_variables_regex)?,
        })
    }
}

/// Compila la regex de exclusión anclada al inicio del nombre
/// (misma semántica que un match desde la posición 0).
pub fn compile_exclusion(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }

    let regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|source| ExportError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })?;

    Ok(Some(regex))
}

/// Expande `~` y `~/...` al directorio home del usuario
pub fn expand_user(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            if rest.as_os_str().is_empty() {
                return home;
            }
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_regex_disables_exclusion() {
        assert!(compile_exclusion("").unwrap().is_none());
    }

    #[test]
    fn test_exclusion_is_anchored_at_start() {
        let regex = compile_exclusion("aux_").unwrap().unwrap();
        assert!(regex.is_match("aux_head/w_1"));
        assert!(!regex.is_match("model/aux_head/w_1"));
    }

    #[test]
    fn test_exclusion_alternation_stays_anchored() {
        let regex = compile_exclusion("a|b").unwrap().unwrap();
        assert!(regex.is_match("b/w_1"));
        assert!(!regex.is_match("xb/w_1"));
    }

    #[test]
    fn test_malformed_regex_is_config_error() {
        let err = compile_exclusion("(unclosed").unwrap_err();
        assert!(matches!(err, ExportError::InvalidRegex { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_expand_user() {
        let plain = Path::new("/data/model.safetensors");
        assert_eq!(expand_user(plain), plain);

        // "~foo" no es el home
        assert_eq!(expand_user(Path::new("~foo/x")), PathBuf::from("~foo/x"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_user(Path::new("~")), home);
            assert_eq!(expand_user(Path::new("~/ckpt/model")), home.join("ckpt/model"));
        }
    }

    #[test]
    fn test_config_new() {
        let config = ExportConfig::new("/tmp/model.safetensors", "/tmp/out", "^aux_").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.remove_variables.is_some());

        assert!(ExportConfig::new("/tmp/m", "/tmp/o", "[").is_err());
    }
}
