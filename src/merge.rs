// src/merge.rs
// ============================================================================
// MERGE - Fusiona directorios de muestras (src → dst)
// ============================================================================
//
// Cada subdirectorio de src se mueve a dst:
// - Si dst no lo tiene, se mueve entero
// - Si ya existe, sus ficheros se renumeran a continuación del número más
//   alto de dst ("img_12.png" → "img_57.png") para no pisar nada
//
// El número de un fichero es el primer "\d+." de su nombre. Los ficheros
// ocultos no se mueven y cuentan como 0.
//
// ============================================================================

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};

use crate::error::{ExportError, Result};

/// Número antes de la extensión
pub const FILE_NUMBER_PATTERN: &str = r"\d+\.";

/// Un movimiento realizado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Número de un fichero (ocultos → 0)
fn file_number(re: &Regex, name: &str) -> Option<u64> {
    if is_hidden(name) {
        return Some(0);
    }
    let m = re.find(name)?;
    m.as_str().trim_end_matches('.').parse().ok()
}

/// Nombres de las entradas de un directorio, ordenados
fn sorted_names(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ExportError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ExportError::io(dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn move_entry(from: PathBuf, to: PathBuf, moves: &mut Vec<MergeMove>) -> Result<()> {
    std::fs::rename(&from, &to).map_err(|e| ExportError::io(&from, e))?;
    println!("{} -> {}", from.display(), to.display());
    moves.push(MergeMove { from, to });
    Ok(())
}

/// Mueve el contenido de `src` a `dst` resolviendo conflictos de nombre
pub fn merge_dirs(src: &Path, dst: &Path) -> Result<Vec<MergeMove>> {
    let re = Regex::new(FILE_NUMBER_PATTERN).map_err(|source| ExportError::InvalidRegex {
        pattern: FILE_NUMBER_PATTERN.to_string(),
        source,
    })?;

    let dst_names: BTreeSet<String> = sorted_names(dst)?.into_iter().collect();
    let mut moves = Vec::new();

    for name in sorted_names(src)? {
        let from_dir = src.join(&name);
        let to_dir = dst.join(&name);

        if !dst_names.contains(&name) {
            move_entry(from_dir, to_dir, &mut moves)?;
            continue;
        }

        if !from_dir.is_dir() || !to_dir.is_dir() {
            return Err(ExportError::MergeConflict(to_dir));
        }

        // Siguiente número libre en dst
        let mut top: Option<u64> = None;
        for f in sorted_names(&to_dir)? {
            let n = file_number(&re, &f).ok_or_else(|| ExportError::MissingFileNumber(to_dir.join(&f)))?;
            top = Some(top.map_or(n, |t| t.max(n)));
        }
        let mut next = top.map_or(0, |t| t + 1);

        let src_files: Vec<String> = sorted_names(&from_dir)?
            .into_iter()
            .filter(|f| !is_hidden(f))
            .collect();

        // Validar todo antes de mover nada dentro de este directorio
        if let Some(f) = src_files.iter().find(|f| file_number(&re, f).is_none()) {
            return Err(ExportError::MissingFileNumber(from_dir.join(f)));
        }

        for f in src_files {
            let replacement = format!("{}.", next);
            let new_name = re.replace_all(&f, NoExpand(&replacement)).into_owned();
            move_entry(from_dir.join(&f), to_dir.join(new_name), &mut moves)?;
            next += 1;
        }
    }

    Ok(moves)
}
