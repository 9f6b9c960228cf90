// src/variables/filter.rs
// ============================================================================
// VARIABLE FILTER - Descarta snapshots antiguos de cada parámetro
// ============================================================================
//
// Heurística, no exacta:
// - La base es lo anterior al PRIMER '_' (o al ÚLTIMO '/' si no hay '_')
// - Los candidatos de una base son TODAS las variables que la contienen como
//   substring (no solo como prefijo), así que pueden colarse variables ajenas
// - De cada grupo se quedan las dos que ordenan últimas lexicográficamente
//
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::{ExportError, Result};

/// Nombre de variable → shape, ordenado por nombre
pub type ShapeMap = BTreeMap<String, Vec<usize>>;

/// Variantes que se conservan por nombre base
pub const KEEP_VARIANTS: usize = 2;

/// Deriva el nombre base (clave de agrupación) de una variable.
///
/// `layer1/weights_3` → `layer1/weights`, `conv/bias` → `conv`.
/// Un nombre sin '_' ni '/' rompe la convención y es un error fatal.
pub fn base_name(var_name: &str) -> Result<&str> {
    if let Some(idx) = var_name.find('_') {
        return Ok(&var_name[..idx]);
    }
    match var_name.rfind('/') {
        Some(idx) => Ok(&var_name[..idx]),
        None => Err(ExportError::NamingConvention(var_name.to_string())),
    }
}

/// Filtra el mapa completo dejando, por cada base, las dos variables que
/// contienen la base y ordenan últimas.
pub fn filter_latest_variants(shapes: &ShapeMap) -> Result<ShapeMap> {
    let mut base_names = BTreeSet::new();
    for var in shapes.keys() {
        base_names.insert(base_name(var)?);
    }

    let mut filtered = ShapeMap::new();
    for base in &base_names {
        // Las claves de un BTreeMap ya salen en orden lexicográfico
        let matching: Vec<(&String, &Vec<usize>)> = shapes
            .iter()
            .filter(|(var, _)| var.contains(base))
            .collect();

        let start = matching.len().saturating_sub(KEEP_VARIANTS);
        for (var, shape) in &matching[start..] {
            filtered.insert((*var).clone(), (*shape).clone());
        }

        debug!(
            "base '{}': {} candidates, kept {:?}",
            base,
            matching.len(),
            matching[start..].iter().map(|(v, _)| v.as_str()).collect::<Vec<_>>()
        );
    }

    Ok(filtered)
}
