// src/variables/mod.rs
// ============================================================================
// VARIABLES - Selección y nombrado de variables del checkpoint
// ============================================================================
//
// Tres etapas puras, sin estado:
//   filter   → se queda con las dos variantes más recientes de cada base
//   display  → quita el sufijo de paso ("_3") del nombre
//   filename → nombre seguro para el sistema de ficheros
//
// ============================================================================

pub mod display;
pub mod filename;
pub mod filter;

pub use display::{display_name, has_multi_digit_suffix};
pub use filename::{is_filename_char, var_name_to_filename};
pub use filter::{base_name, filter_latest_variants, ShapeMap, KEEP_VARIANTS};
