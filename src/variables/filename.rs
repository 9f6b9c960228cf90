// src/variables/filename.rs
// ============================================================================
// FILENAME ENCODER - Nombre de variable → nombre de fichero
// ============================================================================
//
// Alfabeto cerrado: [A-Za-z0-9_]. '/' pasa a '_', el resto se descarta.
// No es inyectivo: "a/b" y "a_b" acaban ambos en "a_b".
//
// ============================================================================

/// true si el carácter se copia tal cual al nombre de fichero
pub fn is_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Convierte un display name en nombre de fichero
pub fn var_name_to_filename(display_name: &str) -> String {
    display_name
        .chars()
        .filter_map(|c| match c {
            '/' => Some('_'),
            c if is_filename_char(c) => Some(c),
            _ => None,
        })
        .collect()
}
