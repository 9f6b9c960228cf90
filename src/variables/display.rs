// src/variables/display.rs
// ============================================================================
// DISPLAY NAME - Quita el marcador de paso del nombre de variable
// ============================================================================
//
// Regla: se borra el ÚLTIMO '_' y el carácter que le sigue.
//   "layer1/weights_3" → "layer1/weights"
//
// Asume sufijos de un solo carácter. "w_10" queda "w0": se reproduce tal cual
// y el exportador lo avisa con has_multi_digit_suffix().
//
// ============================================================================

/// Nombre visible de una variable (clave del manifest)
pub fn display_name(var_name: &str) -> String {
    match var_name.rfind('_') {
        Some(idx) => {
            let mut tail = var_name[idx + 1..].chars();
            tail.next();
            format!("{}{}", &var_name[..idx], tail.as_str())
        }
        None => var_name.to_string(),
    }
}

/// true si tras el último '_' hay un número de más de un dígito ("w_10"),
/// caso en el que display_name() trunca mal el sufijo.
pub fn has_multi_digit_suffix(var_name: &str) -> bool {
    match var_name.rfind('_') {
        Some(idx) => {
            let suffix = &var_name[idx + 1..];
            suffix.len() > 1 && suffix.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
