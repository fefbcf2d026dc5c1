//! Geometry label → backend key reconciliation.
//!
//! Map geometry and the backend name countries differently ("United States of
//! America" vs "USA"). Labels missing from the table pass through unchanged, so
//! an unmapped label simply never matches a backend record and renders neutral.

use crate::types::{CountryKey, GeometryLabel};

/// Geometry label → canonical backend key. Exact, case-sensitive match.
const NAME_ALIASES: &[(&str, &str)] = &[
    ("United States of America", "USA"),
    ("United States", "USA"),
    ("Russian Federation", "Russia"),
    ("Korea, Republic of", "South Korea"),
    ("Korea, Democratic People's Republic of", "North Korea"),
    ("Czechia", "Czech Republic"),
    ("Viet Nam", "Vietnam"),
    ("Côte d’Ivoire", "Ivory Coast"),
    ("Cote d'Ivoire", "Ivory Coast"),
    ("Syrian Arab Republic", "Syria"),
    ("Iran (Islamic Republic of)", "Iran"),
    ("Tanzania, United Republic of", "Tanzania"),
    ("Lao People's Democratic Republic", "Laos"),
    ("Bolivia (Plurinational State of)", "Bolivia"),
    ("Venezuela (Bolivarian Republic of)", "Venezuela"),
    ("Moldova, Republic of", "Moldova"),
    ("Brunei Darussalam", "Brunei"),
    ("United Kingdom", "United Kingdom"),
    ("Myanmar", "Myanmar"),
];

/// Resolve a geometry label to the backend's key. Total: unknown labels map to
/// themselves.
pub fn resolve(label: &GeometryLabel) -> CountryKey {
    let raw = label.as_str();
    NAME_ALIASES
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| CountryKey::new(*to))
        .unwrap_or_else(|| CountryKey::new(raw))
}

/// Lower-cased, trimmed form used by free-text lookups.
pub(crate) fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}
