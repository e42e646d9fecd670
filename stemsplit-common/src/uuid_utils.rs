//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new UUIDv4 in its hyphenated lowercase string form
///
/// This is the prefix format used for staged upload names.
pub fn generate_string() -> String {
    generate().hyphenated().to_string()
}

/// Check whether `s` starts with a hyphenated UUID
pub fn has_uuid_prefix(s: &str) -> bool {
    s.get(..36).map(|p| Uuid::parse_str(p).is_ok()).unwrap_or(false)
}
