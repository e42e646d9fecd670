//! Upload filename sanitizer
//!
//! Turns an untrusted client filename into a path-safe, collision-free name.

use stemsplit_common::uuid_utils;

/// Characters kept besides alphanumerics
const EXTRA_ALLOWED: [char; 3] = ['.', '_', '-'];

/// Keep only alphanumerics, `.`, `_` and `-` and prefix a fresh UUID
///
/// Disallowed characters are dropped, not replaced. Never fails: an empty or
/// fully stripped input yields `"<uuid>_"`.
pub fn sanitize_filename(original: &str) -> String {
    let safe: String = original
        .chars()
        .filter(|c| c.is_alphanumeric() || EXTRA_ALLOWED.contains(c))
        .collect();

    format!("{}_{}", uuid_utils::generate_string(), safe.trim_end())
}
