//! Name normalization for managed roles.

/// Normalize a world name as reported by the game API.
///
/// Localized worlds carry a trailing bracketed language tag
/// (`"Kodash [DE]"`, `"Baruch Bay [SP]"`). The role for a world is named after
/// the bare world name, so every trailing `[...]` group is stripped and the
/// result trimmed. Brackets in the middle of a name are kept.
pub fn normalize_world_name(raw: &str) -> String {
    let mut name = raw.trim();
    while name.ends_with(']') {
        match name.rfind('[') {
            Some(open) => name = name[..open].trim_end(),
            None => break,
        }
    }
    if name.is_empty() {
        // A name that is nothing but a qualifier stays as reported.
        return raw.trim().to_string();
    }
    name.to_string()
}
