//! Mapping index references onto archive members.
//!
//! Long entries are stored as split files sharing a base name:
//! `V1AD01.sun_split_000.htm`, `V1AD01.sun_split_001.htm`, ... A reference to
//! any one of them resolves to all of them.

/// Marker between the base name and the numeric suffix of a split file.
pub const SPLIT_MARKER: &str = "_split_";

/// Turn an index reference into an archive member path.
///
/// `reference` is a decoded path without its fragment. It is taken relative
/// to the directory of the index document it came from.
pub fn member_path(index_file: &str, reference: &str) -> String {
    let reference = reference.trim_start_matches("./");

    if let Some(absolute) = reference.strip_prefix('/') {
        return absolute.to_string();
    }

    match index_file.rsplit_once('/') {
        Some((dir, _)) if !reference.is_empty() => format!("{dir}/{reference}"),
        _ => reference.to_string(),
    }
}

/// Resolve a member path to the members holding its content, in order.
///
/// `members` must be sorted. A plain reference resolves to itself when it
/// exists; a split reference resolves to every sibling sharing its base name,
/// in lexicographic order. An empty result means nothing matched.
pub fn resolve_members(members: &[String], path: &str) -> Vec<String> {
    let Some((base, _)) = path.rsplit_once(SPLIT_MARKER) else {
        return members
            .iter()
            .filter(|m| m.as_str() == path)
            .cloned()
            .collect();
    };

    members
        .iter()
        .filter(|m| is_split_of(m, base))
        .cloned()
        .collect()
}

/// `<base>_split_<digits>.htm...`
fn is_split_of(member: &str, base: &str) -> bool {
    let Some(rest) = member
        .strip_prefix(base)
        .and_then(|r| r.strip_prefix(SPLIT_MARKER))
    else {
        return false;
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && rest[digits..].starts_with(".htm")
}
