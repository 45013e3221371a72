//! Centralized validation and helper functions.

/// Maximum number of records accepted from a single input file (DOS protection)
pub const MAX_RECORDS: usize = 1_000_000;

/// Separators between the roles of a multi-role functional annotation
const ROLE_SEPARATORS: [&str; 3] = [" / ", " @ ", "; "];

/// Content hash of a sequence: lowercase MD5 hex of the uppercased residues.
///
/// # Examples
///
/// ```
/// use repgen::utils::validation::content_hash;
///
/// assert_eq!(content_hash("acgt"), content_hash("ACGT"));
/// assert_eq!(content_hash("ACGT"), "f1f8f4bf413b16ad135722aa4591043e");
/// ```
#[must_use]
pub fn content_hash(residues: &str) -> String {
    let uppercase = residues.to_ascii_uppercase();
    format!("{:x}", md5::compute(uppercase.as_bytes()))
}

/// Validate that a string is a valid MD5 checksum (32 hex characters).
#[must_use]
pub fn is_valid_md5(s: &str) -> bool {
    s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize an MD5 string to lowercase.
/// Returns None if the input is not a valid MD5.
#[must_use]
pub fn normalize_md5(s: &str) -> Option<String> {
    if is_valid_md5(s) {
        Some(s.to_lowercase())
    } else {
        None
    }
}

/// Check if adding another record would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new record.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_record_limit(count: usize) -> Option<String> {
    if count >= MAX_RECORDS {
        Some(format!(
            "Too many records: adding another would exceed maximum of {MAX_RECORDS}"
        ))
    } else {
        None
    }
}

/// Normalize one role name for comparison: drop a trailing `#` comment and
/// any parenthesized EC/TC numbers, collapse whitespace, lowercase.
#[must_use]
pub fn normalize_role(role: &str) -> String {
    let role = role.split('#').next().unwrap_or_default();

    let mut kept = String::with_capacity(role.len());
    let mut rest = role;
    while let Some(open) = rest.find('(') {
        let Some(close) = rest[open..].find(')') else {
            break;
        };
        let inner = rest[open + 1..open + close].trim();
        kept.push_str(&rest[..open]);
        if !(inner.starts_with("EC ") || inner.starts_with("TC ")) {
            kept.push_str(&rest[open..=open + close]);
        }
        rest = &rest[open + close + 1..];
    }
    kept.push_str(rest);

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split a functional annotation into its normalized roles
#[must_use]
pub fn split_roles(function: &str) -> Vec<String> {
    let mut parts = vec![function.to_string()];
    for separator in ROLE_SEPARATORS {
        parts = parts
            .iter()
            .flat_map(|p| p.split(separator).map(str::to_string).collect::<Vec<_>>())
            .collect();
    }
    parts
        .iter()
        .map(|p| normalize_role(p))
        .filter(|r| !r.is_empty())
        .collect()
}

/// True if one of the roles of `function` is exactly `role`
#[must_use]
pub fn has_role(function: &str, role: &str) -> bool {
    let wanted = normalize_role(role);
    split_roles(function).iter().any(|r| *r == wanted)
}
