//! Header and natural-key normalization.
//!
//! Two spellings name the same column when they agree after trimming, folding
//! non-breaking spaces, underscores and hyphens to spaces, collapsing runs of
//! whitespace, and lowercasing.

/// Trimmed copy of a cell's text.
pub fn text(value: &str) -> String {
    value.trim().to_string()
}

/// Normalized comparison key for headers, site locations and employee names.
pub fn norm_key(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for ch in value.chars() {
        let folded = match ch {
            '\u{00A0}' | '_' | '-' => ' ',
            c => c,
        };
        if folded.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(folded.to_lowercase());
    }
    out
}

/// Lowercased, trimmed text used for exact-but-case-insensitive id matches.
pub fn fold_id(value: &str) -> String {
    value.trim().to_lowercase()
}
