/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// `"-"` is the report's placeholder for "no value".
pub fn is_null(raw: &str) -> bool {
    let s = clean_str(raw);
    s.is_empty() || s == "-"
}

/// Normalise a numeric cell: drop grouping spaces (incl. NBSP) and accept a
/// decimal comma. Returns `None` for null cells.
pub fn numeric_str(raw: &str) -> Option<String> {
    if is_null(raw) {
        return None;
    }
    let s: String = clean_str(raw)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    Some(s)
}

/// Render a spreadsheet float the way the report shows it: integral values
/// without a trailing `.0`.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Text before the first comma, or the whole string when there is none.
pub fn text_before_comma(s: &str) -> &str {
    s.split(',').next().unwrap_or(s)
}
