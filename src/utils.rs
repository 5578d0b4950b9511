use chrono::{DateTime, TimeZone};
use std::collections::HashSet;
use std::path::Path;

const MAX_FILE_STEM_LEN: usize = 60;
const MAX_SHEET_NAME_LEN: usize = 31;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(column), row)
}

pub fn path_to_forward_slashes(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.contains('\\') {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}

fn fold_accent(ch: char) -> Option<char> {
    let folded = match ch {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        _ => return None,
    };
    Some(folded)
}

/// File-system safe stem: ASCII alphanumerics, `-` and `_` only, accents
/// folded, other runs collapsed to a single `_`, at most 60 characters.
pub fn sanitize_file_stem(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            ch
        } else {
            fold_accent(ch).unwrap_or('_')
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    let trimmed: String = out
        .trim_matches('_')
        .chars()
        .take(MAX_FILE_STEM_LEN)
        .collect();
    let trimmed = trimmed.trim_end_matches('_').to_string();
    if trimmed.is_empty() {
        "reporte".to_string()
    } else {
        trimmed
    }
}

/// `YYYYMMDD_HHMMSS`, shared by every artifact of one export run.
pub fn timestamp_prefix<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Strips characters Excel rejects and truncates to 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if INVALID_SHEET_CHARS.contains(&ch) { ' ' } else { ch })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME_LEN).collect();
    let truncated = truncated.trim_end().to_string();
    if truncated.is_empty() {
        "Hoja".to_string()
    } else {
        truncated
    }
}

/// Sanitized sheet name not yet in `used` (case-insensitive). Collisions get
/// a ` (n)` suffix, shortening the base so the result stays within 31
/// characters.
pub fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    if used.insert(base.to_lowercase()) {
        return base;
    }
    let mut suffix = 2usize;
    loop {
        let tail = format!(" ({suffix})");
        let keep = MAX_SHEET_NAME_LEN.saturating_sub(tail.chars().count());
        let head: String = base.chars().take(keep).collect();
        let candidate = format!("{}{tail}", head.trim_end());
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        suffix += 1;
    }
}
