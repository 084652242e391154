// src/analyze/language.rs
//! Script-based language guess. Not a language model: returns one of
//! `en`, `es`, `hi`, `other`.

/// Basic Latin only.
fn is_basic_latin(c: char) -> bool {
    (c as u32) <= 0x7F
}

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

fn is_spanish_marker(c: char) -> bool {
    c.to_lowercase()
        .any(|l| matches!(l, 'á' | 'é' | 'í' | 'ó' | 'ú' | 'ü' | 'ñ' | '¿' | '¡'))
}

/// Latin-1 Supplement letters and Latin Extended-A/B.
fn is_latin_letter(c: char) -> bool {
    matches!(c as u32, 0x00C0..=0x024F) && c != '×' && c != '÷'
}

/// Detect a coarse language code for `text`.
///
/// Order: ASCII-only → `en`; any Devanagari → `hi`; any Spanish diacritic or
/// inverted punctuation → `es`; every remaining non-ASCII letter is Latin
/// script → `en`; otherwise `other`.
pub fn detect(text: &str) -> &'static str {
    if text.chars().all(is_basic_latin) {
        return "en";
    }
    if text.chars().any(is_devanagari) {
        return "hi";
    }
    if text.chars().any(is_spanish_marker) {
        return "es";
    }
    let latin_only = text
        .chars()
        .filter(|c| !is_basic_latin(*c) && c.is_alphabetic())
        .all(is_latin_letter);
    if latin_only {
        "en"
    } else {
        "other"
    }
}

/// Human-readable name for a detected code.
pub fn display_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "hi" => "Hindi",
        "other" => "Other",
        other => other,
    }
}
