//! Supplementary metadata decoded from a file-name suffix.
//!
//! A suffix such as `fwE` encodes formality (`i`/`f`), mode (`s`/`w`) and
//! elicitation language (`D`, `E`, `G`, `R`, `T`). Fields nothing can derive
//! yet are written as placeholders.

use tracing::warn;

/// Written when a suffix position holds an unknown letter or is absent.
pub const INVALID_DIGIT: &str = "<INVALID DIGIT>";

/// Written for fields that are filled in later by hand.
pub const NO_VALUE: &str = "<NO VALUE>";

/// Minimum length of a well-formed suffix.
pub const SUFFIX_LEN: usize = 3;

/// Supplementary field names, in output order.
pub const SUPPLEMENTARY_FIELDS: [&str; 6] = [
    "formality",
    "mode",
    "elicitation-order",
    "elicitation-language",
    "transcriber-id",
    "elicitator-id",
];

fn formality(letter: Option<char>) -> &'static str {
    match letter {
        Some('i') => "informal",
        Some('f') => "formal",
        _ => INVALID_DIGIT,
    }
}

fn mode(letter: Option<char>) -> &'static str {
    match letter {
        Some('s') => "spoken",
        Some('w') => "written",
        _ => INVALID_DIGIT,
    }
}

fn elicitation_language(letter: Option<char>) -> &'static str {
    match letter {
        Some('D') => "German",
        Some('E') => "English",
        Some('G') => "Greek",
        Some('R') => "Russian",
        Some('T') => "Turkish",
        _ => INVALID_DIGIT,
    }
}

/// Decode `suffix` into the six supplementary `(field, value)` pairs.
///
/// `code` only serves the warning for short suffixes.
pub fn decode_suffix(suffix: &str, code: Option<&str>) -> Vec<(&'static str, String)> {
    if suffix.chars().count() < SUFFIX_LEN {
        warn!(suffix, code = code.unwrap_or(""), "File suffix is not a valid suffix");
    }

    let mut letters = suffix.chars();
    let (first, second, third) = (letters.next(), letters.next(), letters.next());

    let values = [
        formality(first),
        mode(second),
        NO_VALUE,
        elicitation_language(third),
        NO_VALUE,
        NO_VALUE,
    ];
    for (field, value) in SUPPLEMENTARY_FIELDS.iter().zip(values) {
        if value == INVALID_DIGIT {
            warn!(suffix, field, code = code.unwrap_or(""), "Unrecognised suffix letter");
        }
    }

    SUPPLEMENTARY_FIELDS
        .into_iter()
        .zip(values.map(String::from))
        .collect()
}
