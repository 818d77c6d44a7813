//! Text normalization shared by indexing and querying.
//!
//! Every string that enters a [`PrefixIndex`](super::PrefixIndex) and every
//! query against it goes through [`normalize`]. If the two sides ever
//! disagree, lookups silently miss, so there is exactly one entry point.
//!
//! Normalization:
//! - Canonical decomposition (NFD), then Unicode lowercase
//! - Combining marks dropped, so precomposed and decomposed input agree for
//!   every accented letter (`é`, `ễ`, `ǘ` all lose their marks)
//! - Letters with no decomposition folded by hand (`ß` → `ss`, `ł` → `l`)
//! - Whitespace runs collapsed to one space, leading/trailing whitespace trimmed

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalizes text for indexing or querying.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.nfd().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if is_combining_mark(c) {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        match fold(c) {
            Folded::One(base) => out.push(base),
            Folded::Two(a, b) => {
                out.push(a);
                out.push(b);
            }
        }
    }

    out
}

/// Splits text into normalized words.
///
/// Separators are whitespace and ASCII punctuation. Used when word-level
/// prefix indexing is enabled.
#[must_use]
pub fn words(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

enum Folded {
    One(char),
    Two(char, char),
}

/// Folds a lowercase letter that has no canonical decomposition.
fn fold(c: char) -> Folded {
    let base = match c {
        'đ' => 'd',
        'ħ' => 'h',
        'ı' => 'i',
        'ŀ' | 'ł' => 'l',
        'ø' => 'o',
        'ŧ' => 't',
        'ß' => return Folded::Two('s', 's'),
        'æ' => return Folded::Two('a', 'e'),
        'œ' => return Folded::Two('o', 'e'),
        other => other,
    };
    Folded::One(base)
}
