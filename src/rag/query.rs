//! Question text normalization applied before the search call.

use std::sync::LazyLock;

static INVISIBLE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F\x{200B}-\x{200D}\x{2060}\x{FEFF}]")
        .expect("invisible char regex is valid")
});
static WHITESPACE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\s+").expect("whitespace regex is valid")
});
static REPEATED_PUNCT_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\?{2,}|!{2,}|¿{2,}|¡{2,}").expect("punctuation regex is valid")
});

/// Normalizes a raw question into the string sent as the search query.
///
/// Strips control and zero-width characters, collapses whitespace runs to a
/// single space, trims, and squeezes repeated `?`, `!`, `¿`, `¡`. Never fails;
/// the result may be empty.
pub fn preprocess_query(raw: &str) -> String {
    let visible = INVISIBLE_RE.replace_all(raw, "");
    let spaced = WHITESPACE_RE.replace_all(&visible, " ");
    let squeezed = REPEATED_PUNCT_RE.replace_all(spaced.trim(), |caps: &regex::Captures| {
        caps[0].chars().next().map(String::from).unwrap_or_default()
    });
    squeezed.into_owned()
}
