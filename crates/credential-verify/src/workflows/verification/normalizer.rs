const EDGE_PUNCTUATION: [char; 4] = ['.', ',', ';', ':'];

/// Strip OCR artefacts around a captured value and collapse internal whitespace runs.
pub(crate) fn clean_capture(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c))
        .to_string()
}

/// A cleaned capture is only usable when it carries more than one character.
pub(crate) fn accept_capture(value: &str) -> Option<String> {
    let cleaned = clean_capture(value);
    (cleaned.chars().count() > 1).then_some(cleaned)
}

/// Unify line endings so line-anchored patterns behave the same on CRLF scans.
pub(crate) fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
