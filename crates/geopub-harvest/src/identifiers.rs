use once_cell::sync::Lazy;
use regex::Regex;

static DOI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+").expect("DOI regex is valid")
});

/// Scan identifier candidates for a DOI. First match wins, in candidate
/// order.
pub fn extract_doi<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .find_map(|value| DOI_RE.find(value).map(|m| m.as_str().to_string()))
}

/// Normalize a DOI for lookups: lowercase, without any `doi.org` prefix.
pub fn normalize_doi(doi: &str) -> String {
    let mut value = doi.trim().to_lowercase();
    for prefix in ["https://doi.org/", "http://doi.org/", "doi.org/"] {
        if let Some(rest) = value.strip_prefix(prefix) {
            value = rest.to_string();
            break;
        }
    }
    value
}

/// Scan candidates for an ISSN-looking token: eight digits once hyphens
/// are stripped. Returns the digits. First match wins.
pub fn extract_issn<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    for value in candidates {
        for token in value.split_whitespace() {
            let stripped: String = token.chars().filter(|c| *c != '-').collect();
            if stripped.len() == 8 && stripped.chars().all(|c| c.is_ascii_digit()) {
                return Some(stripped);
            }
        }
    }
    None
}
