use once_cell::sync::Lazy;
use regex::Regex;

/// Ordinal / bullet prefix at the start of a bibliography entry:
/// [1], (1), 1., 1), plus stray bullets and dashes.
/// Bare-number variants require trailing whitespace to keep "2024.5" intact.
static ORDINAL_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\[\d{1,4}\]|\(\d{1,4}\)|\d{1,4}[.)](?:\s|$)|[•·*–—-](?:\s|$))\s*").unwrap()
});

/// DOI, optionally introduced by "DOI:" or a doi.org URL.
static DOI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:doi:\s*|https?://(?:dx\.)?doi\.org/)?(10\.\d{4,9}/[^\s,;]+)").unwrap()
});

/// Numeric citation marker preceded by whitespace: " [3]", " [4, 5]", " [2-4]".
pub(crate) static NUMERIC_CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\s)\[(\d{1,4}(?:\s*[,;–-]\s*\d{1,4})*)\]").unwrap()
});

/// Ranges spanning more entries than this are left alone.
const MAX_RANGE: usize = 50;

/// Strip a leading ordinal or punctuation prefix from a reference entry.
pub fn strip_ordinal(text: &str) -> &str {
    match ORDINAL_PREFIX_RE.find(text) {
        Some(m) => text[m.end()..].trim(),
        None => text.trim(),
    }
}

/// Find the first DOI in a reference, without any "doi:" / URL prefix.
pub fn find_doi(text: &str) -> Option<String> {
    let caps = DOI_RE.captures(text)?;
    let doi = caps[1].trim_end_matches(|c: char| ".)]}>".contains(c));
    Some(doi.to_string())
}

/// Expand the inside of a numeric citation marker into 1-based entry
/// numbers: "3" -> [3], "4, 5" -> [4, 5], "2-4" -> [2, 3, 4].
pub fn parse_citation_numbers(inner: &str) -> Option<Vec<usize>> {
    static PART_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\d{1,4})(?:\s*[–-]\s*(\d{1,4}))?$").unwrap());

    let mut numbers = Vec::new();
    for part in inner.split([',', ';']) {
        let caps = PART_RE.captures(part.trim())?;
        let start: usize = caps[1].parse().ok()?;
        let end: usize = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => start,
        };
        if start == 0 || end < start || end - start > MAX_RANGE {
            return None;
        }
        numbers.extend(start..=end);
    }
    if numbers.is_empty() { None } else { Some(numbers) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ordinal_prefixes() {
        assert_eq!(strip_ordinal("[12] Smith, J. Title."), "Smith, J. Title.");
        assert_eq!(strip_ordinal("(3) Smith"), "Smith");
        assert_eq!(strip_ordinal("4. Smith"), "Smith");
        assert_eq!(strip_ordinal("• Smith"), "Smith");
        assert_eq!(strip_ordinal("  Smith 2001. "), "Smith 2001.");
        assert_eq!(strip_ordinal("2024.5 is not a marker"), "2024.5 is not a marker");
    }

    #[test]
    fn finds_dois_in_various_forms() {
        assert_eq!(
            find_doi("Smith J. A study. Nature. 2001. doi:10.1038/nature123.").as_deref(),
            Some("10.1038/nature123")
        );
        assert_eq!(
            find_doi("See https://doi.org/10.1000/xyz-1_2 for details").as_deref(),
            Some("10.1000/xyz-1_2")
        );
        assert_eq!(
            find_doi("(DOI: 10.48550/arXiv.2101.00001)").as_deref(),
            Some("10.48550/arXiv.2101.00001")
        );
        assert_eq!(find_doi("No identifier here, 2001"), None);
    }

    #[test]
    fn parses_citation_numbers() {
        assert_eq!(parse_citation_numbers("3"), Some(vec![3]));
        assert_eq!(parse_citation_numbers("4, 5"), Some(vec![4, 5]));
        assert_eq!(parse_citation_numbers("1;7"), Some(vec![1, 7]));
        assert_eq!(parse_citation_numbers("2-4"), Some(vec![2, 3, 4]));
        assert_eq!(parse_citation_numbers("2–4, 9"), Some(vec![2, 3, 4, 9]));
        assert_eq!(parse_citation_numbers("0"), None);
        assert_eq!(parse_citation_numbers("5-2"), None);
        assert_eq!(parse_citation_numbers("1-500"), None);
    }

    #[test]
    fn citation_marker_needs_leading_whitespace() {
        assert!(NUMERIC_CITATION_RE.is_match("See [1]."));
        assert!(!NUMERIC_CITATION_RE.is_match("array[1]"));
        let caps = NUMERIC_CITATION_RE.captures("and [2,3].").unwrap();
        assert_eq!(&caps[2], "2,3");
    }
}
