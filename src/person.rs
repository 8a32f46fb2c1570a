use crate::resolve::PersonResolver;
use crate::types::Person;

const HONORIFICS: &[&str] = &["dr", "prof", "professor", "mr", "mrs", "ms", "mx", "sir"];
const DEGREES: &[&str] = &["phd", "ph.d", "md", "msc", "bsc", "ma", "ba", "mba", "dphil"];
const PARTICLES: &[&str] = &[
    "van", "von", "de", "der", "den", "da", "di", "du", "del", "della", "dos", "la", "le", "ter",
];

/// Longer segments are prose, not names.
const MAX_NAME_WORDS: usize = 6;

/// Heuristic person-name parser used when no external resolver is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameParser;

impl PersonResolver for NameParser {
    fn resolve_person(&self, text: &str) -> Person {
        parse_name(text)
    }
}

/// Parse "Given Middle Family" or "Family, Given" into a Person.
/// Returns a Person without family names when the text is not a name.
pub fn parse_name(text: &str) -> Person {
    let cleaned = text
        .trim()
        .trim_matches(|c: char| matches!(c, '*' | '†' | '‡' | '§' | '¶' | '.' | ';' | ':'));

    if let Some((family, given)) = cleaned.split_once(',') {
        let family = words(family);
        let given = words(given);
        if family.is_empty() || !all_name_words(&family) || !all_name_words(&given) {
            return Person::default();
        }
        return Person {
            given_names: given,
            family_names: vec![family.join(" ")],
            affiliations: Vec::new(),
        };
    }

    let mut tokens = words(cleaned);
    while tokens.first().is_some_and(|t| is_one_of(t, HONORIFICS)) {
        tokens.remove(0);
    }
    while tokens.len() > 1 && tokens.last().is_some_and(|t| is_one_of(t, DEGREES)) {
        tokens.pop();
    }
    if tokens.is_empty() || tokens.len() > MAX_NAME_WORDS || !all_name_words(&tokens) {
        return Person::default();
    }
    if tokens[0].starts_with(char::is_lowercase) {
        return Person::default();
    }

    let mut split = tokens.len() - 1;
    while split > 1 && is_one_of(&tokens[split - 1], PARTICLES) {
        split -= 1;
    }
    let family = tokens[split..].join(" ");
    let given = tokens[..split].to_vec();
    Person {
        given_names: given,
        family_names: vec![family],
        affiliations: Vec::new(),
    }
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(',').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn is_one_of(token: &str, list: &[&str]) -> bool {
    let lower = token.trim_end_matches('.').to_lowercase();
    list.contains(&lower.as_str())
}

/// Every word has a letter and contains only letters, marks, dots,
/// apostrophes and hyphens.
fn all_name_words(tokens: &[String]) -> bool {
    tokens.iter().all(|t| {
        t.chars().any(char::is_alphabetic)
            && t.chars()
                .all(|c| c.is_alphabetic() || matches!(c, '.' | '\'' | '’' | '-'))
    })
}
