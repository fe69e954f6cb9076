// src/matching/address.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::{
    NUMBER_MATCH_BONUS, STREET_NAME_BONUS_THRESHOLD, STREET_NAME_MATCH_BONUS,
    STREET_TYPE_MATCH_BONUS,
};
use crate::matching::text::ratio;

// Token emitted in front of a street number that was explicitly tagged ("nº 12")
const NUMBER_TAG: &str = "numero";

// Applied in this order to punctuation-free lowercase text. No expansion may be
// matched by any pattern, otherwise normalization stops being idempotent.
const ABBREVIATIONS: [(&str, &str); 27] = [
    (r"\bs\s+n\b", " sem numero "),
    (r"\bn(?:o|um|umero)?\s*(\d+)", " numero ${1} "),
    (r"\b(?:av|avda|avn)\b", " avenida "),
    (r"\br\b", " rua "),
    (r"\bal\b", " alameda "),
    (r"\b(?:tv|trav)\b", " travessa "),
    (r"\b(?:pc|pca)\b", " praca "),
    (r"\brod\b", " rodovia "),
    (r"\b(?:est|estr)\b", " estrada "),
    (r"\blgo\b", " largo "),
    (r"\b(?:ap|apt|apto)\b", " apartamento "),
    (r"\bbl\b", " bloco "),
    (r"\b(?:cj|conj)\b", " conjunto "),
    (r"\bqd\b", " quadra "),
    (r"\blt\b", " lote "),
    (r"\bcs\b", " casa "),
    (r"\bsl\b", " sala "),
    (r"\blj\b", " loja "),
    (r"\b(?:ed|edif)\b", " edificio "),
    (r"\bcond\b", " condominio "),
    (r"\bjd\b", " jardim "),
    (r"\bvl\b", " vila "),
    (r"\bpq\b", " parque "),
    (r"\bdr\b", " doutor "),
    (r"\bprof\b", " professor "),
    (r"\bsta\b", " santa "),
    (r"\bsto\b", " santo "),
];

static ABBREVIATION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    ABBREVIATIONS
        .iter()
        .filter_map(|(pattern, replacement)| match Regex::new(pattern) {
            Ok(regex) => Some((regex, *replacement)),
            Err(e) => {
                log::error!("Invalid abbreviation pattern {}: {}", pattern, e);
                None
            }
        })
        .collect()
});

// Separates a number from letters glued after it ("12a" -> "12 a"), so a
// number tag right behind a number ("n0n0") is on a word boundary
static DIGIT_LETTER: Lazy<Option<Regex>> = Lazy::new(|| match Regex::new(r"(\d)([^\W\d_])") {
    Ok(regex) => Some(regex),
    Err(e) => {
        log::error!("Invalid digit/letter pattern: {}", e);
        None
    }
});

// Upper bound on dictionary passes; one pass is normally enough
const MAX_EXPANSION_PASSES: usize = 4;

const STREET_TYPES: [&str; 12] = [
    "rua", "avenida", "alameda", "travessa", "praca", "rodovia", "estrada", "largo", "viela",
    "beco", "via", "servidao",
];

/// Structured pieces of a normalized street address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub street_type: Option<String>,
    pub street_name: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
}

/// Normalize free text by:
/// - Converting to lowercase
/// - Decomposing Unicode and dropping accents
/// - Replacing punctuation with spaces
/// - Expanding street-type and unit abbreviations
/// - Collapsing whitespace
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();

    // NFKD can produce uppercase compatibility forms, hence the second pass
    let unaccented = lower
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let mut normalized = unaccented
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>();
    if let Some(regex) = DIGIT_LETTER.as_ref() {
        normalized = regex.replace_all(&normalized, "$1 $2").into_owned();
    }
    normalized = collapse_whitespace(&normalized);

    // Run the dictionary until nothing changes, so normalizing the output
    // again is a no-op
    for _ in 0..MAX_EXPANSION_PASSES {
        let expanded = expand_abbreviations(&normalized);
        if expanded == normalized {
            break;
        }
        normalized = expanded;
    }
    normalized
}

fn expand_abbreviations(text: &str) -> String {
    let mut expanded = text.to_string();
    for (regex, replacement) in ABBREVIATION_PATTERNS.iter() {
        if regex.is_match(&expanded) {
            expanded = regex.replace_all(&expanded, *replacement).into_owned();
        }
    }
    collapse_whitespace(&expanded)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_number_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn join_tokens(tokens: &[&str]) -> Option<String> {
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Splits an address into street type, street name, number and complement.
pub fn extract_components(address: &str) -> AddressComponents {
    let normalized = normalize(address);
    let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();

    let type_idx = tokens.iter().position(|t| STREET_TYPES.contains(t));

    // A number tagged by the abbreviation step wins over any bare number
    let tagged_idx = tokens
        .windows(2)
        .position(|w| w[0] == NUMBER_TAG && is_number_token(w[1]))
        .map(|i| i + 1);
    let number_idx = tagged_idx.or_else(|| tokens.iter().position(|t| is_number_token(t)));

    let name_start = type_idx.map_or(0, |i| i + 1);
    let name_end = match number_idx {
        Some(n) if n >= name_start => {
            if tagged_idx == Some(n) {
                n - 1
            } else {
                n
            }
        }
        _ => tokens.len(),
    };
    let street_name = if name_end > name_start {
        join_tokens(&tokens[name_start..name_end])
    } else {
        None
    };

    let complement = number_idx.and_then(|n| join_tokens(&tokens[n + 1..]));

    AddressComponents {
        street_type: type_idx.map(|i| tokens[i].to_string()),
        street_name,
        number: number_idx.map(|i| tokens[i].to_string()),
        complement,
    }
}

/// Similarity of two free-text addresses in [0, 1].
///
/// Identical normalized forms score 1.0. Otherwise the edit-distance ratio of
/// the normalized strings is topped up with bounded bonuses for a matching
/// street number, street type and street name.
pub fn address_similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize(a);
    let norm_b = normalize(b);
    if norm_a == norm_b {
        return 1.0;
    }

    let mut score = ratio(&norm_a, &norm_b);

    let comp_a = extract_components(a);
    let comp_b = extract_components(b);

    if let (Some(n1), Some(n2)) = (&comp_a.number, &comp_b.number) {
        if n1 == n2 {
            score += NUMBER_MATCH_BONUS;
        }
    }
    if let (Some(t1), Some(t2)) = (&comp_a.street_type, &comp_b.street_type) {
        if t1 == t2 {
            score += STREET_TYPE_MATCH_BONUS;
        }
    }
    if let (Some(s1), Some(s2)) = (&comp_a.street_name, &comp_b.street_name) {
        if ratio(s1, s2) > STREET_NAME_BONUS_THRESHOLD {
            score += STREET_NAME_MATCH_BONUS;
        }
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_expands_and_strips() {
        assert_eq!(normalize("Av. Paulista, 1000"), "avenida paulista 1000");
        assert_eq!(normalize("R. das Flores, 123"), "rua das flores 123");
        assert_eq!(
            normalize("Praça da Sé, nº 10 - Apto 52"),
            "praca da se numero 10 apartamento 52"
        );
        assert_eq!(normalize("  Rua   São   João  "), "rua sao joao");
        assert_eq!(normalize("Estrada s/n"), "estrada sem numero");
    }

    #[test]
    fn normalize_is_idempotent_on_known_inputs() {
        for input in [
            "Av. Brig. Faria Lima, nº 3.477 - 14º andar",
            "R_x Flores",
            "a.v Paulista",
            "Rua 25 de Março no 100",
            "Travessa s/n, Qd 3 Lt 12",
            "n0n0",
            "no1n2 s n3",
            "Rua 12a, casa 3b",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input}");
        }
    }

    #[test]
    fn glued_number_tags_are_all_expanded() {
        assert_eq!(normalize("n0n0"), "numero 0 numero 0");
        assert_eq!(normalize("Lote 12b"), "lote 12 b");
    }

    #[test]
    fn components_prefer_tagged_number() {
        let comps = extract_components("Rua 25 de Março, nº 100, apto 12");
        assert_eq!(comps.street_type.as_deref(), Some("rua"));
        assert_eq!(comps.number.as_deref(), Some("100"));
        assert_eq!(comps.street_name.as_deref(), Some("25 de marco"));
        assert_eq!(comps.complement.as_deref(), Some("apartamento 12"));
    }

    #[test]
    fn components_with_bare_number() {
        let comps = extract_components("Av. Paulista, 1000 - Bela Vista");
        assert_eq!(comps.street_type.as_deref(), Some("avenida"));
        assert_eq!(comps.street_name.as_deref(), Some("paulista"));
        assert_eq!(comps.number.as_deref(), Some("1000"));
        assert_eq!(comps.complement.as_deref(), Some("bela vista"));
    }

    #[test]
    fn components_without_number_or_type() {
        let comps = extract_components("Estrada Velha");
        assert_eq!(comps.street_type.as_deref(), Some("estrada"));
        assert_eq!(comps.street_name.as_deref(), Some("velha"));
        assert_eq!(comps.number, None);
        assert_eq!(comps.complement, None);

        let comps = extract_components("Condomínio Solar 45");
        assert_eq!(comps.street_type, None);
        assert_eq!(comps.street_name.as_deref(), Some("condominio solar"));
        assert_eq!(comps.number.as_deref(), Some("45"));
    }

    #[test]
    fn abbreviated_and_full_addresses_match() {
        let sim = address_similarity("Rua das Flores, 123", "R. das Flores, 123");
        assert!(sim > 0.9, "similarity was {sim}");
    }

    #[test]
    fn number_bonus_lifts_near_matches() {
        let same_number = address_similarity("Rua das Flores, 123", "Rua das Flores, 123 casa 2");
        let other_number = address_similarity("Rua das Flores, 123", "Rua das Flores, 321 casa 2");
        assert!(same_number > other_number);
        assert!(same_number <= 1.0);
    }

    #[test]
    fn unrelated_addresses_score_low() {
        let sim = address_similarity("Rua das Flores, 123", "Avenida Brasil, 4500");
        assert!(sim < 0.6, "similarity was {sim}");
    }
}
