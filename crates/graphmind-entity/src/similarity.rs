//! Name similarity shared by the resolver and the merge engine.
//!
//! Two layers:
//! - [`levenshtein_similarity`]: `1 - distance / max(len)` over characters.
//! - [`calculate_similarity`]: a hybrid of token matching (70%) and
//!   character similarity (30%) over normalized names, tolerant of
//!   honorifics, suffixes, initials and small typos.

use strsim::levenshtein;

/// Leading titles dropped during normalization.
const HONORIFICS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "miss", "mx", "prof", "professor", "sir", "dame", "rev", "hon",
    "capt", "col", "gen", "lt", "sgt",
];

/// Trailing generational, academic and corporate suffixes dropped during normalization.
const SUFFIXES: &[&str] = &[
    "jr", "sr", "ii", "iii", "iv", "phd", "md", "esq", "inc", "llc", "ltd", "corp", "co", "plc",
    "gmbh",
];

const TOKEN_WEIGHT: f64 = 0.7;
const CHAR_WEIGHT: f64 = 0.3;

const ABBREVIATION_SCORE: f64 = 0.9;
const SUBSTRING_SCORE: f64 = 0.8;

/// Character-level similarity in `[0, 1]`.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Lowercase, replace punctuation with spaces, collapse whitespace, then drop
/// leading honorifics and trailing suffixes. If stripping would leave nothing
/// the unstripped tokens are kept.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();

    let mut start = 0;
    let mut end = tokens.len();
    while start < end && HONORIFICS.contains(&tokens[start]) {
        start += 1;
    }
    while end > start && SUFFIXES.contains(&tokens[end - 1]) {
        end -= 1;
    }

    if start == end {
        tokens.join(" ")
    } else {
        tokens[start..end].join(" ")
    }
}

/// Score two single tokens, `None` if no rule applies.
fn token_match_score(a: &str, b: &str) -> Option<f64> {
    if a == b {
        return Some(1.0);
    }

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    let long_len = long.chars().count();

    // Initial: "j" vs "john"
    if short_len == 1 && long.starts_with(short) {
        return Some(ABBREVIATION_SCORE);
    }

    if short_len >= 3 && long.contains(short) {
        return Some(SUBSTRING_SCORE);
    }

    if short_len >= 4 {
        let allowed = if long_len <= 6 { 1 } else { 2 };
        if levenshtein(short, long) <= allowed {
            return Some(levenshtein_similarity(short, long));
        }
    }

    None
}

/// Token overlap score in `[0, 1]`. Each token on either side is matched at
/// most once; the sum of match scores is divided by the longer token count.
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let a_tokens: Vec<&str> = a.split_whitespace().collect();
    let b_tokens: Vec<&str> = b.split_whitespace().collect();
    let denominator = a_tokens.len().max(b_tokens.len());
    if denominator == 0 {
        return 0.0;
    }

    let mut used = vec![false; b_tokens.len()];
    let mut total = 0.0;

    for a_token in &a_tokens {
        let best = b_tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| !used[*i])
            .filter_map(|(i, b_token)| token_match_score(a_token, b_token).map(|s| (i, s)))
            .max_by(|x, y| x.1.total_cmp(&y.1));

        if let Some((i, score)) = best {
            used[i] = true;
            total += score;
        }
    }

    total / denominator as f64
}

/// Hybrid name similarity in `[0, 1]`.
///
/// Exact string equality, or equality after normalization, scores 1.0.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a_norm = normalize_name(a);
    let b_norm = normalize_name(b);
    if a_norm.is_empty() || b_norm.is_empty() {
        return 0.0;
    }
    if a_norm == b_norm {
        return 1.0;
    }

    let token_score = token_similarity(&a_norm, &b_norm);
    let char_score = levenshtein_similarity(&a_norm, &b_norm);

    TOKEN_WEIGHT * token_score + CHAR_WEIGHT * char_score
}
