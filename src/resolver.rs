// Index code -> ordered provider symbols
use crate::model::IndexSpec;

/// Exchange suffixes stripped from codes such as `000300.SH`.
const MARKET_SUFFIXES: [&str; 2] = [".sh", ".sz"];

/// Exchange prefixes, in the order they are tried.
const MARKET_PREFIXES: [&str; 2] = ["sh", "sz"];

/// Builds the ordered, duplicate-free list of symbols to try for `code`.
///
/// The code as given comes first, then the suffix-stripped code, then the
/// stripped code with each market prefix when it has none. A bare six digit
/// code is ambiguous between exchanges, so its prefixed forms move to the front.
pub fn resolve_candidates(code: &str) -> Vec<String> {
    let code = code.trim();
    if code.is_empty() {
        return vec![code.to_string()];
    }
    let stripped = strip_market_suffix(code);

    let mut candidates = vec![code.to_string(), stripped.to_string()];
    let prefixed: Vec<String> = if has_market_prefix(stripped) {
        Vec::new()
    } else {
        MARKET_PREFIXES
            .iter()
            .map(|prefix| format!("{}{}", prefix, stripped))
            .collect()
    };
    candidates.extend(prefixed.iter().cloned());

    let mut candidates = dedup_preserving_order(candidates);

    if is_bare_six_digits(code) {
        candidates.retain(|c| !prefixed.contains(c));
        let mut promoted = prefixed;
        promoted.append(&mut candidates);
        candidates = promoted;
    }

    candidates
}

/// Resolved candidates for a configured index, followed by its aliases.
pub fn candidates_for(spec: &IndexSpec) -> Vec<String> {
    let mut candidates = resolve_candidates(&spec.code);
    candidates.extend(
        spec.aliases
            .iter()
            .map(|alias| alias.trim().to_string())
            .filter(|alias| !alias.is_empty()),
    );
    dedup_preserving_order(candidates)
}

fn strip_market_suffix(code: &str) -> &str {
    let lower = code.to_ascii_lowercase();
    for suffix in MARKET_SUFFIXES {
        if lower.ends_with(suffix) && lower.len() > suffix.len() {
            return &code[..code.len() - suffix.len()];
        }
    }
    code
}

fn has_market_prefix(code: &str) -> bool {
    let lower = code.to_ascii_lowercase();
    MARKET_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

fn is_bare_six_digits(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

fn dedup_preserving_order(candidates: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}
