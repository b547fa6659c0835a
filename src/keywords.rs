//! Domain keyword extraction for the broadest (and last) match strategy.
//!
//! Scans a title/body pair against a fixed vocabulary of security, defect and
//! performance terms. Vocabulary order is the sort order: higher-signal
//! terms come first, so truncation keeps the most discriminating keywords.

/// Default keyword bound; overridable via `DUPGATE_KEYWORD_LIMIT`.
pub const DEFAULT_LIMIT: usize = 5;

// Ordered by signal strength. Matching is case-insensitive containment, so
// "CVE-2024-0001" hits "cve" and "SQL injection" hits both "sql" and
// "injection".
const VOCABULARY: &[&str] = &[
    "security",
    "vulnerability",
    "cve",
    "exploit",
    "injection",
    "sql",
    "xss",
    "csrf",
    "overflow",
    "hardcoded",
    "secret",
    "credential",
    "unsafe",
    "panic",
    "crash",
    "deadlock",
    "race",
    "leak",
    "corruption",
    "regression",
    "timeout",
    "performance",
    "latency",
    "memory",
    "throughput",
];

/// Extract up to `limit` vocabulary keywords appearing in `title` or `body`.
///
/// Returns an ordered, deduplicated set. Empty output means the keyword
/// strategy is inapplicable for this report; callers skip it, it is not an
/// error.
pub fn extract(title: &str, body: &str, limit: usize) -> Vec<String> {
    let haystack = format!("{} {}", title, body).to_lowercase();
    VOCABULARY
        .iter()
        .filter(|term| haystack.contains(*term))
        .take(limit)
        .map(|term| term.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_security_terms() {
        let keywords = extract(
            "Security vulnerability",
            "SQL injection found in login",
            DEFAULT_LIMIT,
        );
        assert!(keywords.len() <= 5);
        for expected in ["security", "vulnerability", "sql", "injection"] {
            assert!(
                keywords.contains(&expected.to_string()),
                "missing {:?} in {:?}",
                expected,
                keywords
            );
        }
    }

    #[test]
    fn test_respects_limit() {
        let text = "security vulnerability cve exploit injection sql xss csrf";
        let keywords = extract(text, "", 3);
        assert_eq!(keywords.len(), 3);
        // Vocabulary order: highest-signal terms survive truncation
        assert_eq!(keywords, vec!["security", "vulnerability", "cve"]);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let a = extract("Memory leak in parser", "heap grows without bound", 5);
        let b = extract("Memory leak in parser", "heap grows without bound", 5);
        assert_eq!(a, b);
        assert_eq!(a, vec!["leak", "memory"]);
    }

    #[test]
    fn test_case_insensitive() {
        let keywords = extract("CVE-2024-0001 DETECTED", "", 5);
        assert_eq!(keywords, vec!["cve"]);
    }

    #[test]
    fn test_no_vocabulary_match_is_empty() {
        let keywords = extract("Bump dependency versions", "routine maintenance", 5);
        assert!(keywords.is_empty());
    }

    #[test]
    fn test_deduplicates_repeated_terms() {
        let keywords = extract("timeout timeout timeout", "another timeout", 5);
        assert_eq!(keywords, vec!["timeout"]);
    }
}
