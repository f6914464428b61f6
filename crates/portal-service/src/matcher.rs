use std::collections::HashSet;
use strsim::normalized_levenshtein;

/// Fixed, read-only set of authorized plate identifiers. Loaded once at
/// startup; entry order is kept for deterministic fuzzy tie-breaking.
#[derive(Debug, Clone)]
pub struct AllowList {
    entries: Vec<String>,
    exact: HashSet<String>,
}

impl AllowList {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let entries: Vec<String> = entries.into_iter().collect();
        let exact = entries.iter().cloned().collect();
        Self { entries, exact }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.exact.contains(candidate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// The allow-list entry the decision settled on, if any
    pub number: Option<String>,
    pub authorized: bool,
}

impl MatchOutcome {
    fn none() -> Self {
        Self {
            number: None,
            authorized: false,
        }
    }
}

/// Reconcile an ordered candidate list against the allow-list.
///
/// Exact pass first: the earliest candidate that verbatim-equals an entry
/// wins outright. Only when no candidate is exact does the fuzzy fallback
/// run, taking the first candidate whose closest entry (normalized
/// Levenshtein) reaches `min_similarity`. Candidates are already
/// confidence-ranked, so first-success is the best available evidence
/// without scoring the full candidate x entry matrix.
pub fn match_candidates(
    candidates: &[String],
    allow_list: &AllowList,
    min_similarity: f64,
) -> MatchOutcome {
    for candidate in candidates {
        if allow_list.contains(candidate) {
            return MatchOutcome {
                number: Some(candidate.clone()),
                authorized: true,
            };
        }
    }

    for candidate in candidates {
        let mut best: Option<(&str, f64)> = None;
        for entry in allow_list.iter() {
            let score = normalized_levenshtein(candidate, entry);
            // Strictly-greater keeps the earliest entry on ties
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((entry, score));
            }
        }
        if let Some((entry, score)) = best {
            if score >= min_similarity {
                return MatchOutcome {
                    number: Some(entry.to_string()),
                    authorized: true,
                };
            }
        }
    }

    MatchOutcome::none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_allow_list() -> AllowList {
        AllowList::new(
            ["М222ММ136", "А123ВС77", "К456ЕК99"]
                .iter()
                .map(|s| s.to_string()),
        )
    }

    fn candidates(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_allow_list_len() {
        let allow_list = fixture_allow_list();
        assert_eq!(allow_list.len(), 3);
        assert!(!allow_list.is_empty());
        assert!(AllowList::new(Vec::new()).is_empty());
    }

    #[test]
    fn test_exact_match_wins() {
        let outcome = match_candidates(&candidates(&["А123ВС77"]), &fixture_allow_list(), 0.0);
        assert!(outcome.authorized);
        assert_eq!(outcome.number.as_deref(), Some("А123ВС77"));
    }

    #[test]
    fn test_exact_beats_fuzzy_regardless_of_rank() {
        // First candidate is one edit away from an entry, second is verbatim.
        // Exact always wins over fuzzy.
        let outcome = match_candidates(
            &candidates(&["М222ММ137", "К456ЕК99"]),
            &fixture_allow_list(),
            0.0,
        );
        assert_eq!(outcome.number.as_deref(), Some("К456ЕК99"));
    }

    #[test]
    fn test_earlier_exact_beats_later_exact() {
        let outcome = match_candidates(
            &candidates(&["К456ЕК99", "А123ВС77"]),
            &fixture_allow_list(),
            0.0,
        );
        assert_eq!(outcome.number.as_deref(), Some("К456ЕК99"));
    }

    #[test]
    fn test_fuzzy_fallback_picks_closest_entry() {
        let outcome = match_candidates(&candidates(&["М222ММ13"]), &fixture_allow_list(), 0.0);
        assert!(outcome.authorized);
        assert_eq!(outcome.number.as_deref(), Some("М222ММ136"));
    }

    #[test]
    fn test_fuzzy_fallback_uses_first_candidate() {
        // Both candidates resolve in the fuzzy pass; the earlier-ranked one decides
        let outcome = match_candidates(
            &candidates(&["А123ВС7", "К456ЕК9"]),
            &fixture_allow_list(),
            0.0,
        );
        assert_eq!(outcome.number.as_deref(), Some("А123ВС77"));
    }

    #[test]
    fn test_zero_cutoff_matches_anything() {
        // The permissive default reports a closest entry even for garbage
        let outcome = match_candidates(&candidates(&["ЕЕЕЕ"]), &fixture_allow_list(), 0.0);
        assert!(outcome.authorized);
        assert!(outcome.number.is_some());
    }

    #[test]
    fn test_similarity_threshold_rejects_garbage() {
        let outcome = match_candidates(&candidates(&["ЕЕЕЕ"]), &fixture_allow_list(), 0.6);
        assert!(!outcome.authorized);
        assert!(outcome.number.is_none());
    }

    #[test]
    fn test_similarity_threshold_keeps_near_miss() {
        // One dropped character is still well above 0.6 similarity
        let outcome = match_candidates(&candidates(&["М222ММ13"]), &fixture_allow_list(), 0.6);
        assert!(outcome.authorized);
        assert_eq!(outcome.number.as_deref(), Some("М222ММ136"));
    }

    #[test]
    fn test_no_candidates() {
        let outcome = match_candidates(&[], &fixture_allow_list(), 0.0);
        assert!(!outcome.authorized);
        assert!(outcome.number.is_none());
    }

    #[test]
    fn test_empty_allow_list() {
        let outcome = match_candidates(
            &candidates(&["М222ММ136"]),
            &AllowList::new(Vec::new()),
            0.0,
        );
        assert!(!outcome.authorized);
        assert!(outcome.number.is_none());
    }
}
