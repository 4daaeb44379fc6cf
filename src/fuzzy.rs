/// Score at or above which a candidate is treated as authoritative.
pub const EXACT_THRESHOLD: f64 = 0.90;
/// Score at or above which a candidate is accepted as a fallback.
pub const FUZZY_THRESHOLD: f64 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    pub exact: f64,
    pub fuzzy: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            exact: EXACT_THRESHOLD,
            fuzzy: FUZZY_THRESHOLD,
        }
    }
}

impl MatchThresholds {
    pub fn is_exact_score(&self, score: f64) -> bool {
        score >= self.exact
    }

    pub fn is_fuzzy_score(&self, score: f64) -> bool {
        score >= self.fuzzy
    }

    pub fn is_exact(&self, a: &str, b: &str) -> bool {
        self.is_exact_score(similarity(a, b))
    }

    pub fn is_fuzzy(&self, a: &str, b: &str) -> bool {
        self.is_fuzzy_score(similarity(a, b))
    }
}

/// Position-wise character agreement, divided by the longer length.
///
/// Order sensitive and cheap; an inserted character shifts everything after it,
/// so callers add their own substring/token heuristics where that matters.
/// Empty input scores 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let longest = len_a.max(len_b);
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }
    let same = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    same as f64 / longest as f64
}

pub fn is_exact(a: &str, b: &str) -> bool {
    MatchThresholds::default().is_exact(a, b)
}

pub fn is_fuzzy(a: &str, b: &str) -> bool {
    MatchThresholds::default().is_fuzzy(a, b)
}

/// Highest-scoring candidate at or above `threshold`.
///
/// Only a strictly higher score displaces the current best, so ties keep the
/// candidate enumerated first.
pub fn best_match<'a, T, I>(query: &str, candidates: I, threshold: f64) -> Option<(T, f64)>
where
    I: IntoIterator<Item = (T, &'a str)>,
{
    let mut best: Option<(T, f64)> = None;
    for (item, name) in candidates {
        let score = similarity(query, name);
        if score < threshold {
            continue;
        }
        if let Some((_, best_score)) = best.as_ref()
            && score <= *best_score
        {
            continue;
        }
        best = Some((item, score));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{MatchThresholds, best_match, is_exact, is_fuzzy, similarity};

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("porto", "porto"), 1.0);
    }

    #[test]
    fn normalizes_by_longer_length() {
        assert_eq!(similarity("abc", "abcdef"), 0.5);
        assert_eq!(similarity("abcdef", "abc"), 0.5);
    }

    #[test]
    fn insertion_shifts_alignment() {
        assert!(similarity("benfica", "sbenfica") < 0.3);
    }

    #[test]
    fn empty_never_matches() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("", "x"), 0.0);
        assert!(!is_fuzzy("", ""));
    }

    #[test]
    fn exact_boundary_is_inclusive() {
        let score = similarity("abcdefghij", "abcdefghiX");
        assert_eq!(score, 0.9);
        assert!(is_exact("abcdefghij", "abcdefghiX"));
        assert!(!is_exact("abcdefghij", "abcdefghXX"));
    }

    #[test]
    fn fuzzy_boundary() {
        let t = MatchThresholds::default();
        assert!(!t.is_fuzzy_score(0.6499));
        assert!(t.is_fuzzy_score(0.65));
        // 13 of 20 positions agree.
        assert!(is_fuzzy("aaaaaaaaaaaaaaaaaaaa", "aaaaaaaaaaaaabbbbbbb"));
        assert!(!is_fuzzy("aaaaaaaaaaaaaaaaaaaa", "aaaaaaaaaaaabbbbbbbb"));
    }

    #[test]
    fn best_match_prefers_first_on_tie() {
        let candidates = vec![(1, "porta"), (2, "portx"), (3, "zzzzz")];
        let (id, score) = best_match("porto", candidates, 0.65).expect("match");
        assert_eq!(id, 1);
        assert_eq!(score, 0.8);
    }

    #[test]
    fn best_match_takes_strictly_higher() {
        let candidates = vec![(1, "porxx"), (2, "porto")];
        let (id, _) = best_match("porto", candidates, 0.5).expect("match");
        assert_eq!(id, 2);
    }

    #[test]
    fn best_match_respects_threshold() {
        let candidates = vec![(1, "lyon")];
        assert!(best_match("nice", candidates, 0.65).is_none());
    }
}
