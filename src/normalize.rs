use tracing::debug;

use crate::aliases::{AliasTables, NormalizerProfile, PreservedPrefix};

const MAX_PASSES: usize = 16;

/// Canonicalizes raw team/league names into join keys.
///
/// The key is lowercase ASCII, free of club-type prefixes and suffixes, and only
/// ever used for matching. `normalize` is idempotent for any vocabulary: the step
/// pipeline is applied until it stops changing the string, and an alias cycle is
/// collapsed onto its smallest member.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    label: &'static str,
    profile: NormalizerProfile,
}

impl NameNormalizer {
    pub fn new(label: &'static str, profile: NormalizerProfile) -> Self {
        Self { label, profile }
    }

    pub fn odds_teams(tables: &AliasTables) -> Self {
        Self::new("odds_teams", tables.odds_teams.clone())
    }

    pub fn odds_leagues(tables: &AliasTables) -> Self {
        Self::new("odds_leagues", tables.odds_leagues.clone())
    }

    pub fn market_teams(tables: &AliasTables) -> Self {
        Self::new("market_teams", tables.market_teams.clone())
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn profile(&self) -> &NormalizerProfile {
        &self.profile
    }

    pub fn expand_alias<'a>(&'a self, raw: &'a str) -> &'a str {
        self.profile.alias_for(raw).unwrap_or(raw)
    }

    pub fn normalize(&self, raw: &str) -> String {
        let mut current = self.step(raw);
        let mut seen = vec![current.clone()];
        for _ in 0..MAX_PASSES {
            let next = self.step(&current);
            if next == current {
                break;
            }
            if let Some(pos) = seen.iter().position(|s| *s == next) {
                current = seen[pos..].iter().min().cloned().unwrap_or(next);
                break;
            }
            seen.push(next.clone());
            current = next;
        }
        if current != raw {
            debug!(profile = self.label, raw, key = %current, "normalized name");
        }
        current
    }

    pub fn fold_chars(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for ch in raw.chars().flat_map(char::to_lowercase) {
            if ch.is_ascii() {
                out.push(ch);
            } else if let Some(rep) = self.profile.char_map.get(&ch) {
                out.push_str(rep);
            } else if ch.is_whitespace() {
                out.push(' ');
            }
        }
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn step(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let mut name = self.expand_alias(trimmed).to_string();
        if self.profile.strip_parenthesized {
            name = strip_parenthesized(&name);
        }

        name = match self.profile.preserved_prefix.as_ref() {
            Some(preserved) if is_preserved_entity(&name, &preserved.entities) => {
                hyphenate_prefix(&name, preserved)
            }
            _ => strip_prefixes(&name, &self.profile.prefixes),
        };
        name = strip_suffixes(&name, &self.profile.suffixes);

        let name: String = name
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
            .collect();

        let folded = self.fold_chars(&name);
        folded
            .split_whitespace()
            .map(|word| {
                self.profile
                    .translations
                    .get(word)
                    .map(String::as_str)
                    .unwrap_or(word)
            })
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase()
    }
}

fn strip_prefixes(name: &str, prefixes: &[String]) -> String {
    let mut rest = name.trim();
    while let Some((first, tail)) = rest.split_once(char::is_whitespace) {
        let tail = tail.trim_start();
        if tail.is_empty() {
            break;
        }
        let first = first.to_lowercase();
        if !prefixes.iter().any(|p| *p == first) {
            break;
        }
        rest = tail;
    }
    rest.to_string()
}

fn strip_suffixes(name: &str, suffixes: &[String]) -> String {
    let mut rest = name.trim();
    while let Some((head, last)) = rest.rsplit_once(char::is_whitespace) {
        let head = head.trim_end();
        if head.is_empty() {
            break;
        }
        let last = last.to_lowercase();
        if !suffixes.iter().any(|s| *s == last) {
            break;
        }
        rest = head;
    }
    rest.to_string()
}

fn strip_parenthesized(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0usize;
    for ch in name.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

fn split_tokens(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn is_preserved_entity(name: &str, entities: &[String]) -> bool {
    let tokens = split_tokens(name);
    entities.iter().any(|entity| {
        let wanted = split_tokens(entity);
        !wanted.is_empty() && tokens.windows(wanted.len()).any(|w| w == wanted.as_slice())
    })
}

fn hyphenate_prefix(name: &str, preserved: &PreservedPrefix) -> String {
    let trimmed = name.trim();
    let Some((first, rest)) = trimmed.split_once(|c: char| c.is_whitespace() || c == '-') else {
        return trimmed.to_string();
    };
    let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '-');
    if first.to_lowercase() != preserved.token || rest.is_empty() {
        return trimmed.to_string();
    }
    format!("{}-{}", preserved.token, rest)
}

#[cfg(test)]
mod tests {
    use super::NameNormalizer;
    use crate::aliases::{AliasTables, parse_alias_json};

    fn odds() -> NameNormalizer {
        NameNormalizer::odds_teams(&AliasTables::bundled().expect("bundled"))
    }

    fn market() -> NameNormalizer {
        NameNormalizer::market_teams(&AliasTables::bundled().expect("bundled"))
    }

    #[test]
    fn strips_accents_and_club_tokens() {
        let n = odds();
        assert_eq!(n.normalize("Córdoba"), "cordoba");
        assert_eq!(n.normalize("IF Elfsborg"), "elfsborg");
        assert_eq!(n.normalize("Mjällby"), "mjallby");
        assert_eq!(n.normalize("Argentinos Juniors"), "argentinos");
        assert_eq!(n.normalize("Widzew Łódź"), "widzew lodz");
    }

    #[test]
    fn alias_and_raw_form_share_a_key() {
        let n = odds();
        assert_eq!(n.normalize("Norrköping"), n.normalize("IFK Norrkoping"));
        assert_eq!(n.normalize("Djurgården"), n.normalize("Djurgardens IF"));
    }

    #[test]
    fn preserved_prefix_is_hyphenated() {
        let n = odds();
        assert_eq!(n.normalize("Al Hilal"), "al-hilal");
        assert_eq!(n.normalize("Al-Hilal"), "al-hilal");
        assert_eq!(n.normalize("AL Nassr FC"), "al-nassr");
        assert_eq!(n.normalize("Al Riyadh"), "riyadh");
    }

    #[test]
    fn empty_input_is_empty_key() {
        assert_eq!(odds().normalize(""), "");
        assert_eq!(odds().normalize("   "), "");
    }

    #[test]
    fn single_token_prefix_is_kept() {
        assert_eq!(odds().normalize("FC"), "fc");
    }

    #[test]
    fn market_profile_translates_exonyms() {
        let n = market();
        assert_eq!(n.normalize("Bayern Munich"), n.normalize("FC Bayern München"));
        assert_eq!(n.normalize("Sporting CP"), "sporting lissabon");
        assert_eq!(n.normalize("Galatasaray (U19)"), "galatasaray");
        assert_eq!(n.normalize("Galatasaray"), n.normalize("Galatasaray SK"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "",
            "Córdoba",
            "FC FC Porto",
            "Foo F.C.",
            "Al Hilal",
            "Paris Saint-Germain",
            "Bodø/Glimt",
            "İstanbul Başakşehir",
            "Dukla B.B.",
            "  many   spaces  ",
            "Sporting",
            "inter",
        ];
        for n in [odds(), market()] {
            for raw in inputs {
                let once = n.normalize(raw);
                assert_eq!(n.normalize(&once), once, "{} not idempotent for {raw:?}", n.label());
            }
        }
    }

    #[test]
    fn alias_cycles_still_idempotent() {
        let raw = r#"{
            "odds_teams": {"aliases": {"alpha": "beta", "beta": "gamma", "gamma": "alpha"}},
            "odds_leagues": {},
            "market_teams": {}
        }"#;
        let n = NameNormalizer::odds_teams(&parse_alias_json(raw).expect("valid"));
        let key = n.normalize("beta");
        assert_eq!(key, "alpha");
        assert_eq!(n.normalize(&key), key);
    }

    #[test]
    fn keys_are_ascii() {
        let key = market().normalize("Qarabağ Ağdam ÆØ");
        assert!(key.is_ascii());
    }
}
