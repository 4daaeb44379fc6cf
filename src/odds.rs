use std::collections::{BTreeSet, HashSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aliases::AliasTables;
use crate::fuzzy::{MatchThresholds, similarity};
use crate::normalize::NameNormalizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsRecord {
    pub team1: String,
    pub team2: String,
    pub league_name: String,
    pub home_odds: Option<f64>,
    pub draw_odds: Option<f64>,
    pub away_odds: Option<f64>,
    pub over_odds: Option<f64>,
    pub under_odds: Option<f64>,
    pub btts_yes: Option<f64>,
    pub btts_no: Option<f64>,
}

impl OddsRecord {
    pub fn new(team1: &str, team2: &str, league_name: &str) -> Self {
        Self {
            team1: team1.to_string(),
            team2: team2.to_string(),
            league_name: league_name.to_string(),
            home_odds: None,
            draw_odds: None,
            away_odds: None,
            over_odds: None,
            under_odds: None,
            btts_yes: None,
            btts_no: None,
        }
    }

    pub fn with_match_odds(mut self, home: f64, draw: f64, away: f64) -> Self {
        self.home_odds = Some(home);
        self.draw_odds = Some(draw);
        self.away_odds = Some(away);
        self
    }
}

pub trait OddsSource {
    fn all_odds(&self) -> Result<Vec<OddsRecord>>;
}

impl OddsSource for Vec<OddsRecord> {
    fn all_odds(&self) -> Result<Vec<OddsRecord>> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpliedProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

pub fn implied_probabilities(record: &OddsRecord) -> Option<ImpliedProbabilities> {
    let (home, draw, away) = (record.home_odds?, record.draw_odds?, record.away_odds?);
    if home <= 1.0 || draw <= 1.0 || away <= 1.0 {
        return None;
    }
    let ih = 1.0 / home;
    let id = 1.0 / draw;
    let ia = 1.0 / away;
    let sum = ih + id + ia;
    if sum <= 0.0 {
        return None;
    }
    Some(ImpliedProbabilities {
        home: ih / sum,
        draw: id / sum,
        away: ia / sum,
    })
}

#[derive(Debug, Clone, Default)]
struct LeagueKey {
    full: String,
    tokens: HashSet<String>,
    parts: Option<(HashSet<String>, HashSet<String>)>,
}

#[derive(Debug, Clone)]
struct KeyedRecord {
    home: String,
    away: String,
    league: LeagueKey,
}

#[derive(Debug, Clone)]
pub struct OddsResolver {
    teams: NameNormalizer,
    leagues: NameNormalizer,
    thresholds: MatchThresholds,
    records: Vec<OddsRecord>,
    keyed: Vec<KeyedRecord>,
}

impl OddsResolver {
    pub fn new(tables: &AliasTables, thresholds: MatchThresholds, records: Vec<OddsRecord>) -> Self {
        let mut resolver = Self {
            teams: NameNormalizer::odds_teams(tables),
            leagues: NameNormalizer::odds_leagues(tables),
            thresholds,
            records: Vec::new(),
            keyed: Vec::new(),
        };
        resolver.keyed = records
            .iter()
            .map(|r| KeyedRecord {
                home: resolver.teams.normalize(&r.team1),
                away: resolver.teams.normalize(&r.team2),
                league: resolver.league_key(&r.league_name),
            })
            .collect();
        resolver.records = records;
        resolver
    }

    pub fn load(
        source: &impl OddsSource,
        tables: &AliasTables,
        thresholds: MatchThresholds,
    ) -> Result<Self> {
        let records = source.all_odds().context("load odds records")?;
        info!(records = records.len(), "loaded odds snapshot");
        Ok(Self::new(tables, thresholds, records))
    }

    pub fn records(&self) -> &[OddsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn leagues_with_odds(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.league_name.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Exact team and league keys first, then exact teams in a compatible league,
    /// then the best fuzzy candidate. `None` means no data.
    pub fn resolve_odds(&self, home: &str, away: &str, league: Option<&str>) -> Option<&OddsRecord> {
        let q_home = self.teams.normalize(home);
        let q_away = self.teams.normalize(away);
        if q_home.is_empty() || q_away.is_empty() {
            return None;
        }
        let q_league = league
            .map(|l| self.league_key(l))
            .filter(|k| !k.full.is_empty());

        let same_teams = |rec: &KeyedRecord| rec.home == q_home && rec.away == q_away;
        let exact = self
            .keyed
            .iter()
            .position(|rec| {
                same_teams(rec) && q_league.as_ref().is_none_or(|q| q.full == rec.league.full)
            })
            .or_else(|| {
                self.keyed.iter().position(|rec| {
                    same_teams(rec) && league_compatible(q_league.as_ref(), &rec.league)
                })
            });
        if let Some(idx) = exact {
            debug!(home, away, record = idx, "exact odds match");
            return Some(&self.records[idx]);
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, rec) in self.keyed.iter().enumerate() {
            if !league_compatible(q_league.as_ref(), &rec.league) {
                continue;
            }
            let Some(home_score) = self.team_score(&q_home, &rec.home) else {
                continue;
            };
            let Some(away_score) = self.team_score(&q_away, &rec.away) else {
                continue;
            };
            let score = (home_score + away_score) / 2.0;
            if let Some((_, best_score)) = best
                && score <= best_score
            {
                continue;
            }
            best = Some((idx, score));
        }

        match best {
            Some((idx, score)) => {
                let rec = &self.records[idx];
                info!(
                    home,
                    away,
                    matched_home = %rec.team1,
                    matched_away = %rec.team2,
                    score,
                    "fuzzy odds match"
                );
                Some(rec)
            }
            None => {
                info!(home, away, league = league.unwrap_or(""), "no matching odds");
                None
            }
        }
    }

    fn team_score(&self, query: &str, candidate: &str) -> Option<f64> {
        if candidate.is_empty() {
            return None;
        }
        let score = similarity(query, candidate);
        if self.thresholds.is_fuzzy_score(score) {
            return Some(score);
        }
        if query.contains(candidate) || candidate.contains(query) {
            return Some(score);
        }
        None
    }

    fn league_key(&self, raw: &str) -> LeagueKey {
        let expanded = self.leagues.expand_alias(raw.trim());
        let parts = if let Some((name, country)) = expanded.split_once(',') {
            Some((self.token_set(name), self.token_set(country)))
        } else if let Some((country, name)) = expanded.split_once(" - ") {
            Some((self.token_set(name), self.token_set(country)))
        } else {
            None
        };
        LeagueKey {
            full: self.leagues.normalize(raw),
            tokens: self.token_set(expanded),
            parts,
        }
    }

    fn token_set(&self, raw: &str) -> HashSet<String> {
        self.leagues
            .fold_chars(raw)
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn league_compatible(query: Option<&LeagueKey>, record: &LeagueKey) -> bool {
    let Some(query) = query else {
        return true;
    };
    if record.full.is_empty() || query.full == record.full {
        return true;
    }
    match (&query.parts, &record.parts) {
        (Some((q_name, q_country)), Some((r_name, r_country))) => {
            overlaps(q_name, r_name) && overlaps(q_country, r_country)
        }
        (None, Some(_)) => overlaps(&query.tokens, &record.tokens),
        _ => {
            overlaps(&query.tokens, &record.tokens)
                || query.full.contains(&record.full)
                || record.full.contains(&query.full)
        }
    }
}

fn overlaps(a: &HashSet<String>, b: &HashSet<String>) -> bool {
    a.iter().any(|x| b.contains(x))
}

#[cfg(test)]
mod tests {
    use super::{OddsRecord, OddsResolver, implied_probabilities};
    use crate::aliases::AliasTables;
    use crate::fuzzy::MatchThresholds;

    fn resolver(records: Vec<OddsRecord>) -> OddsResolver {
        let tables = AliasTables::bundled().expect("bundled");
        OddsResolver::new(&tables, MatchThresholds::default(), records)
    }

    #[test]
    fn implied_probabilities_sum_to_one() {
        let rec = OddsRecord::new("A", "B", "L").with_match_odds(2.10, 3.40, 3.60);
        let p = implied_probabilities(&rec).expect("valid");
        assert!((p.home + p.draw + p.away - 1.0).abs() < 1e-9);
        assert!(p.home > p.away);
    }

    #[test]
    fn implied_probabilities_reject_bad_odds() {
        let rec = OddsRecord::new("A", "B", "L").with_match_odds(1.0, 3.4, 3.6);
        assert!(implied_probabilities(&rec).is_none());
        assert!(implied_probabilities(&OddsRecord::new("A", "B", "L")).is_none());
    }

    #[test]
    fn resolves_through_alias_and_league_alias() {
        let r = resolver(vec![
            OddsRecord::new("IFK Norrkoping", "Mjallby AIF", "Allsvenskan, Sweden")
                .with_match_odds(2.2, 3.3, 3.1),
        ]);
        let hit = r
            .resolve_odds("Norrköping", "Mjällby", Some("Sweden - Allsvenskan"))
            .expect("match");
        assert_eq!(hit.team1, "IFK Norrkoping");
    }

    #[test]
    fn league_country_mismatch_blocks_match() {
        let r = resolver(vec![OddsRecord::new(
            "Liverpool",
            "Brighton",
            "Premier League, England",
        )]);
        assert!(
            r.resolve_odds("Liverpool", "Brighton", Some("Allsvenskan"))
                .is_none()
        );
        assert!(r.resolve_odds("Liverpool", "Brighton", None).is_some());
    }

    #[test]
    fn substring_fallback_matches_shortened_names() {
        let r = resolver(vec![OddsRecord::new(
            "Vikingur Reykjavik",
            "Breidablik UBK",
            "Besta deild, Iceland",
        )]);
        let hit = r.resolve_odds("Vikingur", "Breidablik", Some("Besta deild"));
        assert!(hit.is_some());
    }

    #[test]
    fn leagues_are_distinct_and_sorted() {
        let r = resolver(vec![
            OddsRecord::new("A", "B", "Superliga, Denmark"),
            OddsRecord::new("C", "D", "Allsvenskan, Sweden"),
            OddsRecord::new("E", "F", "Superliga, Denmark"),
        ]);
        assert_eq!(
            r.leagues_with_odds(),
            vec!["Allsvenskan, Sweden", "Superliga, Denmark"]
        );
    }

    #[test]
    fn empty_team_names_return_none() {
        let r = resolver(vec![OddsRecord::new("A", "B", "")]);
        assert!(r.resolve_odds("", "B", None).is_none());
    }
}
