use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aliases::AliasTables;
use crate::cache::{CacheEntry, CacheLookup, NegativeReason, ResolutionCache};
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::fuzzy::{MatchThresholds, best_match};
use crate::normalize::NameNormalizer;
use crate::rate_limit::RateLimiter;

const YOUTH_INDICATORS: &[&str] = &[
    "u17", "u18", "u19", "u20", "u21", "u23", "youth", "jugend", "junior", "juvenil",
];
const GENERIC_CLUB_TOKENS: &[&str] = &["fc", "sc", "fk", "sk"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEntity {
    pub id: u64,
    pub name: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadPlayer {
    pub name: String,
    pub market_value: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchMarketValues {
    pub home: u64,
    pub away: u64,
}

/// Remote club search. Implementations own their timeout; a timed-out call is
/// an `Err`, never an empty result.
pub trait EntitySearch: Send + Sync {
    fn search(&self, query: &str, domain: &str) -> Result<Vec<TeamEntity>>;
    fn get_squad(&self, team_id: u64, domain: &str) -> Result<Vec<SquadPlayer>>;
}

impl<T: EntitySearch + ?Sized> EntitySearch for Arc<T> {
    fn search(&self, query: &str, domain: &str) -> Result<Vec<TeamEntity>> {
        (**self).search(query, domain)
    }

    fn get_squad(&self, team_id: u64, domain: &str) -> Result<Vec<SquadPlayer>> {
        (**self).get_squad(team_id, domain)
    }
}

pub fn is_youth_team(name: &str) -> bool {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .any(|t| {
            let t = t.to_lowercase();
            YOUTH_INDICATORS.contains(&t.as_str())
        })
}

pub struct EntityResolver<S> {
    search: S,
    normalizer: NameNormalizer,
    cache: Arc<ResolutionCache>,
    limiter: RateLimiter,
    thresholds: MatchThresholds,
    fallback_floor: f64,
    batch_size: usize,
    pool: Option<rayon::ThreadPool>,
}

impl<S: EntitySearch> EntityResolver<S> {
    pub fn new(
        search: S,
        tables: &AliasTables,
        cache: Arc<ResolutionCache>,
        cfg: &ResolverConfig,
    ) -> Self {
        let batch_size = cfg.batch_size();
        Self {
            search,
            normalizer: NameNormalizer::market_teams(tables),
            cache,
            limiter: RateLimiter::per_second(cfg.max_requests_per_second),
            thresholds: cfg.thresholds,
            fallback_floor: cfg.fallback_floor,
            batch_size,
            pool: build_pool(batch_size),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    pub fn normalizer(&self) -> &NameNormalizer {
        &self.normalizer
    }

    pub fn search_key(&self, name: &str) -> String {
        self.normalizer.normalize(name)
    }

    pub fn resolve_team(&self, name: &str, domain: &str) -> Result<Option<TeamEntity>, ResolveError> {
        let trimmed = name.trim();
        let key = self.search_key(trimmed);
        if key.is_empty() {
            return Ok(None);
        }
        if let CacheLookup::Hit(hit) = self.cache.lookup(&key, domain) {
            debug!(name = trimmed, key = %key, found = hit.is_some(), "resolution cache hit");
            return Ok(hit);
        }

        let wants_youth = is_youth_team(trimmed);
        let variants = self.search_variants(trimmed);
        let mut best: Option<(TeamEntity, f64)> = None;
        let mut failed = 0usize;
        let mut last_error = String::new();

        for variant in &variants {
            let candidates = match self.remote_search(variant, domain) {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!(name = trimmed, variant = %variant, "search failed: {err:#}");
                    failed += 1;
                    last_error = format!("{err:#}");
                    continue;
                }
            };
            let candidates: Vec<TeamEntity> = candidates
                .into_iter()
                .filter(|c| wants_youth || !is_youth_team(&c.name))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let variant_key = self.normalizer.normalize(variant);
            let keys: Vec<String> = candidates
                .iter()
                .map(|c| self.normalizer.normalize(&c.name))
                .collect();
            let scored = || keys.iter().enumerate().map(|(i, k)| (i, k.as_str()));

            if let Some((idx, score)) = best_match(&variant_key, scored(), self.thresholds.exact) {
                let team = candidates[idx].clone();
                info!(name = trimmed, matched = %team.name, score, "exact team match");
                self.cache
                    .insert(&key, domain, CacheEntry::Resolved(team.clone()));
                return Ok(Some(team));
            }

            if let Some((idx, score)) = best_match(&variant_key, scored(), 0.0) {
                let improves = best.as_ref().is_none_or(|(_, s)| score > *s);
                if improves {
                    best = Some((candidates[idx].clone(), score));
                }
            }
        }

        if let Some((team, score)) = best {
            if self.thresholds.is_fuzzy_score(score) {
                info!(name = trimmed, matched = %team.name, score, "fuzzy team match");
                self.cache
                    .insert(&key, domain, CacheEntry::Resolved(team.clone()));
                return Ok(Some(team));
            }
            if score > self.fallback_floor {
                info!(name = trimmed, matched = %team.name, score, "using best non-youth candidate");
                self.cache
                    .insert(&key, domain, CacheEntry::Resolved(team.clone()));
                return Ok(Some(team));
            }
        }

        if failed > 0 {
            self.cache
                .insert(&key, domain, CacheEntry::Negative(NegativeReason::RemoteError));
            return Err(ResolveError::Remote {
                name: trimmed.to_string(),
                attempted: variants.len(),
                failed,
                last_error,
            });
        }

        warn!(name = trimmed, "no match found for team");
        self.cache.insert(
            &key,
            domain,
            CacheEntry::Negative(NegativeReason::ConfirmedAbsent),
        );
        Ok(None)
    }

    /// Resolves every name; a failure maps that name to `None` without touching
    /// the others.
    pub fn resolve_many<N>(&self, names: &[N], domain: &str) -> HashMap<String, Option<TeamEntity>>
    where
        N: AsRef<str> + Sync,
    {
        self.run_batched(names, |name| match self.resolve_team(name, domain) {
            Ok(team) => team,
            Err(err) => {
                warn!(team = name, "resolution failed: {err}");
                None
            }
        })
    }

    pub fn team_squad(&self, team: &TeamEntity, domain: &str) -> Result<Vec<SquadPlayer>, ResolveError> {
        if let Some(squad) = self.cache.squad(team.id, domain) {
            return Ok(squad);
        }
        self.limiter.acquire();
        let squad = self
            .search
            .get_squad(team.id, domain)
            .map_err(|err| ResolveError::Squad {
                team_id: team.id,
                message: format!("{err:#}"),
            })?;
        debug!(team = %team.name, players = squad.len(), "fetched squad");
        self.cache.insert_squad(team.id, domain, squad.clone());
        Ok(squad)
    }

    pub fn team_market_value(&self, name: &str, domain: &str) -> Result<Option<u64>, ResolveError> {
        let Some(team) = self.resolve_team(name, domain)? else {
            return Ok(None);
        };
        let squad = self.team_squad(&team, domain)?;
        let total = squad.iter().filter_map(|p| p.market_value).sum::<u64>();
        info!(query = name, team = %team.name, total, "team market value");
        Ok(Some(total))
    }

    pub fn multiple_teams_market_value<N>(&self, names: &[N], domain: &str) -> HashMap<String, u64>
    where
        N: AsRef<str> + Sync,
    {
        self.run_batched(names, |name| match self.team_market_value(name, domain) {
            Ok(value) => value.unwrap_or(0),
            Err(err) => {
                warn!(team = name, "market value failed: {err}");
                0
            }
        })
    }

    pub fn both_teams_market_value(&self, home: &str, away: &str, domain: &str) -> MatchMarketValues {
        let values = self.multiple_teams_market_value(&[home, away], domain);
        MatchMarketValues {
            home: values.get(home).copied().unwrap_or(0),
            away: values.get(away).copied().unwrap_or(0),
        }
    }

    pub fn search_variants(&self, name: &str) -> Vec<String> {
        let trimmed = name.trim();
        let lower = trimmed.to_lowercase();
        let mut out: Vec<String> = Vec::new();
        let mut push = |candidate: String| {
            let candidate = candidate.trim().to_string();
            if !candidate.is_empty() && !out.iter().any(|v| v.eq_ignore_ascii_case(&candidate)) {
                out.push(candidate);
            }
        };

        push(trimmed.to_string());
        push(self.normalizer.normalize(trimmed));
        if let Some(alias) = self.normalizer.profile().alias_for(trimmed) {
            push(alias.to_lowercase());
        }

        let base = self.normalizer.fold_chars(trimmed);
        push(base.clone());
        let has_club_token = base
            .split_whitespace()
            .any(|w| GENERIC_CLUB_TOKENS.contains(&w));
        if !has_club_token {
            push(format!("fc {base}"));
            push(format!("{base} fc"));
            push(format!("sk {base}"));
            push(format!("{base} sk"));
        }

        if let Some(rest) = lower.strip_prefix("al-").or_else(|| lower.strip_prefix("al ")) {
            let hyphenated = format!("al-{}", rest.trim());
            push(hyphenated.clone());
            push(format!("{hyphenated} fc"));
            push(format!("{hyphenated} club"));
        }

        debug!(name = trimmed, variants = ?out, "search variants");
        out
    }

    fn remote_search(&self, query: &str, domain: &str) -> Result<Vec<TeamEntity>> {
        self.limiter.acquire();
        self.search.search(query, domain)
    }

    fn run_batched<N, T, F>(&self, names: &[N], resolve: F) -> HashMap<String, T>
    where
        N: AsRef<str> + Sync,
        T: Send,
        F: Fn(&str) -> T + Sync,
    {
        let mut out = HashMap::with_capacity(names.len());
        for batch in names.chunks(self.batch_size) {
            let results: Vec<(String, T)> = with_pool(&self.pool, || {
                batch
                    .par_iter()
                    .map(|name| {
                        let name = name.as_ref();
                        (name.to_string(), resolve(name))
                    })
                    .collect()
            });
            out.extend(results);
        }
        out
    }
}

fn build_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
