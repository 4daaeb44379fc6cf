use std::env;
use std::path::PathBuf;

use crate::fuzzy::{EXACT_THRESHOLD, FUZZY_THRESHOLD, MatchThresholds};
use crate::stats::StakeBasis;

const APP_DIR: &str = "matchday_ledger";
const DB_FILE: &str = "predictions.sqlite";

const DEFAULT_RATE_LIMIT_PER_SEC: usize = 5;
const DEFAULT_MAX_WORKERS: usize = 20;
const DEFAULT_FALLBACK_FLOOR: f64 = 0.40;
const DEFAULT_DOMAIN: &str = "de";

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub thresholds: MatchThresholds,
    pub fallback_floor: f64,
    pub max_requests_per_second: usize,
    pub max_workers: usize,
    pub domain: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            thresholds: MatchThresholds::default(),
            fallback_floor: DEFAULT_FALLBACK_FLOOR,
            max_requests_per_second: DEFAULT_RATE_LIMIT_PER_SEC,
            max_workers: DEFAULT_MAX_WORKERS,
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        let exact = env_f64("MATCH_EXACT_THRESHOLD", EXACT_THRESHOLD).clamp(0.5, 1.0);
        let fuzzy = env_f64("MATCH_FUZZY_THRESHOLD", FUZZY_THRESHOLD).clamp(0.1, exact);
        let fallback_floor =
            env_f64("MATCH_FALLBACK_FLOOR", DEFAULT_FALLBACK_FLOOR).clamp(0.0, fuzzy);
        let max_requests_per_second = env_usize("MV_RATE_LIMIT_PER_SEC", DEFAULT_RATE_LIMIT_PER_SEC)
            .clamp(1, 50);
        let max_workers = env_usize("MV_MAX_WORKERS", DEFAULT_MAX_WORKERS).clamp(1, 64);
        let domain = env::var("MV_DOMAIN")
            .ok()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());

        Self {
            thresholds: MatchThresholds { exact, fuzzy },
            fallback_floor,
            max_requests_per_second,
            max_workers,
            domain,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.max_workers.clamp(1, 10)
    }
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub db_path: Option<PathBuf>,
    pub alias_tables_path: Option<PathBuf>,
    pub stake_basis: StakeBasis,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        let db_path = env_path("LEDGER_DB_PATH").or_else(default_db_path);
        let alias_tables_path = env_path("ALIAS_TABLES_PATH");
        let stake_basis = env::var("STATS_STAKE_BASIS")
            .ok()
            .and_then(|v| StakeBasis::parse(&v))
            .unwrap_or_default();
        Self {
            db_path,
            alias_tables_path,
            stake_basis,
        }
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(DB_FILE))
}

fn app_data_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

pub fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}
