use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

const BUNDLED_ALIASES: &str = include_str!("../data/aliases.json");

#[derive(Debug, Clone)]
pub struct AliasTables {
    pub odds_teams: NormalizerProfile,
    pub odds_leagues: NormalizerProfile,
    pub market_teams: NormalizerProfile,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizerProfile {
    pub aliases: HashMap<String, String>,
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub preserved_prefix: Option<PreservedPrefix>,
    pub translations: HashMap<String, String>,
    pub char_map: HashMap<char, String>,
    pub strip_parenthesized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PreservedPrefix {
    pub token: String,
    pub entities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AliasFile {
    odds_teams: RawProfile,
    odds_leagues: RawProfile,
    market_teams: RawProfile,
}

#[derive(Debug, Deserialize, Default)]
struct RawProfile {
    #[serde(default)]
    aliases: HashMap<String, String>,
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(default)]
    suffixes: Vec<String>,
    #[serde(default)]
    preserved_prefix: Option<RawPreservedPrefix>,
    #[serde(default)]
    translations: HashMap<String, String>,
    #[serde(default)]
    char_map: HashMap<String, String>,
    #[serde(default)]
    strip_parenthesized: bool,
}

#[derive(Debug, Deserialize)]
struct RawPreservedPrefix {
    token: String,
    #[serde(default)]
    entities: Vec<String>,
}

impl AliasTables {
    pub fn bundled() -> Result<Self> {
        parse_alias_json(BUNDLED_ALIASES).context("bundled alias tables are invalid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read alias tables {}", path.display()))?;
        parse_alias_json(&raw).with_context(|| format!("parse alias tables {}", path.display()))
    }

    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }
}

impl NormalizerProfile {
    pub fn alias_for(&self, raw: &str) -> Option<&str> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.aliases.get(&key).map(String::as_str)
    }
}

pub fn parse_alias_json(raw: &str) -> Result<AliasTables> {
    let file: AliasFile = serde_json::from_str(raw.trim()).context("invalid alias json")?;
    Ok(AliasTables {
        odds_teams: build_profile(file.odds_teams).context("odds_teams profile")?,
        odds_leagues: build_profile(file.odds_leagues).context("odds_leagues profile")?,
        market_teams: build_profile(file.market_teams).context("market_teams profile")?,
    })
}

fn build_profile(raw: RawProfile) -> Result<NormalizerProfile> {
    let aliases = raw
        .aliases
        .into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();

    let mut char_map = HashMap::with_capacity(raw.char_map.len());
    for (key, replacement) in raw.char_map {
        let mut chars = key.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return Err(anyhow!("char_map key {key:?} must be a single character"));
        };
        if !replacement.is_ascii() {
            return Err(anyhow!("char_map replacement for {key:?} must be ascii"));
        }
        char_map.insert(ch, replacement.to_ascii_lowercase());
    }

    let translations = raw
        .translations
        .into_iter()
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_ascii_lowercase()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();

    let preserved_prefix = raw.preserved_prefix.map(|p| PreservedPrefix {
        token: p.token.trim().to_lowercase(),
        entities: p
            .entities
            .into_iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect(),
    });

    Ok(NormalizerProfile {
        aliases,
        prefixes: lowered_tokens(raw.prefixes),
        suffixes: lowered_tokens(raw.suffixes),
        preserved_prefix,
        translations,
        char_map,
        strip_parenthesized: raw.strip_parenthesized,
    })
}

fn lowered_tokens(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
