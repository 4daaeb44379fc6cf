use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::http_client::http_client;
use crate::market_value::{EntitySearch, SquadPlayer, TeamEntity};

const DEFAULT_API_HOST: &str = "transfermarket.p.rapidapi.com";

#[derive(Debug, Clone)]
pub struct TransfermarktClient {
    host: String,
    api_key: String,
}

impl TransfermarktClient {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TRANSFERMARKT_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("TRANSFERMARKT_API_KEY is not set"))?;
        let host = std::env::var("TRANSFERMARKT_API_HOST")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        Ok(Self::new(host, api_key))
    }

    fn get(&self, client: &Client, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("https://{}{path}", self.host);
        client
            .get(&url)
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", &self.api_key)
            .query(query)
            .send()
            .with_context(|| format!("request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("bad status: {url}"))?
            .text()
            .with_context(|| format!("read body: {url}"))
    }
}

impl EntitySearch for TransfermarktClient {
    fn search(&self, query: &str, domain: &str) -> Result<Vec<TeamEntity>> {
        let client = http_client()?;
        let body = self.get(client, "/search", &[("query", query), ("domain", domain)])?;
        let clubs = parse_search_json(&body)?;
        debug!(query, clubs = clubs.len(), "club search");
        Ok(clubs)
    }

    fn get_squad(&self, team_id: u64, domain: &str) -> Result<Vec<SquadPlayer>> {
        let client = http_client()?;
        let id = team_id.to_string();
        let body = self.get(client, "/clubs/get-squad", &[("id", id.as_str()), ("domain", domain)])?;
        parse_squad_json(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    clubs: Vec<ClubHit>,
}

#[derive(Debug, Deserialize)]
struct ClubHit {
    id: IdRepr,
    name: String,
    #[serde(default, rename = "countryName")]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Num(u64),
    Text(String),
}

impl IdRepr {
    fn as_u64(&self) -> Option<u64> {
        match self {
            IdRepr::Num(n) => Some(*n),
            IdRepr::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SquadResponse {
    #[serde(default)]
    squad: Vec<PlayerHit>,
}

#[derive(Debug, Deserialize)]
struct PlayerHit {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "marketValue")]
    market_value: Option<MarketValueHit>,
}

#[derive(Debug, Deserialize)]
struct MarketValueHit {
    value: Option<f64>,
}

pub fn parse_search_json(raw: &str) -> Result<Vec<TeamEntity>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: SearchResponse = serde_json::from_str(trimmed).context("invalid search json")?;
    Ok(data
        .clubs
        .into_iter()
        .filter_map(|club| {
            Some(TeamEntity {
                id: club.id.as_u64()?,
                name: club.name,
                country: club.country,
            })
        })
        .collect())
}

pub fn parse_squad_json(raw: &str) -> Result<Vec<SquadPlayer>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: SquadResponse = serde_json::from_str(trimmed).context("invalid squad json")?;
    Ok(data
        .squad
        .into_iter()
        .map(|p| SquadPlayer {
            name: p.name,
            market_value: p
                .market_value
                .and_then(|mv| mv.value)
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.round() as u64),
        })
        .collect())
}
