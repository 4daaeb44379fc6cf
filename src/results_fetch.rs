use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::http_client::http_client;
use crate::reconcile::{MatchResult, ResultLookup};

const FOTMOB_MATCH_DETAILS_URL: &str = "https://www.fotmob.com/api/data/matchDetails";

#[derive(Debug, Clone, Default)]
pub struct FotmobResults;

impl ResultLookup for FotmobResults {
    fn get_match_result(&self, match_id: &str) -> Result<Option<MatchResult>> {
        let client = http_client()?;
        let url = format!("{FOTMOB_MATCH_DETAILS_URL}?matchId={}", match_id.trim());
        let body = client
            .get(&url)
            .send()
            .with_context(|| format!("request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("bad status: {url}"))?
            .text()
            .context("read matchDetails body")?;
        let result = parse_match_result_json(&body)?;
        debug!(match_id, found = result.is_some(), "fetched match result");
        Ok(result)
    }
}

/// Extracts the score from a matchDetails payload.
///
/// Scores are only reported for finished matches; an unfinished or cancelled
/// match yields a result without scores.
pub fn parse_match_result_json(raw: &str) -> Result<Option<MatchResult>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid matchDetails json")?;
    let Some(header) = root.get("header").filter(|h| h.is_object()) else {
        return Ok(None);
    };
    let status = header.get("status").unwrap_or(&Value::Null);
    let finished = flag(status, "finished");
    let cancelled = flag(status, "cancelled");
    let started = flag(status, "started");

    let label = if cancelled {
        "Cancelled"
    } else if finished {
        "Completed"
    } else if started {
        "Live"
    } else {
        "Pending"
    };
    if !finished || cancelled {
        return Ok(Some(MatchResult {
            home_score: None,
            away_score: None,
            status: Some(label.to_string()),
        }));
    }

    let (home, away) = team_scores(header)
        .or_else(|| {
            status
                .get("scoreStr")
                .and_then(|v| v.as_str())
                .and_then(parse_score_str)
        })
        .unzip();
    Ok(Some(MatchResult {
        home_score: home,
        away_score: away,
        status: Some(label.to_string()),
    }))
}

fn team_scores(header: &Value) -> Option<(i32, i32)> {
    let teams = header.get("teams")?.as_array()?;
    let score = |idx: usize| -> Option<i32> {
        let v = teams.get(idx)?.get("score")?;
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            .and_then(|n| i32::try_from(n).ok())
    };
    Some((score(0)?, score(1)?))
}

fn parse_score_str(raw: &str) -> Option<(i32, i32)> {
    let (home, away) = raw.split_once('-')?;
    Some((home.trim().parse().ok()?, away.trim().parse().ok()?))
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}
