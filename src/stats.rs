use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::prediction::{Prediction, Status};
use crate::store::{PredictionQuery, PredictionStore};

pub const HIGH_CONFIDENCE: f64 = 70.0;
pub const MEDIUM_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    pub fn of(confidence: f64) -> Self {
        if confidence >= HIGH_CONFIDENCE {
            ConfidenceBucket::High
        } else if confidence >= MEDIUM_CONFIDENCE {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }

    pub fn contains(self, confidence: f64) -> bool {
        Self::of(confidence) == self
    }

    pub fn sql_predicate(self) -> &'static str {
        match self {
            ConfidenceBucket::High => "confidence >= 70",
            ConfidenceBucket::Medium => "(confidence >= 50 AND confidence < 70)",
            ConfidenceBucket::Low => "confidence < 50",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(ConfidenceBucket::High),
            "medium" => Some(ConfidenceBucket::Medium),
            "low" => Some(ConfidenceBucket::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StakeBasis {
    #[default]
    Units,
    Amount,
}

impl StakeBasis {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "units" | "unit" | "count" => Some(StakeBasis::Units),
            "amount" | "stake" => Some(StakeBasis::Amount),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsFilter {
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub confidence_buckets: Vec<ConfidenceBucket>,
    pub leagues: Option<Vec<String>>,
}

impl StatsFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some((from, to));
        self
    }

    pub fn with_bucket(mut self, bucket: ConfidenceBucket) -> Self {
        if !self.confidence_buckets.contains(&bucket) {
            self.confidence_buckets.push(bucket);
        }
        self
    }

    pub fn with_league(mut self, league: impl Into<String>) -> Self {
        self.leagues.get_or_insert_with(Vec::new).push(league.into());
        self
    }

    pub fn matches(&self, p: &Prediction) -> bool {
        if let Some((from, to)) = self.date_range
            && (p.date < from || p.date > to)
        {
            return false;
        }
        if !self.confidence_buckets.is_empty()
            && !self
                .confidence_buckets
                .iter()
                .any(|b| b.contains(p.confidence))
        {
            return false;
        }
        if let Some(leagues) = &self.leagues
            && !leagues.iter().any(|l| l == &p.league)
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionStats {
    pub total: usize,
    pub correct: usize,
    pub completed: usize,
    pub success_rate: f64,
    pub total_profit: f64,
    pub roi: f64,
    pub pending_count: usize,
}

pub fn aggregate(predictions: &[Prediction], basis: StakeBasis) -> PredictionStats {
    let mut stats = PredictionStats {
        total: predictions.len(),
        ..PredictionStats::default()
    };
    let mut staked = 0.0;

    for p in predictions {
        match p.status {
            Status::Pending => stats.pending_count += 1,
            Status::Completed => {
                stats.completed += 1;
                if p.is_correct() {
                    stats.correct += 1;
                }
                let Some(pl) = p.profit_loss.filter(|v| v.is_finite()) else {
                    continue;
                };
                match basis {
                    StakeBasis::Units => {
                        stats.total_profit += pl;
                        staked += 1.0;
                    }
                    StakeBasis::Amount => {
                        let stake = p.bet_amount.max(0.0);
                        stats.total_profit += pl * stake;
                        staked += stake;
                    }
                }
            }
        }
    }

    stats.success_rate = percent(stats.correct as f64, stats.completed as f64);
    stats.roi = percent(stats.total_profit, staked);
    stats.total_profit = round2(stats.total_profit);
    stats
}

pub fn compute(
    store: &PredictionStore,
    filter: &StatsFilter,
    basis: StakeBasis,
) -> Result<PredictionStats> {
    let rows = store.select(&PredictionQuery::from_filter(filter.clone()))?;
    let stats = aggregate(&rows, basis);
    debug!(
        total = stats.total,
        completed = stats.completed,
        pending = stats.pending_count,
        "computed prediction stats"
    );
    Ok(stats)
}

fn percent(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den * 100.0 } else { 0.0 }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
