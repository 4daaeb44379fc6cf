use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::ReconcileError;
use crate::prediction::{Outcome, Prediction, Status};
use crate::store::PredictionStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub status: Option<String>,
}

impl MatchResult {
    pub fn final_score(home: i32, away: i32) -> Self {
        Self {
            home_score: Some(home),
            away_score: Some(away),
            status: Some("Completed".to_string()),
        }
    }

    pub fn unplayed() -> Self {
        Self::default()
    }

    pub fn scores(&self) -> Option<(i32, i32)> {
        Some((self.home_score?, self.away_score?))
    }
}

pub trait ResultLookup {
    fn get_match_result(&self, match_id: &str) -> Result<Option<MatchResult>>;
}

impl<T: ResultLookup + ?Sized> ResultLookup for &T {
    fn get_match_result(&self, match_id: &str) -> Result<Option<MatchResult>> {
        (**self).get_match_result(match_id)
    }
}

/// Settles `prediction` against `result`.
///
/// Completed rows come back unchanged. Without both scores the row stays
/// pending. Profit is in units of a flat one-unit stake and is only set when
/// all three odds are present and above 1.
pub fn reconcile(prediction: &Prediction, result: &MatchResult) -> Prediction {
    let mut out = prediction.clone();
    if prediction.status == Status::Completed {
        return out;
    }
    let Some((home, away)) = result.scores() else {
        return out;
    };

    let actual = Outcome::from_scores(home, away);
    out.home_score = Some(home);
    out.away_score = Some(away);
    out.actual_outcome = Some(actual);
    out.status = Status::Completed;
    out.profit_loss = prediction.odds_for(prediction.predicted_outcome).map(|odds| {
        if prediction.predicted_outcome == actual {
            round2(odds - 1.0)
        } else {
            -1.0
        }
    });
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    pub scanned: usize,
    pub matches: usize,
    pub completed: usize,
    pub still_pending: usize,
    pub missing: usize,
    pub errors: Vec<String>,
}

pub struct ReconciliationEngine<'a, L> {
    store: &'a mut PredictionStore,
    lookup: L,
}

impl<'a, L: ResultLookup> ReconciliationEngine<'a, L> {
    pub fn new(store: &'a mut PredictionStore, lookup: L) -> Self {
        Self { store, lookup }
    }

    /// Settles every pending row with a match reference. Each match's result is
    /// fetched once. A failing match is logged and recorded in the summary;
    /// the remaining matches are still processed.
    pub fn reconcile_all(&mut self) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let pending = match self.store.pending_with_match_ref() {
            Ok(rows) => rows,
            Err(err) => {
                error!("pending scan failed: {err:#}");
                summary.errors.push(format!("scan: {err:#}"));
                return summary;
            }
        };
        summary.scanned = pending.len();
        info!(count = pending.len(), "found pending predictions");

        let groups = group_by_match(&pending);
        summary.matches = groups.len();
        for (match_id, ids) in groups {
            match self.reconcile_match(match_id, &ids) {
                Ok(None) => summary.missing += ids.len(),
                Ok(Some(rows)) if rows.is_empty() => {
                    warn!(match_id, rows = ids.len(), "no pending rows written for match");
                    summary.missing += ids.len();
                }
                Ok(Some(rows)) => {
                    for row in rows {
                        match row.status {
                            Status::Completed => summary.completed += 1,
                            Status::Pending => summary.still_pending += 1,
                        }
                    }
                }
                Err(err) => {
                    error!("{err}");
                    summary.errors.push(err.to_string());
                }
            }
        }

        info!(
            scanned = summary.scanned,
            completed = summary.completed,
            still_pending = summary.still_pending,
            missing = summary.missing,
            errors = summary.errors.len(),
            "reconciliation pass finished"
        );
        summary
    }

    pub fn reconcile_one(&mut self, id: i64) -> Result<Option<Prediction>, ReconcileError> {
        let persist = |err: anyhow::Error| ReconcileError::Persist {
            id,
            message: format!("{err:#}"),
        };
        let Some(row) = self.store.get(id).map_err(persist)? else {
            return Ok(None);
        };
        let Some(match_id) = row
            .match_id
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
        else {
            warn!(id, "prediction has no match reference");
            return Ok(Some(row));
        };
        if !row.is_pending() {
            return Ok(Some(row));
        }

        let Some(result) = self.fetch(&match_id)? else {
            warn!(id, match_id = %match_id, "no result data for match");
            return Ok(Some(row));
        };
        let updated = reconcile(&row, &result);
        if updated != row {
            self.store.update(&updated).map_err(persist)?;
        }
        Ok(Some(updated))
    }

    fn reconcile_match(
        &mut self,
        match_id: &str,
        ids: &[i64],
    ) -> Result<Option<Vec<Prediction>>, ReconcileError> {
        let Some(result) = self.fetch(match_id)? else {
            warn!(match_id, rows = ids.len(), "no result data for match");
            return Ok(None);
        };
        let rows = self
            .store
            .update_by_match_id(match_id, |p| reconcile(p, &result))
            .map_err(|err| ReconcileError::Persist {
                id: ids.first().copied().unwrap_or_default(),
                message: format!("{err:#}"),
            })?;
        if let Some((home, away)) = result.scores() {
            info!(match_id, home, away, rows = rows.len(), "settled match");
        }
        Ok(Some(rows))
    }

    fn fetch(&self, match_id: &str) -> Result<Option<MatchResult>, ReconcileError> {
        self.lookup
            .get_match_result(match_id)
            .map_err(|err| ReconcileError::Lookup {
                match_id: match_id.to_string(),
                message: format!("{err:#}"),
            })
    }
}

fn group_by_match(rows: &[Prediction]) -> Vec<(&str, Vec<i64>)> {
    let mut order: Vec<(&str, Vec<i64>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let Some(match_id) = row.match_id.as_deref().map(str::trim).filter(|m| !m.is_empty())
        else {
            continue;
        };
        let slot = *index.entry(match_id).or_insert_with(|| {
            order.push((match_id, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(row.id);
    }
    order
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{MatchResult, reconcile};
    use crate::prediction::{NewPrediction, Outcome, Prediction, Status};

    fn home_pick(odds: bool) -> Prediction {
        let date = NaiveDate::from_ymd_opt(2024, 10, 5).expect("date");
        let mut p = NewPrediction::new(date, "Bundesliga", "Freiburg", "Mainz", Outcome::Home, 71.0);
        if odds {
            p = p.with_odds(2.5, 3.0, 2.8);
        }
        p.into_prediction(7)
    }

    #[test]
    fn winning_pick_pays_odds_minus_one() {
        let out = reconcile(&home_pick(true), &MatchResult::final_score(2, 1));
        assert_eq!(out.actual_outcome, Some(Outcome::Home));
        assert_eq!(out.profit_loss, Some(1.5));
        assert_eq!(out.status, Status::Completed);
        assert_eq!((out.home_score, out.away_score), (Some(2), Some(1)));
    }

    #[test]
    fn losing_pick_loses_one_unit() {
        let out = reconcile(&home_pick(true), &MatchResult::final_score(0, 1));
        assert_eq!(out.actual_outcome, Some(Outcome::Away));
        assert_eq!(out.profit_loss, Some(-1.0));
        assert_eq!(out.status, Status::Completed);
    }

    #[test]
    fn unplayed_match_stays_pending() {
        let before = home_pick(true);
        let out = reconcile(&before, &MatchResult::unplayed());
        assert_eq!(out, before);

        let half = MatchResult {
            home_score: Some(1),
            away_score: None,
            status: None,
        };
        assert_eq!(reconcile(&before, &half).status, Status::Pending);
    }

    #[test]
    fn missing_odds_complete_without_profit() {
        let out = reconcile(&home_pick(false), &MatchResult::final_score(2, 1));
        assert_eq!(out.actual_outcome, Some(Outcome::Home));
        assert_eq!(out.profit_loss, None);
        assert_eq!(out.status, Status::Completed);
    }

    #[test]
    fn completed_rows_are_not_touched() {
        let settled = reconcile(&home_pick(true), &MatchResult::final_score(2, 1));
        let again = reconcile(&settled, &MatchResult::final_score(0, 3));
        assert_eq!(again, settled);
    }

    #[test]
    fn draw_on_level_scores() {
        let mut pick = home_pick(true);
        pick.predicted_outcome = Outcome::Draw;
        let out = reconcile(&pick, &MatchResult::final_score(1, 1));
        assert_eq!(out.actual_outcome, Some(Outcome::Draw));
        assert_eq!(out.profit_loss, Some(2.0));
    }
}
