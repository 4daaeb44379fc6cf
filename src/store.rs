use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::{debug, info};

use crate::odds::{OddsRecord, OddsSource};
use crate::prediction::{NewPrediction, Prediction, Status};
use crate::stats::StatsFilter;

const DATE_FORMAT: &str = "%Y-%m-%d";

const PREDICTION_COLUMNS: &str = "id, date, league, home_team, away_team, predicted_outcome, \
     actual_outcome, home_odds, draw_odds, away_odds, confidence, bet_amount, profit_loss, \
     status, match_id, home_score, away_score";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionQuery {
    pub filter: StatsFilter,
    pub status: Option<Status>,
}

impl PredictionQuery {
    pub fn from_filter(filter: StatsFilter) -> Self {
        Self {
            filter,
            status: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
}

pub struct PredictionStore {
    conn: Connection,
}

impl PredictionStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        info!(path = %path.display(), "opened prediction store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert(&self, p: &NewPrediction) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO predictions (
                    date, league, home_team, away_team, predicted_outcome,
                    home_odds, draw_odds, away_odds, confidence, bet_amount,
                    status, match_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    p.date.format(DATE_FORMAT).to_string(),
                    p.league,
                    p.home_team,
                    p.away_team,
                    p.predicted_outcome.as_str(),
                    p.home_odds,
                    p.draw_odds,
                    p.away_odds,
                    p.confidence,
                    p.bet_amount,
                    Status::Pending.as_str(),
                    p.match_id.as_deref().map(str::trim).filter(|m| !m.is_empty()),
                ],
            )
            .context("insert prediction")?;
        let id = self.conn.last_insert_rowid();
        debug!(id, home = %p.home_team, away = %p.away_team, "stored prediction");
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<Prediction>> {
        self.conn
            .query_row(
                &format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE id = ?1"),
                params![id],
                prediction_from_row,
            )
            .optional()
            .with_context(|| format!("load prediction {id}"))
    }

    pub fn update(&self, p: &Prediction) -> Result<bool> {
        let changed = write_settlement(&self.conn, p)
            .with_context(|| format!("update prediction {}", p.id))?;
        Ok(changed > 0)
    }

    /// Applies `settle` to every pending row referencing `match_id` inside one
    /// transaction and returns the rows as written. Stored references are
    /// compared trimmed.
    pub fn update_by_match_id<F>(&mut self, match_id: &str, settle: F) -> Result<Vec<Prediction>>
    where
        F: Fn(&Prediction) -> Prediction,
    {
        let tx = self
            .conn
            .transaction()
            .context("begin reconciliation transaction")?;
        let pending = {
            let mut stmt = tx
                .prepare(&format!(
                    "SELECT {PREDICTION_COLUMNS} FROM predictions
                     WHERE TRIM(match_id) = ?1 AND status IN ('Pending', 'pending')
                     ORDER BY id ASC"
                ))
                .context("prepare pending-by-match query")?;
            let rows = stmt
                .query_map(params![match_id.trim()], prediction_from_row)
                .context("query pending by match")?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.context("decode prediction row")?);
            }
            out
        };

        let mut written = Vec::with_capacity(pending.len());
        for row in &pending {
            let updated = settle(row);
            if updated != *row {
                write_settlement(&tx, &updated)
                    .with_context(|| format!("update prediction {}", updated.id))?;
            }
            written.push(updated);
        }
        tx.commit().context("commit reconciliation transaction")?;
        Ok(written)
    }

    pub fn select(&self, query: &PredictionQuery) -> Result<Vec<Prediction>> {
        let mut sql = format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE 1=1");
        let mut args: Vec<Value> = Vec::new();

        if let Some((from, to)) = query.filter.date_range {
            sql.push_str(" AND date >= ? AND date <= ?");
            args.push(Value::Text(from.format(DATE_FORMAT).to_string()));
            args.push(Value::Text(to.format(DATE_FORMAT).to_string()));
        }
        match query.status {
            Some(Status::Pending) => sql.push_str(" AND status IN ('Pending', 'pending')"),
            Some(Status::Completed) => sql.push_str(" AND status IN ('Completed', 'completed')"),
            None => {}
        }
        if !query.filter.confidence_buckets.is_empty() {
            let clauses = query
                .filter
                .confidence_buckets
                .iter()
                .map(|b| b.sql_predicate())
                .collect::<Vec<_>>()
                .join(" OR ");
            sql.push_str(&format!(" AND ({clauses})"));
        }
        if let Some(leagues) = &query.filter.leagues {
            if leagues.is_empty() {
                return Ok(Vec::new());
            }
            let marks = vec!["?"; leagues.len()].join(", ");
            sql.push_str(&format!(" AND league IN ({marks})"));
            args.extend(leagues.iter().map(|l| Value::Text(l.clone())));
        }
        sql.push_str(" ORDER BY date DESC, id DESC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare prediction select")?;
        let rows = stmt
            .query_map(params_from_iter(args), prediction_from_row)
            .context("query predictions")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode prediction row")?);
        }
        Ok(out)
    }

    pub fn pending_with_match_ref(&self) -> Result<Vec<Prediction>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PREDICTION_COLUMNS} FROM predictions
                 WHERE status IN ('Pending', 'pending')
                   AND match_id IS NOT NULL AND TRIM(match_id) <> ''
                 ORDER BY date ASC, id ASC"
            ))
            .context("prepare pending scan")?;
        let rows = stmt
            .query_map([], prediction_from_row)
            .context("query pending predictions")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode prediction row")?);
        }
        Ok(out)
    }

    pub fn leagues(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT league FROM predictions ORDER BY league ASC")
            .context("prepare league list")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query leagues")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode league")?);
        }
        Ok(out)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM predictions WHERE id = ?1", params![id])
            .with_context(|| format!("delete prediction {id}"))?;
        if removed > 0 {
            info!(id, "deleted prediction");
        }
        Ok(removed > 0)
    }

    pub fn insert_odds(&self, record: &OddsRecord) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO football_odds (
                    team1, team2, league_name, home_odds, draw_odds, away_odds,
                    over_odds, under_odds, btts_yes, btts_no
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.team1,
                    record.team2,
                    record.league_name,
                    record.home_odds,
                    record.draw_odds,
                    record.away_odds,
                    record.over_odds,
                    record.under_odds,
                    record.btts_yes,
                    record.btts_no,
                ],
            )
            .context("insert odds row")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn load_odds(&self) -> Result<Vec<OddsRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT team1, team2, league_name, home_odds, draw_odds, away_odds,
                        over_odds, under_odds, btts_yes, btts_no
                 FROM football_odds ORDER BY id ASC",
            )
            .context("prepare odds scan")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(OddsRecord {
                    team1: row.get("team1")?,
                    team2: row.get("team2")?,
                    league_name: row.get::<_, Option<String>>("league_name")?.unwrap_or_default(),
                    home_odds: row.get("home_odds")?,
                    draw_odds: row.get("draw_odds")?,
                    away_odds: row.get("away_odds")?,
                    over_odds: row.get("over_odds")?,
                    under_odds: row.get("under_odds")?,
                    btts_yes: row.get("btts_yes")?,
                    btts_no: row.get("btts_no")?,
                })
            })
            .context("query odds")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode odds row")?);
        }
        Ok(out)
    }
}

impl OddsSource for PredictionStore {
    fn all_odds(&self) -> Result<Vec<OddsRecord>> {
        self.load_odds()
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            league TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            predicted_outcome TEXT NOT NULL,
            actual_outcome TEXT NULL,
            home_odds REAL NULL,
            draw_odds REAL NULL,
            away_odds REAL NULL,
            confidence REAL NOT NULL,
            bet_amount REAL NOT NULL DEFAULT 1.0,
            profit_loss REAL NULL,
            status TEXT NOT NULL DEFAULT 'Pending',
            match_id TEXT NULL,
            home_score INTEGER NULL,
            away_score INTEGER NULL
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions(date);
        CREATE INDEX IF NOT EXISTS idx_predictions_status ON predictions(status);
        CREATE INDEX IF NOT EXISTS idx_predictions_match ON predictions(match_id);

        CREATE TABLE IF NOT EXISTS football_odds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team1 TEXT NOT NULL,
            team2 TEXT NOT NULL,
            league_name TEXT NULL,
            home_odds REAL NULL,
            draw_odds REAL NULL,
            away_odds REAL NULL,
            over_odds REAL NULL,
            under_odds REAL NULL,
            btts_yes REAL NULL,
            btts_no REAL NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn write_settlement(conn: &Connection, p: &Prediction) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE predictions
         SET actual_outcome = ?1, profit_loss = ?2, status = ?3,
             home_score = ?4, away_score = ?5, match_id = ?6
         WHERE id = ?7",
        params![
            p.actual_outcome.map(|o| o.as_str()),
            p.profit_loss,
            p.status.as_str(),
            p.home_score,
            p.away_score,
            p.match_id,
            p.id,
        ],
    )
}

fn prediction_from_row(row: &Row<'_>) -> rusqlite::Result<Prediction> {
    Ok(Prediction {
        id: row.get("id")?,
        date: date_column(row, "date")?,
        league: row.get("league")?,
        home_team: row.get("home_team")?,
        away_team: row.get("away_team")?,
        predicted_outcome: parsed_column(row, "predicted_outcome")?,
        actual_outcome: optional_parsed_column(row, "actual_outcome")?,
        home_odds: row.get("home_odds")?,
        draw_odds: row.get("draw_odds")?,
        away_odds: row.get("away_odds")?,
        confidence: row.get("confidence")?,
        bet_amount: row.get("bet_amount")?,
        profit_loss: row.get("profit_loss")?,
        status: parsed_column(row, "status")?,
        match_id: row.get("match_id")?,
        home_score: row.get("home_score")?,
        away_score: row.get("away_score")?,
    })
}

fn date_column(row: &Row<'_>, name: &str) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(name)?;
    // Some rows carry a time component after the date.
    let day = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|err| {
        conversion_error(row, name, Box::new(err))
    })
}

fn parsed_column<T>(row: &Row<'_>, name: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    let raw: String = row.get(name)?;
    raw.parse::<T>()
        .map_err(|err| conversion_error(row, name, err.into()))
}

fn optional_parsed_column<T>(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    let raw: Option<String> = row.get(name)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse::<T>()
            .map(Some)
            .map_err(|err| conversion_error(row, name, err.into())),
    }
}

fn conversion_error(
    row: &Row<'_>,
    name: &str,
    err: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> rusqlite::Error {
    let idx = row.as_ref().column_index(name).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err)
}
