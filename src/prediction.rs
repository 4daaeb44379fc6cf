use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Home => "HOME",
            Outcome::Draw => "DRAW",
            Outcome::Away => "AWAY",
        }
    }

    pub fn from_scores(home: i32, away: i32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Outcome::Home,
            std::cmp::Ordering::Less => Outcome::Away,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOME" => Ok(Outcome::Home),
            "DRAW" => Ok(Outcome::Draw),
            "AWAY" => Ok(Outcome::Away),
            other => Err(anyhow!("unknown outcome {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    // Older rows were written with a lowercase status.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Pending" | "pending" => Ok(Status::Pending),
            "Completed" | "completed" => Ok(Status::Completed),
            other => Err(anyhow!("unknown prediction status {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: i64,
    pub date: NaiveDate,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub predicted_outcome: Outcome,
    pub actual_outcome: Option<Outcome>,
    pub home_odds: Option<f64>,
    pub draw_odds: Option<f64>,
    pub away_odds: Option<f64>,
    pub confidence: f64,
    pub bet_amount: f64,
    pub profit_loss: Option<f64>,
    pub status: Status,
    pub match_id: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl Prediction {
    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    pub fn is_correct(&self) -> bool {
        self.actual_outcome == Some(self.predicted_outcome)
    }

    /// Decimal odds for `outcome`, only when all three prices are present and above 1.
    pub fn odds_for(&self, outcome: Outcome) -> Option<f64> {
        let valid = |o: Option<f64>| o.filter(|v| v.is_finite() && *v > 1.0);
        let (home, draw, away) = (
            valid(self.home_odds)?,
            valid(self.draw_odds)?,
            valid(self.away_odds)?,
        );
        Some(match outcome {
            Outcome::Home => home,
            Outcome::Draw => draw,
            Outcome::Away => away,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub date: NaiveDate,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub predicted_outcome: Outcome,
    pub home_odds: Option<f64>,
    pub draw_odds: Option<f64>,
    pub away_odds: Option<f64>,
    pub confidence: f64,
    pub bet_amount: f64,
    pub match_id: Option<String>,
}

impl NewPrediction {
    pub fn new(
        date: NaiveDate,
        league: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        predicted_outcome: Outcome,
        confidence: f64,
    ) -> Self {
        Self {
            date,
            league: league.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            predicted_outcome,
            home_odds: None,
            draw_odds: None,
            away_odds: None,
            confidence: confidence.clamp(0.0, 100.0),
            bet_amount: 1.0,
            match_id: None,
        }
    }

    pub fn with_odds(mut self, home: f64, draw: f64, away: f64) -> Self {
        self.home_odds = Some(home);
        self.draw_odds = Some(draw);
        self.away_odds = Some(away);
        self
    }

    pub fn with_match_id(mut self, match_id: impl Into<String>) -> Self {
        self.match_id = Some(match_id.into());
        self
    }

    pub fn with_bet_amount(mut self, amount: f64) -> Self {
        self.bet_amount = amount;
        self
    }

    pub fn into_prediction(self, id: i64) -> Prediction {
        Prediction {
            id,
            date: self.date,
            league: self.league,
            home_team: self.home_team,
            away_team: self.away_team,
            predicted_outcome: self.predicted_outcome,
            actual_outcome: None,
            home_odds: self.home_odds,
            draw_odds: self.draw_odds,
            away_odds: self.away_odds,
            confidence: self.confidence,
            bet_amount: self.bet_amount,
            profit_loss: None,
            status: Status::Pending,
            match_id: self.match_id,
            home_score: None,
            away_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Outcome, Status};

    #[test]
    fn outcome_from_scores() {
        assert_eq!(Outcome::from_scores(2, 1), Outcome::Home);
        assert_eq!(Outcome::from_scores(0, 1), Outcome::Away);
        assert_eq!(Outcome::from_scores(3, 3), Outcome::Draw);
    }

    #[test]
    fn parses_legacy_status() {
        assert_eq!("pending".parse::<Status>().unwrap(), Status::Pending);
        assert_eq!("Completed".parse::<Status>().unwrap(), Status::Completed);
        assert!("settled".parse::<Status>().is_err());
    }

    #[test]
    fn outcome_round_trips_through_text() {
        for o in [Outcome::Home, Outcome::Draw, Outcome::Away] {
            assert_eq!(o.as_str().parse::<Outcome>().unwrap(), o);
        }
        assert_eq!("away".parse::<Outcome>().unwrap(), Outcome::Away);
    }
}
