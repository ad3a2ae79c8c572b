use crate::error::ForecastError;
use crate::form::{WeightedForm, WeightingPolicy, compute_weighted_form, finished_matches};
use crate::match_result::MatchResult;

pub const MIN_MATCHES_FOR_CALC: usize = 5;
pub const SENTINEL_ODDS: &str = "999.00";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl Probabilities {
    pub fn uniform() -> Self {
        Self {
            home_win: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away_win: 1.0 / 3.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home_win + self.draw + self.away_win
    }

    /// Scales the three values to sum to 1. Falls back to uniform when they sum to 0.
    fn normalized(self) -> Self {
        let sum = self.sum();
        if sum > 0.0 && sum.is_finite() {
            Self {
                home_win: self.home_win / sum,
                draw: self.draw / sum,
                away_win: self.away_win / sum,
            }
        } else {
            Self::uniform()
        }
    }
}

/// Decimal odds, fixed to two decimals for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Odds {
    pub home: String,
    pub draw: String,
    pub away: String,
}

impl Odds {
    pub fn from_probabilities(p: &Probabilities) -> Self {
        Self {
            home: decimal_odds(p.home_win),
            draw: decimal_odds(p.draw),
            away: decimal_odds(p.away_win),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub probabilities: Probabilities,
    pub odds: Odds,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    Ready(ForecastResult),
    /// One side has fewer finished matches than `required`. Expected early in a
    /// season or for promoted teams, so it is a value rather than an error.
    InsufficientData {
        required: usize,
        home_finished: usize,
        away_finished: usize,
    },
}

impl Forecast {
    pub fn result(&self) -> Option<&ForecastResult> {
        match self {
            Forecast::Ready(r) => Some(r),
            Forecast::InsufficientData { .. } => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Forecast::InsufficientData { .. })
    }
}

/// Everything one forecast needs, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct ForecastRequest<'a> {
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_history: &'a [MatchResult],
    pub away_history: &'a [MatchResult],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecaster {
    pub weighting: WeightingPolicy,
    pub min_matches: usize,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self {
            weighting: WeightingPolicy::default(),
            min_matches: MIN_MATCHES_FOR_CALC,
        }
    }
}

impl Forecaster {
    pub fn new(weighting: WeightingPolicy, min_matches: usize) -> Self {
        Self {
            weighting,
            min_matches,
        }
    }

    pub fn forecast(&self, req: &ForecastRequest<'_>) -> Result<Forecast, ForecastError> {
        let home = finished_matches(req.home_history, req.home_team_id)?;
        let away = finished_matches(req.away_history, req.away_team_id)?;
        let (home_finished, away_finished) = (home.len(), away.len());
        if home_finished < self.min_matches || away_finished < self.min_matches {
            tracing::debug!(
                home_team_id = req.home_team_id,
                away_team_id = req.away_team_id,
                home_finished,
                away_finished,
                required = self.min_matches,
                "not enough finished matches to forecast"
            );
            return Ok(Forecast::InsufficientData {
                required: self.min_matches,
                home_finished,
                away_finished,
            });
        }

        // Weight slots go to finished matches only.
        let weights = self.weighting.weights();
        let home_form = compute_weighted_form(&home, req.home_team_id, &weights)?;
        let away_form = compute_weighted_form(&away, req.away_team_id, &weights)?;
        Ok(Forecast::Ready(derive_forecast(&home_form, &away_form)))
    }
}

/// Forecast with the default policy: 15-match history, last 5 weighted 3x,
/// at least 5 finished matches per side.
pub fn forecast_match(
    home_team_id: u32,
    away_team_id: u32,
    home_history: &[MatchResult],
    away_history: &[MatchResult],
) -> Result<Forecast, ForecastError> {
    Forecaster::default().forecast(&ForecastRequest {
        home_team_id,
        away_team_id,
        home_history,
        away_history,
    })
}

/// Blends both forms into a 1X2 distribution.
///
/// A home win is backed by the home side's win rate and the away side's loss
/// rate; the two signals are averaged. Draws average both draw rates.
pub fn derive_forecast(home: &WeightedForm, away: &WeightedForm) -> ForecastResult {
    let (home_win, home_draw, home_loss) = home.rates();
    let (away_win, away_draw, away_loss) = away.rates();

    let raw = Probabilities {
        home_win: (home_win + away_loss) / 2.0,
        draw: (home_draw + away_draw) / 2.0,
        away_win: (away_win + home_loss) / 2.0,
    };

    // Second pass only trims float drift.
    let probabilities = raw.normalized().normalized();
    let odds = Odds::from_probabilities(&probabilities);
    ForecastResult {
        probabilities,
        odds,
    }
}

pub fn decimal_odds(p: f64) -> String {
    if p > 0.0 {
        format!("{:.2}", 1.0 / p)
    } else {
        SENTINEL_ODDS.to_string()
    }
}
