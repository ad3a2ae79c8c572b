use crate::error::ForecastError;
use crate::match_result::{MatchResult, TeamOutcome, classify_outcome};

pub const DEFAULT_HISTORY_LEN: usize = 15;
pub const DEFAULT_RECENT_MATCHES: usize = 5;
pub const DEFAULT_RECENT_WEIGHT: f64 = 3.0;
pub const DEFAULT_BASE_WEIGHT: f64 = 1.0;

/// How much each slot of a most-recent-first history counts.
///
/// The first `recent_matches` slots get `recent_weight`, the rest up to
/// `history_len` get `base_weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightingPolicy {
    pub history_len: usize,
    pub recent_matches: usize,
    pub recent_weight: f64,
    pub base_weight: f64,
}

impl Default for WeightingPolicy {
    fn default() -> Self {
        Self {
            history_len: DEFAULT_HISTORY_LEN,
            recent_matches: DEFAULT_RECENT_MATCHES,
            recent_weight: DEFAULT_RECENT_WEIGHT,
            base_weight: DEFAULT_BASE_WEIGHT,
        }
    }
}

impl WeightingPolicy {
    pub fn weights(&self) -> Vec<f64> {
        let recent = self.recent_weight.max(0.0);
        let base = self.base_weight.max(0.0);
        (0..self.history_len)
            .map(|i| if i < self.recent_matches { recent } else { base })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedForm {
    pub weighted_wins: f64,
    pub weighted_draws: f64,
    pub weighted_losses: f64,
    pub total_weight: f64,
    pub matches_counted: usize,
}

impl WeightedForm {
    /// Denominator for rates: the total weight, or 1 when nothing was counted.
    pub fn effective_total(&self) -> f64 {
        if self.total_weight > 0.0 {
            self.total_weight
        } else {
            1.0
        }
    }

    /// (win, draw, loss) rates over the effective total.
    pub fn rates(&self) -> (f64, f64, f64) {
        let total = self.effective_total();
        (
            self.weighted_wins / total,
            self.weighted_draws / total,
            self.weighted_losses / total,
        )
    }

    fn add(&mut self, outcome: TeamOutcome, weight: f64) {
        match outcome {
            TeamOutcome::Win => self.weighted_wins += weight,
            TeamOutcome::Draw => self.weighted_draws += weight,
            TeamOutcome::Loss => self.weighted_losses += weight,
            TeamOutcome::Undetermined => return,
        }
        self.total_weight += weight;
        self.matches_counted += 1;
    }
}

/// Weighted win/draw/loss totals for `team_id`.
///
/// `matches` is most-recent-first and `weights[i]` applies to `matches[i]`;
/// anything past the shorter of the two is ignored. Unfinished matches add
/// nothing, not even to the total weight.
pub fn compute_weighted_form(
    matches: &[MatchResult],
    team_id: u32,
    weights: &[f64],
) -> Result<WeightedForm, ForecastError> {
    let mut form = WeightedForm::default();
    for (m, &w) in matches.iter().zip(weights) {
        let outcome = classify_outcome(m, team_id)?;
        form.add(outcome, w.max(0.0));
    }
    Ok(form)
}

/// Letters of the `limit` most recent finished matches, e.g. `"WWDLW"`.
pub fn form_string(
    matches: &[MatchResult],
    team_id: u32,
    limit: usize,
) -> Result<String, ForecastError> {
    let mut out = String::with_capacity(limit);
    for m in matches {
        if out.len() >= limit {
            break;
        }
        let outcome = classify_outcome(m, team_id)?;
        if outcome.is_determined() {
            out.push(outcome.letter());
        }
    }
    Ok(out)
}

/// The finished matches of `matches`, order kept. Every entry is still
/// checked against `team_id`, unfinished ones included.
pub fn finished_matches(
    matches: &[MatchResult],
    team_id: u32,
) -> Result<Vec<MatchResult>, ForecastError> {
    let mut out = Vec::with_capacity(matches.len());
    for m in matches {
        if classify_outcome(m, team_id)?.is_determined() {
            out.push(m.clone());
        }
    }
    Ok(out)
}
