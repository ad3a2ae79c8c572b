use chrono::{DateTime, Utc};

use crate::error::ForecastError;

/// Match state as reported by the data provider.
///
/// Only the three finished variants count toward a team's form; every other
/// state is treated as "not played yet" (or never played).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    FullTime,
    AfterExtraTime,
    AfterPenalties,
    Scheduled,
    InPlay,
    Paused,
    Postponed,
    Suspended,
    Cancelled,
    Unknown,
}

impl MatchStatus {
    /// Parses a short status code. Accepts both API-Sports short codes (`FT`,
    /// `AET`, `PEN`, `NS`, ...) and football-data.org codes (`FINISHED`,
    /// `SCHEDULED`, ...). A bare `FINISHED` maps to full time; callers that
    /// know the match duration should use [`MatchStatus::finished_with_duration`].
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "FT" | "FINISHED" | "AWD" | "WO" => MatchStatus::FullTime,
            "AET" => MatchStatus::AfterExtraTime,
            "PEN" => MatchStatus::AfterPenalties,
            "NS" | "TBD" | "SCHEDULED" | "TIMED" => MatchStatus::Scheduled,
            "1H" | "2H" | "ET" | "P" | "BT" | "LIVE" | "IN_PLAY" => MatchStatus::InPlay,
            "HT" | "PAUSED" | "INT" => MatchStatus::Paused,
            "PST" | "POSTPONED" => MatchStatus::Postponed,
            "SUSP" | "SUSPENDED" => MatchStatus::Suspended,
            "CANC" | "ABD" | "CANCELLED" | "CANCELED" => MatchStatus::Cancelled,
            _ => MatchStatus::Unknown,
        }
    }

    /// football-data.org reports `FINISHED` plus a separate `score.duration`.
    pub fn finished_with_duration(duration: Option<&str>) -> Self {
        match duration.map(|d| d.trim().to_ascii_uppercase()).as_deref() {
            Some("EXTRA_TIME") => MatchStatus::AfterExtraTime,
            Some("PENALTY_SHOOTOUT") => MatchStatus::AfterPenalties,
            _ => MatchStatus::FullTime,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            MatchStatus::FullTime | MatchStatus::AfterExtraTime | MatchStatus::AfterPenalties
        )
    }

    /// Short display code, API-Sports flavoured.
    pub fn code(self) -> &'static str {
        match self {
            MatchStatus::FullTime => "FT",
            MatchStatus::AfterExtraTime => "AET",
            MatchStatus::AfterPenalties => "PEN",
            MatchStatus::Scheduled => "NS",
            MatchStatus::InPlay => "LIVE",
            MatchStatus::Paused => "HT",
            MatchStatus::Postponed => "PST",
            MatchStatus::Suspended => "SUSP",
            MatchStatus::Cancelled => "CANC",
            MatchStatus::Unknown => "?",
        }
    }
}

/// One fixture as seen from the league data source, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub id: u64,
    pub utc_date: DateTime<Utc>,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub status: MatchStatus,
}

impl MatchResult {
    pub fn involves(&self, team_id: u32) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamOutcome {
    Win,
    Draw,
    Loss,
    Undetermined,
}

impl TeamOutcome {
    pub fn letter(self) -> char {
        match self {
            TeamOutcome::Win => 'W',
            TeamOutcome::Draw => 'D',
            TeamOutcome::Loss => 'L',
            TeamOutcome::Undetermined => '-',
        }
    }

    pub fn is_determined(self) -> bool {
        self != TeamOutcome::Undetermined
    }
}

/// Result of `m` from the point of view of `team_id`.
///
/// Unfinished matches are `Undetermined`. A match that does not involve the
/// team is a caller bug and is reported, never guessed.
pub fn classify_outcome(m: &MatchResult, team_id: u32) -> Result<TeamOutcome, ForecastError> {
    if !m.involves(team_id) {
        tracing::error!(
            match_id = m.id,
            team_id,
            home_team_id = m.home_team_id,
            away_team_id = m.away_team_id,
            "history entry does not involve the requested team"
        );
        return Err(ForecastError::InvalidInput {
            match_id: m.id,
            team_id,
            home_team_id: m.home_team_id,
            away_team_id: m.away_team_id,
        });
    }

    if !m.status.is_finished() {
        return Ok(TeamOutcome::Undetermined);
    }

    // A finished match should always carry a score.
    let home = m.home_goals.unwrap_or(0);
    let away = m.away_goals.unwrap_or(0);
    if home == away {
        return Ok(TeamOutcome::Draw);
    }

    let won = if team_id == m.home_team_id {
        home > away
    } else {
        away > home
    };
    Ok(if won { TeamOutcome::Win } else { TeamOutcome::Loss })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn finished(home: u32, away: u32, hg: u32, ag: u32) -> MatchResult {
        MatchResult {
            id: 1,
            utc_date: Utc.with_ymd_and_hms(2024, 3, 2, 15, 0, 0).unwrap(),
            home_team_id: home,
            away_team_id: away,
            home_goals: Some(hg),
            away_goals: Some(ag),
            status: MatchStatus::FullTime,
        }
    }

    #[test]
    fn status_codes_from_both_vocabularies() {
        assert!(MatchStatus::from_code("FT").is_finished());
        assert!(MatchStatus::from_code("aet").is_finished());
        assert!(MatchStatus::from_code("PEN").is_finished());
        assert!(MatchStatus::from_code("FINISHED").is_finished());
        assert!(!MatchStatus::from_code("NS").is_finished());
        assert!(!MatchStatus::from_code("TIMED").is_finished());
        assert!(!MatchStatus::from_code("IN_PLAY").is_finished());
        assert!(!MatchStatus::from_code("POSTPONED").is_finished());
        assert_eq!(MatchStatus::from_code("what"), MatchStatus::Unknown);
    }

    #[test]
    fn duration_refines_finished() {
        assert_eq!(
            MatchStatus::finished_with_duration(Some("PENALTY_SHOOTOUT")),
            MatchStatus::AfterPenalties
        );
        assert_eq!(
            MatchStatus::finished_with_duration(Some("EXTRA_TIME")),
            MatchStatus::AfterExtraTime
        );
        assert_eq!(
            MatchStatus::finished_with_duration(None),
            MatchStatus::FullTime
        );
    }

    #[test]
    fn home_and_away_perspectives() {
        let m = finished(10, 20, 2, 1);
        assert_eq!(classify_outcome(&m, 10).unwrap(), TeamOutcome::Win);
        assert_eq!(classify_outcome(&m, 20).unwrap(), TeamOutcome::Loss);

        let d = finished(10, 20, 1, 1);
        assert_eq!(classify_outcome(&d, 10).unwrap(), TeamOutcome::Draw);
        assert_eq!(classify_outcome(&d, 20).unwrap(), TeamOutcome::Draw);
    }

    #[test]
    fn missing_score_on_finished_match_is_goalless() {
        let mut m = finished(10, 20, 0, 0);
        m.home_goals = None;
        m.away_goals = Some(1);
        assert_eq!(classify_outcome(&m, 20).unwrap(), TeamOutcome::Win);
        m.away_goals = None;
        assert_eq!(classify_outcome(&m, 10).unwrap(), TeamOutcome::Draw);
    }

    #[test]
    fn unfinished_is_undetermined() {
        let mut m = finished(10, 20, 3, 0);
        m.status = MatchStatus::Scheduled;
        assert_eq!(classify_outcome(&m, 10).unwrap(), TeamOutcome::Undetermined);
    }

    #[test]
    fn foreign_team_is_rejected() {
        let m = finished(10, 20, 1, 0);
        let err = classify_outcome(&m, 30).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput { team_id: 30, .. }));
    }
}
