//! football-data.org v4 payloads and the validation step that turns them into
//! [`MatchResult`]s. Nothing past this module sees raw provider JSON.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{FetchError, IngestError};
use crate::history::{MatchHistoryProvider, most_recent_first};
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::match_result::{MatchResult, MatchStatus};

const MATCHES_PATH: &str = "/v4/matches";

/// One day of fixtures, optionally limited to a competition code (`PL`, `SA`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardQuery {
    pub date: NaiveDate,
    pub competition: Option<String>,
}

/// A validated fixture plus the labels the board prints.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub result: MatchResult,
    pub competition_code: Option<String>,
    pub competition_name: String,
    pub home_name: String,
    pub away_name: String,
}

#[derive(Debug, Default)]
pub struct Ingested {
    pub fixtures: Vec<Fixture>,
    pub rejected: Vec<IngestError>,
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<ApiMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    id: u64,
    utc_date: Option<String>,
    status: Option<String>,
    competition: Option<ApiCompetition>,
    home_team: Option<ApiTeam>,
    away_team: Option<ApiTeam>,
    score: Option<ApiScore>,
}

#[derive(Debug, Deserialize)]
struct ApiCompetition {
    name: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTeam {
    id: Option<u32>,
    name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiScore {
    duration: Option<String>,
    full_time: Option<ApiScoreLine>,
    regular_time: Option<ApiScoreLine>,
    extra_time: Option<ApiScoreLine>,
    penalties: Option<ApiScoreLine>,
}

/// Goal counts are kept raw so one bad value rejects its match, not the payload.
#[derive(Debug, Default, Deserialize)]
struct ApiScoreLine {
    home: Option<Value>,
    away: Option<Value>,
}

/// Validated score lines of a finished match.
#[derive(Debug, Clone, Copy, Default)]
struct Score {
    full_time: Option<ScoreLine>,
    regular_time: Option<ScoreLine>,
    extra_time: Option<ScoreLine>,
    penalties: Option<ScoreLine>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ScoreLine {
    home: Option<u32>,
    away: Option<u32>,
}

impl ScoreLine {
    fn is_set(&self) -> bool {
        self.home.is_some() || self.away.is_some()
    }
}

/// Parses a `/v4/matches` or `/v4/teams/{id}/matches` body.
///
/// `null` or an empty body is an empty list. Entries that fail validation are
/// returned in `rejected` instead of failing the whole payload.
pub fn parse_matches_json(raw: &str) -> Result<Ingested, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Ingested::default());
    }
    let resp: MatchesResponse = serde_json::from_str(trimmed)?;

    let mut out = Ingested::default();
    for m in resp.matches {
        match validate_match(m) {
            Ok(fixture) => out.fixtures.push(fixture),
            Err(err) => out.rejected.push(err),
        }
    }
    Ok(out)
}

fn validate_match(m: ApiMatch) -> Result<Fixture, IngestError> {
    let match_id = m.id;
    let missing = |field| IngestError::MissingField { match_id, field };

    let raw_date = m.utc_date.ok_or_else(|| missing("utcDate"))?;
    let utc_date = DateTime::parse_from_rfc3339(&raw_date)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| IngestError::InvalidDate {
            match_id,
            raw: raw_date.clone(),
        })?;

    let home = m.home_team.ok_or_else(|| missing("homeTeam"))?;
    let away = m.away_team.ok_or_else(|| missing("awayTeam"))?;
    let home_team_id = home.id.ok_or_else(|| missing("homeTeam.id"))?;
    let away_team_id = away.id.ok_or_else(|| missing("awayTeam.id"))?;

    let code = m.status.ok_or_else(|| missing("status"))?;
    let duration = m.score.as_ref().and_then(|s| s.duration.as_deref());
    let status = match MatchStatus::from_code(&code) {
        MatchStatus::FullTime if code.eq_ignore_ascii_case("FINISHED") => {
            MatchStatus::finished_with_duration(duration)
        }
        other => other,
    };

    let (home_goals, away_goals) = match m.score.as_ref() {
        Some(score) if status.is_finished() => {
            match_goals(&validate_score(score, match_id)?, status)
        }
        _ => (None, None),
    };

    let (competition_code, competition_name) = match m.competition {
        Some(c) => (c.code, c.name.unwrap_or_default()),
        None => (None, String::new()),
    };

    Ok(Fixture {
        result: MatchResult {
            id: match_id,
            utc_date,
            home_team_id,
            away_team_id,
            home_goals,
            away_goals,
            status,
        },
        competition_code,
        competition_name,
        home_name: team_label(&home),
        away_name: team_label(&away),
    })
}

fn validate_score(score: &ApiScore, match_id: u64) -> Result<Score, IngestError> {
    let line = |raw: &Option<ApiScoreLine>,
                home: &'static str,
                away: &'static str|
     -> Result<Option<ScoreLine>, IngestError> {
        match raw {
            Some(l) => Ok(Some(ScoreLine {
                home: goal_count(l.home.as_ref(), match_id, home)?,
                away: goal_count(l.away.as_ref(), match_id, away)?,
            })),
            None => Ok(None),
        }
    };
    Ok(Score {
        full_time: line(&score.full_time, "fullTime.home", "fullTime.away")?,
        regular_time: line(&score.regular_time, "regularTime.home", "regularTime.away")?,
        extra_time: line(&score.extra_time, "extraTime.home", "extraTime.away")?,
        penalties: line(&score.penalties, "penalties.home", "penalties.away")?,
    })
}

/// `null` is an unknown count; anything but a non-negative integer is rejected.
fn goal_count(
    raw: Option<&Value>,
    match_id: u64,
    field: &'static str,
) -> Result<Option<u32>, IngestError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|g| u32::try_from(g).ok())
            .map(Some)
            .ok_or_else(|| IngestError::InvalidScore {
                match_id,
                field,
                raw: v.to_string(),
            }),
    }
}

/// Goals scored in play. For shootouts the provider's full-time line also
/// counts the penalties, so regular plus extra time is preferred.
fn match_goals(score: &Score, status: MatchStatus) -> (Option<u32>, Option<u32>) {
    let full = score.full_time.unwrap_or_default();
    if status != MatchStatus::AfterPenalties {
        return (full.home, full.away);
    }
    if let Some(regular) = score.regular_time.filter(ScoreLine::is_set) {
        let extra = score.extra_time.unwrap_or_default();
        let add = |a: Option<u32>, b: Option<u32>| Some(a.unwrap_or(0) + b.unwrap_or(0));
        return (
            add(regular.home, extra.home),
            add(regular.away, extra.away),
        );
    }
    match score.penalties.filter(ScoreLine::is_set) {
        Some(pens) => (
            full.home.map(|g| g.saturating_sub(pens.home.unwrap_or(0))),
            full.away.map(|g| g.saturating_sub(pens.away.unwrap_or(0))),
        ),
        None => (full.home, full.away),
    }
}

fn team_label(team: &ApiTeam) -> String {
    team.short_name
        .as_deref()
        .or(team.name.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", team.id.unwrap_or_default()))
}

/// Blocking football-data.org client. Histories end the day before
/// `history_until` so a past board never sees its own results.
#[derive(Debug, Clone)]
pub struct FootballDataClient {
    cfg: ApiConfig,
    history_until: NaiveDate,
}

impl FootballDataClient {
    pub fn new(cfg: ApiConfig, history_until: NaiveDate) -> Self {
        Self { cfg, history_until }
    }

    pub fn matches_on(&self, query: &BoardQuery) -> Result<Vec<Fixture>, FetchError> {
        let client = http_client(&self.cfg)?;
        let day = query.date.format("%Y-%m-%d").to_string();
        let mut params = vec![("dateFrom", day.clone()), ("dateTo", day)];
        if let Some(code) = query.competition.as_deref() {
            params.push(("competitions", code.trim().to_ascii_uppercase()));
        }
        let body = fetch_json_cached(client, &self.cfg, MATCHES_PATH, &params)?;
        let ingested = parse_matches_json(&body)?;
        log_rejected(&ingested.rejected);

        let mut fixtures = ingested.fixtures;
        fixtures.sort_by(|a, b| {
            a.result
                .utc_date
                .cmp(&b.result.utc_date)
                .then(a.result.id.cmp(&b.result.id))
        });
        debug!(date = %query.date, count = fixtures.len(), "fixtures loaded");
        Ok(fixtures)
    }

    fn history_window(&self) -> (NaiveDate, NaiveDate) {
        let to = self.history_until - Duration::days(1);
        let from = to - Duration::days(self.cfg.history_window_days);
        (from, to)
    }
}

impl MatchHistoryProvider for FootballDataClient {
    fn fetch_recent_matches(
        &self,
        team_id: u32,
        count: usize,
    ) -> Result<Vec<MatchResult>, FetchError> {
        let client = http_client(&self.cfg)?;
        let (from, to) = self.history_window();
        let path = format!("/v4/teams/{team_id}/matches");
        let params = [
            ("dateFrom", from.format("%Y-%m-%d").to_string()),
            ("dateTo", to.format("%Y-%m-%d").to_string()),
        ];
        let body = fetch_json_cached(client, &self.cfg, &path, &params)?;
        let ingested = parse_matches_json(&body)?;
        log_rejected(&ingested.rejected);

        let matches = ingested
            .fixtures
            .into_iter()
            .map(|f| f.result)
            .filter(|m| m.involves(team_id))
            .collect::<Vec<_>>();
        let matches = most_recent_first(matches, count);
        debug!(team_id, count = matches.len(), "history loaded");
        Ok(matches)
    }
}

fn log_rejected(rejected: &[IngestError]) {
    for err in rejected {
        warn!(error = %err, "skipping provider match");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shootout_goals_exclude_penalties() {
        let score = Score {
            full_time: Some(ScoreLine {
                home: Some(5),
                away: Some(4),
            }),
            regular_time: None,
            extra_time: None,
            penalties: Some(ScoreLine {
                home: Some(4),
                away: Some(3),
            }),
        };
        assert_eq!(
            match_goals(&score, MatchStatus::AfterPenalties),
            (Some(1), Some(1))
        );
    }

    #[test]
    fn shootout_prefers_regular_plus_extra() {
        let score = Score {
            full_time: Some(ScoreLine {
                home: Some(7),
                away: Some(6),
            }),
            regular_time: Some(ScoreLine {
                home: Some(1),
                away: Some(1),
            }),
            extra_time: Some(ScoreLine {
                home: Some(1),
                away: Some(1),
            }),
            penalties: None,
        };
        assert_eq!(
            match_goals(&score, MatchStatus::AfterPenalties),
            (Some(2), Some(2))
        );
    }

    #[test]
    fn goal_counts_must_be_non_negative_integers() {
        let v = |raw: &str| serde_json::from_str::<Value>(raw).unwrap();
        assert_eq!(goal_count(None, 1, "fullTime.home"), Ok(None));
        assert_eq!(goal_count(Some(&v("null")), 1, "fullTime.home"), Ok(None));
        assert_eq!(goal_count(Some(&v("3")), 1, "fullTime.home"), Ok(Some(3)));
        for bad in ["-1", "\"two\"", "1.5", "4294967296"] {
            assert!(matches!(
                goal_count(Some(&v(bad)), 1, "fullTime.away"),
                Err(IngestError::InvalidScore { field: "fullTime.away", .. })
            ));
        }
    }

    #[test]
    fn history_window_stops_before_board_day() {
        let cfg = crate::config::AppConfig::from_lookup(|_| None).api;
        let day = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        let client = FootballDataClient::new(cfg, day);
        let (from, to) = client.history_window();
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 5, 18).unwrap());
        assert_eq!((to - from).num_days(), 365);
    }
}
