use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, TimeZone, Utc};

use prono_expert::board::forecast_board;
use prono_expert::error::{BoardError, FetchError};
use prono_expert::football_data::Fixture;
use prono_expert::forecast::{Forecast, Forecaster};
use prono_expert::history::MatchHistoryProvider;
use prono_expert::match_result::{MatchResult, MatchStatus};

/// Canned histories keyed by team; records every fetch.
struct CannedHistory {
    histories: HashMap<u32, Vec<MatchResult>>,
    calls: Mutex<Vec<u32>>,
}

impl CannedHistory {
    fn new(histories: HashMap<u32, Vec<MatchResult>>) -> Self {
        Self {
            histories,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MatchHistoryProvider for CannedHistory {
    fn fetch_recent_matches(
        &self,
        team_id: u32,
        count: usize,
    ) -> Result<Vec<MatchResult>, FetchError> {
        self.calls.lock().unwrap().push(team_id);
        match self.histories.get(&team_id) {
            Some(h) => Ok(h.iter().take(count).cloned().collect()),
            None => Err(FetchError::Http {
                status: 404,
                message: format!("team {team_id} not found"),
            }),
        }
    }
}

fn results(team: u32, scores: &[(u32, u32)]) -> Vec<MatchResult> {
    scores
        .iter()
        .enumerate()
        .map(|(k, (f, a))| MatchResult {
            id: team as u64 * 100 + k as u64,
            utc_date: Utc.with_ymd_and_hms(2024, 5, 12, 15, 0, 0).unwrap()
                - Duration::days(7 * k as i64),
            home_team_id: team,
            away_team_id: 999,
            home_goals: Some(*f),
            away_goals: Some(*a),
            status: MatchStatus::FullTime,
        })
        .collect()
}

fn fixture(id: u64, home: u32, away: u32) -> Fixture {
    Fixture {
        result: MatchResult {
            id,
            utc_date: Utc.with_ymd_and_hms(2024, 5, 19, 15, 0, 0).unwrap(),
            home_team_id: home,
            away_team_id: away,
            home_goals: None,
            away_goals: None,
            status: MatchStatus::Scheduled,
        },
        competition_code: Some("PL".to_string()),
        competition_name: "Premier League".to_string(),
        home_name: format!("T{home}"),
        away_name: format!("T{away}"),
    }
}

#[test]
fn board_fetches_each_team_once_and_keeps_order() {
    let provider = CannedHistory::new(HashMap::from([
        (1, results(1, &[(2, 0); 6])),
        (2, results(2, &[(0, 1); 6])),
        (3, results(3, &[(1, 1); 6])),
    ]));
    // Team 1 plays twice on the same board (e.g. a replayed fixture).
    let fixtures = vec![fixture(10, 1, 2), fixture(11, 3, 1)];

    let rows = forecast_board(fixtures, &provider, &Forecaster::default(), 2);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].fixture.result.id, 10);
    assert_eq!(rows[1].fixture.result.id, 11);

    let mut calls = provider.calls.lock().unwrap().clone();
    calls.sort_unstable();
    assert_eq!(calls, vec![1, 2, 3]);

    assert_eq!(rows[0].home_form.as_deref(), Some("WWWWWW"));
    assert_eq!(rows[0].away_form.as_deref(), Some("LLLLLL"));
    let first = rows[0].forecast.as_ref().expect("forecast");
    let p = first.result().expect("enough data").probabilities;
    assert!(p.home_win > 0.9);
}

#[test]
fn failed_history_only_affects_its_rows() {
    let provider = CannedHistory::new(HashMap::from([
        (1, results(1, &[(2, 0); 6])),
        (2, results(2, &[(0, 1); 6])),
    ]));
    let fixtures = vec![fixture(20, 1, 2), fixture(21, 7, 1)];

    let rows = forecast_board(fixtures, &provider, &Forecaster::default(), 4);
    assert!(rows[0].forecast.is_ok());
    assert!(matches!(
        rows[1].forecast,
        Err(BoardError::Fetch { team_id: 7, .. })
    ));
    assert!(rows[1].home_form.is_none());
    assert_eq!(rows[1].away_form.as_deref(), Some("WWWWWW"));
}

#[test]
fn short_history_is_reported_not_failed() {
    let provider = CannedHistory::new(HashMap::from([
        (1, results(1, &[(2, 0); 3])),
        (2, results(2, &[(0, 1); 6])),
    ]));
    let rows = forecast_board(vec![fixture(30, 1, 2)], &provider, &Forecaster::default(), 1);
    match &rows[0].forecast {
        Ok(Forecast::InsufficientData {
            required,
            home_finished,
            away_finished,
        }) => {
            assert_eq!(*required, 5);
            assert_eq!(*home_finished, 3);
            assert_eq!(*away_finished, 6);
        }
        other => panic!("unexpected {other:?}"),
    }
}
