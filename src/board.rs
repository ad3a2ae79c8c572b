use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{BoardError, FetchError};
use crate::football_data::{BoardQuery, FootballDataClient, Fixture};
use crate::forecast::{Forecast, ForecastRequest, Forecaster};
use crate::form::form_string;
use crate::history::MatchHistoryProvider;
use crate::match_result::MatchResult;

pub const FORM_DISPLAY_LEN: usize = 15;

#[derive(Debug)]
pub struct BoardRow {
    pub fixture: Fixture,
    pub home_form: Option<String>,
    pub away_form: Option<String>,
    pub forecast: Result<Forecast, BoardError>,
}

type History = Result<Vec<MatchResult>, Arc<FetchError>>;

pub fn load_board(
    client: &FootballDataClient,
    query: &BoardQuery,
    forecaster: &Forecaster,
    parallelism: usize,
) -> Result<Vec<BoardRow>, FetchError> {
    let fixtures = client.matches_on(query)?;
    info!(
        date = %query.date,
        competition = query.competition.as_deref().unwrap_or("all"),
        fixtures = fixtures.len(),
        "building board"
    );
    Ok(forecast_board(fixtures, client, forecaster, parallelism))
}

/// Forecasts every fixture. Each team's history is fetched once, in parallel;
/// a failed fetch only affects the rows of that team.
pub fn forecast_board<P: MatchHistoryProvider>(
    fixtures: Vec<Fixture>,
    provider: &P,
    forecaster: &Forecaster,
    parallelism: usize,
) -> Vec<BoardRow> {
    let team_ids = fixtures
        .iter()
        .flat_map(|f| [f.result.home_team_id, f.result.away_team_id])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    let count = forecaster.weighting.history_len;
    let histories: HashMap<u32, History> = with_fetch_pool(parallelism, || {
        team_ids
            .par_iter()
            .map(|&team_id| {
                let history = provider
                    .fetch_recent_matches(team_id, count)
                    .map_err(|err| {
                        warn!(team_id, error = %err, "history fetch failed");
                        Arc::new(err)
                    });
                (team_id, history)
            })
            .collect()
    });

    fixtures
        .into_iter()
        .map(|fixture| build_row(fixture, &histories, forecaster))
        .collect()
}

fn build_row(
    fixture: Fixture,
    histories: &HashMap<u32, History>,
    forecaster: &Forecaster,
) -> BoardRow {
    let home_id = fixture.result.home_team_id;
    let away_id = fixture.result.away_team_id;
    let home = lookup(histories, home_id);
    let away = lookup(histories, away_id);

    let home_form = home
        .as_ref()
        .ok()
        .and_then(|h| form_string(h, home_id, FORM_DISPLAY_LEN).ok());
    let away_form = away
        .as_ref()
        .ok()
        .and_then(|h| form_string(h, away_id, FORM_DISPLAY_LEN).ok());

    let forecast = match (home, away) {
        (Ok(home_history), Ok(away_history)) => forecaster
            .forecast(&ForecastRequest {
                home_team_id: home_id,
                away_team_id: away_id,
                home_history,
                away_history,
            })
            .map_err(BoardError::from),
        (Err(source), _) => Err(BoardError::Fetch {
            team_id: home_id,
            source,
        }),
        (_, Err(source)) => Err(BoardError::Fetch {
            team_id: away_id,
            source,
        }),
    };

    BoardRow {
        fixture,
        home_form,
        away_form,
        forecast,
    }
}

fn lookup(
    histories: &HashMap<u32, History>,
    team_id: u32,
) -> Result<&[MatchResult], Arc<FetchError>> {
    match histories.get(&team_id) {
        Some(Ok(matches)) => Ok(matches.as_slice()),
        Some(Err(err)) => Err(Arc::clone(err)),
        None => Ok(&[]),
    }
}

fn with_fetch_pool<T: Send>(threads: usize, action: impl FnOnce() -> T + Send) -> T {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(action),
        Err(err) => {
            warn!(error = %err, "fetch pool unavailable, running on the global pool");
            action()
        }
    }
}
