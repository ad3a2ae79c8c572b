use std::sync::Arc;

use thiserror::Error;

/// Raised by the forecaster when its input breaks the history contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error(
        "match {match_id} ({home_team_id} vs {away_team_id}) does not involve team {team_id}"
    )]
    InvalidInput {
        match_id: u64,
        team_id: u32,
        home_team_id: u32,
        away_team_id: u32,
    },
}

/// A provider payload that could not be turned into a valid match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("match {match_id}: missing field `{field}`")]
    MissingField { match_id: u64, field: &'static str },
    #[error("match {match_id}: invalid kickoff date `{raw}`")]
    InvalidDate { match_id: u64, raw: String },
    #[error("match {match_id}: invalid goal count `{raw}` in `{field}`")]
    InvalidScore {
        match_id: u64,
        field: &'static str,
        raw: String,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("FOOTBALL_DATA_API_KEY is not set")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("invalid response json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("http cache: {0}")]
    Cache(String),
}

/// Why a single board row has no forecast.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("history unavailable for team {team_id}: {source}")]
    Fetch {
        team_id: u32,
        #[source]
        source: Arc<FetchError>,
    },
    #[error(transparent)]
    Forecast(#[from] ForecastError),
}
