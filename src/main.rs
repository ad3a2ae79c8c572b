use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};

use prono_expert::board::{BoardRow, FORM_DISPLAY_LEN, load_board};
use prono_expert::config::AppConfig;
use prono_expert::error::BoardError;
use prono_expert::football_data::{BoardQuery, FootballDataClient};
use prono_expert::forecast::{Forecast, ForecastRequest, ForecastResult};
use prono_expert::form::form_string;
use prono_expert::history::MatchHistoryProvider;
use prono_expert::logging;

const USAGE: &str = "usage: prono_expert [--date YYYY-MM-DD] [--competition CODE]
       prono_expert --fixture HOME_ID AWAY_ID [--date YYYY-MM-DD]";

#[derive(Debug, Default)]
struct Args {
    date: Option<NaiveDate>,
    competition: Option<String>,
    fixture: Option<(u32, u32)>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = AppConfig::from_env();
    logging::init(&cfg.logging);

    let args = parse_args(std::env::args().skip(1).collect())?;
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let client = FootballDataClient::new(cfg.api.clone(), date);

    if let Some((home_id, away_id)) = args.fixture {
        return run_fixture(&client, &cfg, home_id, away_id);
    }

    let query = BoardQuery {
        date,
        competition: args.competition,
    };
    let rows = load_board(&client, &query, &cfg.forecaster, cfg.fetch_parallelism)
        .with_context(|| format!("failed to load fixtures for {date}"))?;

    println!(
        "PronoExpert  {}  {}",
        date.format("%a %d %b %Y"),
        query.competition.as_deref().unwrap_or("all competitions")
    );
    if rows.is_empty() {
        println!("No fixtures.");
    }
    for row in &rows {
        print_row(row);
    }
    Ok(())
}

fn run_fixture(
    client: &FootballDataClient,
    cfg: &AppConfig,
    home_id: u32,
    away_id: u32,
) -> Result<()> {
    let count = cfg.forecaster.weighting.history_len;
    let home_history = client
        .fetch_recent_matches(home_id, count)
        .with_context(|| format!("history for team {home_id}"))?;
    let away_history = client
        .fetch_recent_matches(away_id, count)
        .with_context(|| format!("history for team {away_id}"))?;

    println!(
        "#{home_id:<8} {}",
        form_string(&home_history, home_id, FORM_DISPLAY_LEN)?
    );
    println!(
        "#{away_id:<8} {}",
        form_string(&away_history, away_id, FORM_DISPLAY_LEN)?
    );

    let forecast = cfg.forecaster.forecast(&ForecastRequest {
        home_team_id: home_id,
        away_team_id: away_id,
        home_history: &home_history,
        away_history: &away_history,
    })?;
    println!("{}", describe_forecast(&forecast));
    Ok(())
}

fn print_row(row: &BoardRow) {
    let f = &row.fixture;
    println!();
    println!(
        "{}  [{}] {} - {}  ({})",
        f.result.utc_date.format("%H:%M"),
        f.competition_code.as_deref().unwrap_or(&f.competition_name),
        f.home_name,
        f.away_name,
        f.result.status.code()
    );
    if let (Some(h), Some(a)) = (f.result.home_goals, f.result.away_goals) {
        println!("  score      {h} - {a}");
    }
    println!(
        "  form       {:<16} {}",
        row.home_form.as_deref().unwrap_or("N/A"),
        row.away_form.as_deref().unwrap_or("N/A")
    );
    match &row.forecast {
        Ok(forecast) => println!("  {}", describe_forecast(forecast)),
        Err(BoardError::Fetch { team_id, source }) => {
            println!("  history unavailable for team {team_id}: {source}")
        }
        Err(err) => println!("  forecast failed: {err}"),
    }
}

fn describe_forecast(forecast: &Forecast) -> String {
    match forecast {
        Forecast::Ready(ForecastResult {
            probabilities: p,
            odds,
        }) => format!(
            "1 {:>5.1}% @{:<7} X {:>5.1}% @{:<7} 2 {:>5.1}% @{}",
            p.home_win * 100.0,
            odds.home,
            p.draw * 100.0,
            odds.draw,
            p.away_win * 100.0,
            odds.away
        ),
        Forecast::InsufficientData {
            required,
            home_finished,
            away_finished,
        } => format!(
            "not enough data: {required} finished matches needed per team \
             (home {home_finished}, away {away_finished})"
        ),
    }
}

fn parse_args(args: Vec<String>) -> Result<Args> {
    let mut out = Args::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--date" => {
                let raw = iter.next().ok_or_else(|| anyhow!("--date needs a value\n{USAGE}"))?;
                let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .with_context(|| format!("invalid date `{raw}`"))?;
                out.date = Some(date);
            }
            "--competition" => {
                let code = iter
                    .next()
                    .ok_or_else(|| anyhow!("--competition needs a value\n{USAGE}"))?;
                out.competition = Some(code.trim().to_ascii_uppercase());
            }
            "--fixture" => {
                let mut id = |side: &str| -> Result<u32> {
                    let raw = iter
                        .next()
                        .ok_or_else(|| anyhow!("--fixture needs HOME_ID AWAY_ID\n{USAGE}"))?;
                    raw.trim()
                        .parse::<u32>()
                        .with_context(|| format!("invalid {side} team id `{raw}`"))
                };
                let home = id("home")?;
                let away = id("away")?;
                out.fixture = Some((home, away));
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(anyhow!("unknown argument `{other}`\n{USAGE}")),
        }
    }
    Ok(out)
}
