use crate::error::FetchError;
use crate::match_result::MatchResult;

/// Source of a team's recent fixtures.
///
/// Implementations return at most `count` matches ordered most recent first.
/// The list may be shorter and may contain unfinished matches.
pub trait MatchHistoryProvider: Sync {
    fn fetch_recent_matches(&self, team_id: u32, count: usize)
    -> Result<Vec<MatchResult>, FetchError>;
}

/// Sorts by kickoff, newest first, and keeps `count` entries.
///
/// Providers must not rely on the upstream order; this is where the
/// most-recent-first contract is enforced.
pub fn most_recent_first(mut matches: Vec<MatchResult>, count: usize) -> Vec<MatchResult> {
    matches.sort_by(|a, b| b.utc_date.cmp(&a.utc_date).then(b.id.cmp(&a.id)));
    matches.dedup_by_key(|m| m.id);
    matches.truncate(count);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_result::MatchStatus;
    use chrono::{Duration, TimeZone, Utc};

    fn on_day(id: u64, day: i64) -> MatchResult {
        MatchResult {
            id,
            utc_date: Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap() + Duration::days(day),
            home_team_id: 1,
            away_team_id: 2,
            home_goals: Some(1),
            away_goals: Some(0),
            status: MatchStatus::FullTime,
        }
    }

    #[test]
    fn ascending_feed_is_reversed_and_truncated() {
        let feed = (0..6).map(|d| on_day(d as u64 + 100, d)).collect::<Vec<_>>();
        let out = most_recent_first(feed, 4);
        let ids = out.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![105, 104, 103, 102]);
    }

    #[test]
    fn duplicate_ids_collapse() {
        let feed = vec![on_day(7, 1), on_day(7, 1), on_day(8, 0)];
        let out = most_recent_first(feed, 10);
        assert_eq!(out.len(), 2);
    }
}
