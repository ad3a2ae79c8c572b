use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::{
    ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::FetchError;

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "prono_expert";
const CACHE_FILE: &str = "http_cache.json";

static CACHE: Mutex<Option<HttpCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: u64) -> bool {
        !ttl.is_zero() && now.saturating_sub(self.fetched_at) < ttl.as_secs()
    }
}

/// Error body football-data.org sends alongside 4xx answers.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// GET `path` (relative to the configured base URL) and return the body.
///
/// A cached body younger than the TTL is returned without touching the
/// network; older entries are revalidated with their validators. Transport
/// errors, 429 and 5xx are retried with a linear backoff.
pub fn fetch_json_cached(
    client: &Client,
    cfg: &ApiConfig,
    path: &str,
    query: &[(&str, String)],
) -> Result<String, FetchError> {
    let url = Url::parse_with_params(&format!("{}{}", cfg.base_url, path), query)
        .map_err(|err| FetchError::Cache(format!("bad url for {path}: {err}")))?;
    let key = url.to_string();
    let now = system_time_to_secs(SystemTime::now()).unwrap_or_default();

    let cached_entry = with_cache(|cache| cache.entries.get(&key).cloned());
    if let Some(entry) = cached_entry.as_ref()
        && entry.is_fresh(cfg.cache_ttl, now)
    {
        debug!(url = %key, "serving fresh cache entry");
        return Ok(entry.body.clone());
    }

    let mut attempt = 0u32;
    loop {
        match send_once(client, &url, cached_entry.as_ref()) {
            Ok(resp) => {
                let status = resp.status();
                if status == StatusCode::NOT_MODIFIED {
                    let Some(mut entry) = cached_entry else {
                        return Err(FetchError::Http {
                            status: status.as_u16(),
                            message: "received 304 without cache body".to_string(),
                        });
                    };
                    debug!(url = %key, "not modified");
                    entry.fetched_at = now;
                    let body = entry.body.clone();
                    store_entry(&key, entry);
                    return Ok(body);
                }

                let headers = resp.headers().clone();
                let body = resp.text()?;
                if status.is_success() {
                    store_entry(&key, entry_from(body.clone(), &headers, now));
                    return Ok(body);
                }

                if is_retryable(status) && attempt < cfg.retries {
                    attempt += 1;
                    warn!(url = %key, %status, attempt, "retrying provider request");
                    thread::sleep(cfg.backoff * attempt);
                    continue;
                }
                return Err(http_error(status, &body));
            }
            Err(err) => {
                if attempt < cfg.retries {
                    attempt += 1;
                    warn!(url = %key, error = %err, attempt, "retrying after transport error");
                    thread::sleep(cfg.backoff * attempt);
                    continue;
                }
                return Err(FetchError::Transport(err));
            }
        }
    }
}

fn send_once(
    client: &Client,
    url: &Url,
    cached: Option<&CacheEntry>,
) -> reqwest::Result<Response> {
    let mut req = client.get(url.clone());
    if let Some(entry) = cached {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }
    req.send()
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn http_error(status: StatusCode, body: &str) -> FetchError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.chars().take(200).collect());
    match status {
        StatusCode::UNAUTHORIZED => {
            warn!("provider rejected the token (401); check FOOTBALL_DATA_API_KEY")
        }
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            warn!(%status, "provider plan limit reached or access denied")
        }
        _ => {}
    }
    FetchError::Http {
        status: status.as_u16(),
        message,
    }
}

fn entry_from(body: String, headers: &HeaderMap, now: u64) -> CacheEntry {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    CacheEntry {
        body,
        etag: header(ETAG),
        last_modified: header(LAST_MODIFIED),
        fetched_at: now,
    }
}

fn with_cache<T>(f: impl FnOnce(&mut HttpCacheFile) -> T) -> T {
    let mut guard = CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let cache = guard.get_or_insert_with(load_cache_file);
    f(cache)
}

fn store_entry(key: &str, entry: CacheEntry) {
    with_cache(|cache| {
        cache.version = CACHE_VERSION;
        cache.entries.insert(key.to_string(), entry);
        if let Err(err) = save_cache_file(cache) {
            warn!(error = %err, "failed to persist http cache");
        }
    });
}

fn load_cache_file() -> HttpCacheFile {
    let Some(path) = cache_path() else {
        return HttpCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return HttpCacheFile::default();
    };
    let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return HttpCacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &HttpCacheFile) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fetched_at: u64) -> CacheEntry {
        CacheEntry {
            body: "{}".to_string(),
            etag: None,
            last_modified: None,
            fetched_at,
        }
    }

    #[test]
    fn freshness_respects_ttl() {
        let ttl = Duration::from_secs(3600);
        assert!(entry(1_000).is_fresh(ttl, 1_000 + 3599));
        assert!(!entry(1_000).is_fresh(ttl, 1_000 + 3600));
        assert!(!entry(1_000).is_fresh(Duration::ZERO, 1_000));
    }

    #[test]
    fn api_error_message_is_surfaced() {
        let err = http_error(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Wrong filter","errorCode":400}"#,
        );
        match err {
            FetchError::Http { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Wrong filter");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_rate_limits_and_server_errors_retry() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }
}
