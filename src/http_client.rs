use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};

use crate::config::ApiConfig;
use crate::error::FetchError;

const AUTH_HEADER: &str = "x-auth-token";

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide client carrying the football-data token. The first caller's
/// config wins; later calls reuse that client.
pub fn http_client(cfg: &ApiConfig) -> Result<&'static Client, FetchError> {
    CLIENT.get_or_try_init(|| {
        let key = cfg.api_key.as_deref().ok_or(FetchError::MissingApiKey)?;
        let mut token = HeaderValue::from_str(key).map_err(|_| FetchError::MissingApiKey)?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(AUTH_HEADER), token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .user_agent(concat!("prono_expert/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::from)
    })
}
