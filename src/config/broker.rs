use crate::config::read_env_or_file;
use crate::constants::DEFAULT_API_BASE_URL;
use std::env;
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct BrokerConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Broker endpoint and credentials from the environment. `.env` is loaded once by the
/// binary before this runs.
///
/// Missing credentials are passed on as empty strings; the broker decides whether the
/// request is authorised.
pub fn load_broker_config(timeout: Duration) -> BrokerConfig {
    let base_url = env::var("APCA_API_BASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    let api_key = read_env_or_file("APCA_API_KEY_ID").unwrap_or_default();
    let api_secret = read_env_or_file("APCA_API_SECRET_KEY").unwrap_or_default();

    if api_key.is_empty() || api_secret.is_empty() {
        log::warn!("Broker credentials not fully set; requests will likely be rejected");
    }

    BrokerConfig {
        base_url,
        api_key,
        api_secret,
        timeout,
    }
}
