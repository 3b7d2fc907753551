use std::time::Duration;

use tracing::warn;

/// Application-level constants
pub const APP_NAME: &str = "easyschedule";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "easyschedule=info,warn"
}

/// Connection settings for the clinic backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Bearer token for the initial session, if any.
    pub token: Option<String>,
    /// Doctor whose schedule is shown when none is given explicitly.
    pub doctor_id: Option<i64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            token: None,
            doctor_id: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `EASYSCHEDULE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Malformed numbers are
    /// logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("EASYSCHEDULE_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_number("EASYSCHEDULE_TIMEOUT_SECS", &lookup) {
            config.timeout_secs = secs;
        }
        if let Some(secs) = parse_number::<u64>("EASYSCHEDULE_POLL_SECS", &lookup) {
            if secs == 0 {
                warn!("EASYSCHEDULE_POLL_SECS must be positive, keeping default");
            } else {
                config.poll_interval_secs = secs;
            }
        }
        config.token = lookup("EASYSCHEDULE_TOKEN").filter(|v| !v.trim().is_empty());
        config.doctor_id = parse_number("EASYSCHEDULE_DOCTOR_ID", &lookup);

        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring malformed numeric setting");
            None
        }
    }
}
