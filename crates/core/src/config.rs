use std::time::Duration;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Preferred caption language, e.g. `en` or `en-US`.
    pub language: String,
    pub user_agent: String,
    pub accept_language: String,
    pub consent_cookie: String,
    pub request_timeout: Duration,
    pub watch_base_url: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            consent_cookie: "CONSENT=YES+cb.20210328-17-p0.en+FX+".to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            watch_base_url: "https://www.youtube.com".to_string(),
        }
    }
}

impl AcquisitionConfig {
    /// Defaults overridden by `YTTR_LANG`, `YTTR_USER_AGENT` and `YTTR_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(language) = env_value("YTTR_LANG") {
            config.language = language;
        }
        if let Some(user_agent) = env_value("YTTR_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(secs) = env_value("YTTR_TIMEOUT_SECS").and_then(|raw| raw.parse().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn watch_url(&self, video_id: &str) -> String {
        format!(
            "{}/watch?v={video_id}",
            self.watch_base_url.trim_end_matches('/')
        )
    }
}

pub(crate) fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
