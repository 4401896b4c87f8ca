use crate::config::env_value;
use crate::traits::CredentialProvider;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const API_KEY_ENV_VARS: [&str; 3] = ["YOUTUBE_API_KEY", "YOUTUBE_API_KEY_2", "YOUTUBE_API_KEY_3"];

/// Round-robin over API keys to spread quota usage.
#[derive(Debug, Default)]
pub struct ApiKeyRotator {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl ApiKeyRotator {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn from_env() -> Self {
        Self::new(API_KEY_ENV_VARS.iter().filter_map(|name| env_value(name)))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

impl CredentialProvider for ApiKeyRotator {
    fn next(&self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let position = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(self.keys[position].clone())
    }
}
