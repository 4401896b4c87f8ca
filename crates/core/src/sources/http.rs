use crate::traits::{FetchedPage, PageFetcher};
use crate::{AcquisitionConfig, TranscriptError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER};
use reqwest::Client;
use std::sync::Arc;

const REFERER_URL: &str = "https://www.youtube.com/";

/// reqwest-backed fetcher that looks like a browser to the video host.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Arc<Client>,
    accept_language: String,
    consent_cookie: String,
}

impl HttpPageFetcher {
    pub fn new(config: &AcquisitionConfig) -> Result<Self, TranscriptError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            accept_language: config.accept_language.clone(),
            consent_cookie: config.consent_cookie.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn get(&self, url: &str, accept: &str) -> Result<FetchedPage, TranscriptError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
            .header(COOKIE, &self.consent_cookie)
            .header(REFERER, REFERER_URL)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedPage { status, body })
    }
}
