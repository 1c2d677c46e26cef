use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    config::{API_QUOTAS, ApiEndpoint, RuntimeConfig},
    data::RateLimiter,
    error::{MarketDataError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalApi {
    Marvel,
    ComicVine,
    Isbndb,
    NewsFeed,
}

impl ExternalApi {
    pub fn endpoint(&self) -> &'static ApiEndpoint {
        match self {
            Self::Marvel => &API_QUOTAS.marvel,
            Self::ComicVine => &API_QUOTAS.comic_vine,
            Self::Isbndb => &API_QUOTAS.isbndb,
            Self::NewsFeed => &API_QUOTAS.news_feed,
        }
    }

    pub fn limiter_key(&self) -> &'static str {
        self.endpoint().quota.limiter_key
    }
}

/// JSON-over-HTTP client whose every request passes the rate limiter first.
#[derive(Clone)]
pub struct RateLimitedClient {
    http: reqwest::Client,
    limiter: RateLimiter,
    api: ExternalApi,
    base_url: String,
}

impl RateLimitedClient {
    pub fn new(api: ExternalApi, limiter: RateLimiter, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(API_QUOTAS.client.user_agent)
            .build()?;

        Ok(Self {
            http,
            limiter,
            api,
            base_url: api.endpoint().base_url.to_string(),
        })
    }

    /// Client with the request timeout taken from `config.http_timeout`.
    pub fn from_config(
        api: ExternalApi,
        limiter: RateLimiter,
        config: &RuntimeConfig,
    ) -> Result<Self> {
        Self::new(api, limiter, config.http_timeout)
    }

    /// Points the client at another host (mirrors, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn api(&self) -> ExternalApi {
        self.api
    }

    /// Consumes one permit (fail-fast) and GETs `path` decoded as `T`.
    /// A rejected permit returns `RateLimitExceeded` without touching the network.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.limiter.try_consume(self.api.limiter_key()).await?;

        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::error!("{:?} request to {} failed with {}", self.api, url, status);
            return Err(MarketDataError::Upstream(format!(
                "{:?} returned {} for {}",
                self.api, status, url
            )));
        }

        Ok(response.json::<T>().await?)
    }
}
