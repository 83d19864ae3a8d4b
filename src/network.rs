use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use ureq::Agent;

use crate::bitmap::Bitmap;
use crate::config::NetworkConfig;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Server responded with status {0}")]
    Status(u16),
    #[error("Transport error: {0}")]
    Transport(ureq::Error),
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Fetch task failed: {0}")]
    Task(String),
    #[error("{0}")]
    Other(String),
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => FetchError::Status(status),
            other => FetchError::Transport(other),
        }
    }
}

/// Downloads and decodes one remote image
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bitmap, FetchError>;
}

/// Blocking `ureq` client run on tokio's blocking pool
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
    user_agent: String,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &NetworkConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Self {
            agent: Agent::new_with_config(agent_config),
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_image_size_mb * 1024 * 1024,
        }
    }

    fn fetch_blocking(&self, url: &str) -> Result<Bitmap, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);

        Ok(Bitmap::from_bytes(&bytes)?)
    }
}

#[async_trait]
impl NetworkFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bitmap, FetchError> {
        let fetcher = self.clone();
        let url = url.to_string();

        tokio::task::spawn_blocking(move || fetcher.fetch_blocking(&url))
            .await
            .map_err(|e| FetchError::Task(e.to_string()))?
    }
}
