use std::time::Duration;

use async_trait::async_trait;
use postrepo_types::Post;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::{endpoint::Endpoint, error::Error, repository::PostRepository};

/// Configuration for the remote repository.
/// base_url: Root of the posts service. (default: https://jsonplaceholder.typicode.com)
/// timeout_ms: Total time allowed for one request, body included. (default: 10000)
/// connect_timeout_ms: Time allowed to establish a connection. (default: 5000)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
}

impl Config {
    const DEFAULT_BASE_URL: &'static str = "https://jsonplaceholder.typicode.com";
    const DEFAULT_TIMEOUT_MS: u64 = 10_000;
    const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

    pub fn new(
        base_url: Option<String>,
        timeout_ms: Option<u64>,
        connect_timeout_ms: Option<u64>,
    ) -> Self {
        Config {
            base_url,
            timeout_ms,
            connect_timeout_ms,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(Self::DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(Self::DEFAULT_TIMEOUT_MS))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(
            self.connect_timeout_ms
                .unwrap_or(Self::DEFAULT_CONNECT_TIMEOUT_MS),
        )
    }
}

/// Posts served by a read-only JSON endpoint.
/// One GET per call: responses are not cached and failed requests are not retried.
#[derive(Debug, Clone)]
pub struct RemoteRepository {
    cfg: Config,
    http: reqwest::Client,
}

impl RemoteRepository {
    pub fn new(cfg: Option<Config>) -> Result<Self, Error> {
        let cfg = cfg.unwrap_or_default();
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .connect_timeout(cfg.connect_timeout())
            .build()?;
        Ok(Self { cfg, http })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, Error> {
        let url = endpoint.url(self.cfg.base_url());
        debug!("Sending request to {}", url);
        let resp = self.http.get(&url).send().await?;
        let body = self.handle_response(endpoint, resp).await?;
        serde_json::from_slice(&body).map_err(|e| {
            error!("request {} decode failed: {}", endpoint, e);
            Error::from(e)
        })
    }

    async fn handle_response(
        &self,
        endpoint: &Endpoint,
        resp: reqwest::Response,
    ) -> Result<Vec<u8>, Error> {
        let status = resp.status();
        if status.is_success() {
            debug!("request: {} status: {}", endpoint, status);
            return Ok(resp.bytes().await?.to_vec());
        }
        match (endpoint, status) {
            (Endpoint::Post(id), reqwest::StatusCode::NOT_FOUND) => {
                debug!("request: {} status: NOT_FOUND", endpoint);
                Err(Error::NotFound(*id))
            }
            _ => {
                error!("request {} status: {}", endpoint, status);
                Err(Error::StatusCode(status.as_u16()))
            }
        }
    }
}

#[async_trait]
impl PostRepository for RemoteRepository {
    async fn get_by_id(&self, id: i32) -> Result<Post, Error> {
        let post: Post = self.get(&Endpoint::Post(id)).await?;
        post.validate()?;
        Ok(post)
    }

    async fn get_all(&self) -> Result<Vec<Post>, Error> {
        let posts: Vec<Post> = self.get(&Endpoint::Posts).await?;
        for post in &posts {
            post.validate()?;
        }
        debug!("Fetched {} posts", posts.len());
        Ok(posts)
    }
}
