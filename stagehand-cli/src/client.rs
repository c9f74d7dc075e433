//! HTTP adapters: queue client and content-store fetcher.
//!
//! ureq is a blocking client, so every call runs under `spawn_blocking` to
//! keep the worker's runtime responsive. Auth is a shared-secret header.

use std::path::{Path, PathBuf};

use stagehand_core::types::{Job, JobId, StatusUpdate};
use stagehand_sync::{AssetFetcher, FetchError};
use stagehand_worker::{QueueClient, QueueError};

pub const SECRET_HEADER: &str = "x-stagehand-secret";

fn transport(err: impl std::fmt::Display) -> QueueError {
    QueueError::Transport(err.to_string())
}

// ---------------------------------------------------------------------------
// Queue client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpQueueClient {
    agent: ureq::Agent,
    host: String,
    secret: Option<String>,
}

impl HttpQueueClient {
    pub fn new(host: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            agent: ureq::agent(),
            host: host.into().trim_end_matches('/').to_string(),
            secret,
        }
    }

    fn authorized(&self, request: ureq::Request) -> ureq::Request {
        match &self.secret {
            Some(secret) => request.set(SECRET_HEADER, secret),
            None => request,
        }
    }

    fn pickup_blocking(&self, tag_selector: Option<&str>) -> Result<Option<Job>, QueueError> {
        let mut request = self
            .authorized(self.agent.get(&format!("{}/api/v1/jobs/pickup", self.host)));
        if let Some(selector) = tag_selector {
            request = request.query("tags", selector);
        }

        match request.call() {
            Ok(response) => {
                if response.status() == 204 {
                    return Ok(None);
                }
                let body = response.into_string().map_err(transport)?;
                if body.trim().is_empty() {
                    return Ok(None);
                }
                let job: Job = serde_json::from_str(&body)
                    .map_err(|e| QueueError::Transport(format!("invalid job payload: {e}")))?;
                Ok(Some(job))
            }
            Err(ureq::Error::Status(status, response)) => Err(QueueError::Api {
                status,
                message: response.into_string().unwrap_or_default(),
            }),
            Err(err) => Err(transport(err)),
        }
    }

    fn update_blocking(&self, uid: &JobId, update: &StatusUpdate) -> Result<(), QueueError> {
        let request = self.authorized(
            self.agent
                .put(&format!("{}/api/v1/jobs/{uid}", self.host)),
        );
        match request.send_json(update) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, response)) => Err(QueueError::Api {
                status,
                message: response.into_string().unwrap_or_default(),
            }),
            Err(err) => Err(transport(err)),
        }
    }
}

impl QueueClient for HttpQueueClient {
    async fn pickup_job(&self, tag_selector: Option<&str>) -> Result<Option<Job>, QueueError> {
        let this = self.clone();
        let selector = tag_selector.map(String::from);
        tokio::task::spawn_blocking(move || this.pickup_blocking(selector.as_deref()))
            .await
            .map_err(|err| QueueError::Transport(format!("pickup task join error: {err}")))?
    }

    async fn update_job(&self, uid: &JobId, update: &StatusUpdate) -> Result<(), QueueError> {
        let this = self.clone();
        let uid = uid.clone();
        let update = update.clone();
        tokio::task::spawn_blocking(move || this.update_blocking(&uid, &update))
            .await
            .map_err(|err| QueueError::Transport(format!("update task join error: {err}")))?
    }
}

// ---------------------------------------------------------------------------
// Content-store fetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    base: String,
}

impl HttpFetcher {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            agent: ureq::agent(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn fetch_blocking(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| FetchError::new(format!("{url}: {e}")))?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FetchError::new(format!("{}: {e}", parent.display())))?;
        }
        let mut file = std::fs::File::create(dest)
            .map_err(|e| FetchError::new(format!("{}: {e}", dest.display())))?;
        std::io::copy(&mut response.into_reader(), &mut file)
            .map_err(|e| FetchError::new(format!("{}: {e}", dest.display())))?;
        Ok(())
    }
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, remote: &str, dest: &Path) -> Result<(), FetchError> {
        let this = self.clone();
        let url = format!("{}/{remote}", self.base);
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || this.fetch_blocking(&url, &dest))
            .await
            .map_err(|err| FetchError::new(format!("fetch task join error: {err}")))?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
