//! Built-in HTTP provider for upload/download actions.

use std::path::Path;

use stagehand_core::types::Job;
use stagehand_worker::actions::{ActionError, BoxFuture, Provider};

/// Uploads with `PUT <params.url>`, downloads with `GET <src>`.
#[derive(Debug, Clone, Default)]
pub struct HttpProvider;

impl HttpProvider {
    fn provider_err(message: impl Into<String>) -> ActionError {
        ActionError::Provider {
            provider: String::from("http"),
            message: message.into(),
        }
    }

    fn upload_blocking(url: &str, file: &Path) -> Result<(), ActionError> {
        let bytes = std::fs::read(file)
            .map_err(|e| Self::provider_err(format!("{}: {e}", file.display())))?;
        ureq::put(url)
            .send_bytes(&bytes)
            .map(|_| ())
            .map_err(|e| Self::provider_err(format!("{url}: {e}")))
    }

    fn download_blocking(src: &str, dest: &Path) -> Result<(), ActionError> {
        let response = ureq::get(src)
            .call()
            .map_err(|e| Self::provider_err(format!("{src}: {e}")))?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Self::provider_err(format!("{}: {e}", parent.display())))?;
        }
        let mut file = std::fs::File::create(dest)
            .map_err(|e| Self::provider_err(format!("{}: {e}", dest.display())))?;
        std::io::copy(&mut response.into_reader(), &mut file)
            .map_err(|e| Self::provider_err(format!("{}: {e}", dest.display())))?;
        Ok(())
    }
}

impl Provider for HttpProvider {
    fn upload<'a>(
        &'a self,
        job: &'a Job,
        file: &'a Path,
        params: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<(), ActionError>> {
        Box::pin(async move {
            let url = params
                .get("url")
                .and_then(|v| v.as_str())
                .ok_or(ActionError::MissingParam {
                    module: String::from("upload"),
                    param: "url",
                })?
                .to_string();
            tracing::info!(job = %job.uid, url = %url, "uploading render output");
            let file = file.to_path_buf();
            tokio::task::spawn_blocking(move || Self::upload_blocking(&url, &file))
                .await
                .map_err(|e| Self::provider_err(format!("upload task join error: {e}")))?
        })
    }

    fn download<'a>(
        &'a self,
        job: &'a Job,
        src: &'a str,
        dest: &'a Path,
        _params: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<(), ActionError>> {
        Box::pin(async move {
            tracing::info!(job = %job.uid, src, "downloading job asset");
            let src = src.to_string();
            let dest = dest.to_path_buf();
            tokio::task::spawn_blocking(move || Self::download_blocking(&src, &dest))
                .await
                .map_err(|e| Self::provider_err(format!("download task join error: {e}")))?
        })
    }
}
