//! HTTP transport.

use crate::constants::CONNECT_TIMEOUT;
use crate::core::{Result, UpdateError};
use crate::utils::ProgressReporter;
use futures::StreamExt;
use futures::future::BoxFuture;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Fetches one URL into one file.
///
/// Implementations write the body to `dest` (creating or truncating it) and
/// return the number of bytes written. A non-success response is an error.
/// Retrying, mirror selection and timeouts are the caller's business.
pub trait Transport: Send + Sync {
    /// Download `url` into `dest`, reporting byte progress to `progress`.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        progress: &'a dyn ProgressReporter,
    ) -> BoxFuture<'a, Result<u64>>;
}

/// [`Transport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Client with the crate user agent and a connect timeout.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("bundle-updater/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| UpdateError::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
        }
    }

    async fn fetch_to_file(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<u64> {
        let transfer_error = |e: reqwest::Error| UpdateError::Transfer {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response =
            self.client.get(url).send().await.and_then(|r| r.error_for_status()).map_err(transfer_error)?;

        let label = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        progress.begin(&label, response.content_length());

        let file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| UpdateError::stream("creating", dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transfer_error)?;
            writer.write_all(&chunk).await.map_err(|e| UpdateError::stream("writing", dest, e))?;
            written += chunk.len() as u64;
            progress.advance(chunk.len() as u64);
        }

        writer.flush().await.map_err(|e| UpdateError::stream("writing", dest, e))?;
        writer.get_ref().sync_all().await.map_err(|e| UpdateError::stream("syncing", dest, e))?;

        Ok(written)
    }
}

impl Transport for HttpTransport {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        progress: &'a dyn ProgressReporter,
    ) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move {
            let result = self.fetch_to_file(url, dest, progress).await;
            progress.finish();
            result
        })
    }
}
