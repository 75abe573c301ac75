//! Streaming package downloads with retry.

use crate::config::Config;
use crate::error::{Error, Result};
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { bytes: u64 },
    /// The server answered 404; never retried.
    NotFound,
    Failed { attempts: u32, reason: String },
}

enum Attempt {
    Completed(u64),
    NotFound,
}

pub struct Downloader {
    client: Client,
    retries: u32,
    backoff: Duration,
    progress: MultiProgress,
}

impl Downloader {
    pub fn new(timeout: Duration, retries: u32, backoff: Duration) -> Result<Self> {
        // Per-read timeout: a whole package may legitimately take minutes.
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(concat!("uot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retries: retries.max(1),
            backoff,
            progress: MultiProgress::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.request_timeout,
            config.download_retries,
            config.retry_backoff,
        )
    }

    #[cfg(test)]
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Downloads `url` to `dest`. Bytes go to a `.part` sibling that is renamed onto `dest`
    /// only once complete, so `dest` never holds a truncated file.
    pub async fn download(&self, url: &str, dest: &Path) -> DownloadOutcome {
        let staging = staging_path(dest);
        let mut reason = String::new();

        for attempt in 1..=self.retries {
            match self.attempt(url, dest, &staging).await {
                Ok(Attempt::Completed(bytes)) => {
                    tracing::info!("Downloaded {} ({} bytes)", display_name(dest), bytes);
                    return DownloadOutcome::Downloaded { bytes };
                }
                Ok(Attempt::NotFound) => {
                    tracing::warn!("File not found (404): {}", url);
                    remove_partial(&staging).await;
                    return DownloadOutcome::NotFound;
                }
                Err(e) => {
                    tracing::warn!("Attempt {}/{} failed for {}: {}", attempt, self.retries, url, e);
                    remove_partial(&staging).await;
                    reason = e.to_string();
                    if attempt < self.retries {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }

        DownloadOutcome::Failed {
            attempts: self.retries,
            reason,
        }
    }

    async fn attempt(&self, url: &str, dest: &Path, staging: &Path) -> Result<Attempt> {
        let download_error = |reason: String| Error::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Attempt::NotFound);
        }
        let response = response
            .error_for_status()
            .map_err(|e| download_error(e.to_string()))?;

        let total = response.content_length();
        let bar = self.progress_bar(dest, total);

        // Truncates whatever a previous attempt left behind.
        let file = tokio::fs::File::create(staging).await?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    bar.abandon();
                    return Err(download_error(e.to_string()));
                }
            };
            writer.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            bar.set_position(downloaded);
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        if let Some(total) = total {
            if downloaded != total {
                bar.abandon();
                return Err(download_error(format!(
                    "truncated body: received {} of {} bytes",
                    downloaded, total
                )));
            }
        }

        tokio::fs::rename(staging, dest).await?;
        bar.finish_with_message(format!("{} done", display_name(dest)));
        Ok(Attempt::Completed(downloaded))
    }

    fn progress_bar(&self, dest: &Path, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "Downloading {msg} [{bar:50}] {bytes}/{total_bytes} ({percent}%)",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>."),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("Downloading {msg} {spinner} {bytes}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(display_name(dest));
        self.progress.add(bar)
    }
}

pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial download {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove partial download {:?}: {}", path, e),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
