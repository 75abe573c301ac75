//! Index-driven install: fetch the remote index, download what is missing, install it.

use crate::config::Config;
use crate::error::Result;
use crate::model::InstallCoordinator;
use crate::package::{DownloadOutcome, Downloader, PackageIndexClient, PackageStore};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionReport {
    pub total_entries: usize,
    pub skipped_invalid: usize,
    pub found: usize,
    pub already_present: usize,
    pub downloaded: usize,
    pub not_found: usize,
    pub failed: usize,
    pub installed: usize,
    pub install_error: Option<String>,
}

pub struct PackageAcquirer {
    store: PackageStore,
    index: PackageIndexClient,
    downloader: Arc<Downloader>,
    installer: InstallCoordinator,
    base_url: String,
    download_workers: usize,
    install_workers: usize,
}

impl PackageAcquirer {
    pub fn new(
        config: &Config,
        store: PackageStore,
        index: PackageIndexClient,
        downloader: Downloader,
        installer: InstallCoordinator,
    ) -> Self {
        Self {
            store,
            index,
            downloader: Arc::new(downloader),
            installer,
            base_url: config.base_url.clone(),
            download_workers: config.download_workers.max(1),
            install_workers: config.install_workers.max(1),
        }
    }

    pub fn index_url(&self) -> &str {
        self.index.url()
    }

    pub async fn install_from_index(&self) -> Result<AcquisitionReport> {
        self.store.ensure_directory()?;

        let listing = self.index.fetch_index().await?;
        let mut report = AcquisitionReport {
            total_entries: listing.total_entries,
            skipped_invalid: listing.skipped,
            ..Default::default()
        };

        let mut scheduled = HashSet::new();
        let mut pending = Vec::new();
        for descriptor in &listing.packages {
            report.found += 1;
            let dest = self.store.destination_path(descriptor);
            let filename = dest
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::info!("Processing {}", filename);

            if dest.exists() || !scheduled.insert(dest.clone()) {
                println!("[SKIP] {} already exists.", filename);
                report.already_present += 1;
                continue;
            }
            pending.push((format!("{}{}", self.base_url, filename), dest));
        }

        let downloaded = self.download_all(pending, &mut report).await;

        if !downloaded.is_empty() {
            match self
                .installer
                .install_all(downloaded, Some(self.install_workers))
                .await
            {
                Ok(installed) => report.installed = installed.installed,
                Err(e) => {
                    tracing::error!("{}", e);
                    report.install_error = Some(e.to_string());
                }
            }
        }

        Ok(report)
    }

    async fn download_all(
        &self,
        pending: Vec<(String, PathBuf)>,
        report: &mut AcquisitionReport,
    ) -> Vec<PathBuf> {
        let semaphore = Arc::new(Semaphore::new(self.download_workers));
        let mut tasks = JoinSet::new();

        for (url, dest) in pending {
            let semaphore = semaphore.clone();
            let downloader = self.downloader.clone();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => downloader.download(&url, &dest).await,
                    Err(e) => DownloadOutcome::Failed {
                        attempts: 0,
                        reason: e.to_string(),
                    },
                };
                (dest, outcome)
            });
        }

        let mut downloaded = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((dest, DownloadOutcome::Downloaded { .. })) => {
                    report.downloaded += 1;
                    downloaded.push(dest);
                }
                Ok((_, DownloadOutcome::NotFound)) => report.not_found += 1,
                Ok((dest, DownloadOutcome::Failed { attempts, reason })) => {
                    tracing::warn!(
                        "Giving up on {:?} after {} attempt(s): {}",
                        dest,
                        attempts,
                        reason
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Download worker crashed: {}", e);
                    report.failed += 1;
                }
            }
        }

        downloaded.sort();
        downloaded
    }
}
