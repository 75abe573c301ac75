use crate::error::{Error, Result};
use crate::model::LanguageRegistry;
use crate::package::PackageStore;
use crate::runtime::TranslationRuntime;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Missing,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub attempted: usize,
    pub installed: usize,
    pub missing: usize,
    pub failed: usize,
}

/// Loads package files into the runtime, several at a time.
pub struct InstallCoordinator {
    registry: Arc<LanguageRegistry>,
}

impl InstallCoordinator {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }

    /// Installs every file, `workers` at a time (default: available parallelism).
    ///
    /// Individual failures are logged and counted. The batch fails only when nothing
    /// installed; otherwise the registry caches are invalidated once all workers finished.
    pub async fn install_all(
        &self,
        paths: Vec<PathBuf>,
        workers: Option<usize>,
    ) -> Result<InstallReport> {
        let workers = workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(4)
            })
            .max(1);

        tracing::info!("Installing {} model(s) with {} worker(s)...", paths.len(), workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut report = InstallReport {
            attempted: paths.len(),
            ..Default::default()
        };

        for path in paths {
            let semaphore = semaphore.clone();
            let runtime = self.registry.runtime().clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| e.to_string())?;
                tokio::task::spawn_blocking(move || install_one(runtime.as_ref(), &path))
                    .await
                    .map_err(|e| e.to_string())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(|e| e.to_string()).and_then(|inner| inner) {
                Ok(InstallOutcome::Installed) => report.installed += 1,
                Ok(InstallOutcome::Missing) => report.missing += 1,
                Ok(InstallOutcome::Failed(reason)) => {
                    tracing::debug!("Install failure counted: {}", reason);
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Install worker crashed: {}", e);
                    report.failed += 1;
                }
            }
        }

        if report.installed == 0 {
            return Err(Error::NoPackagesInstalled {
                attempted: report.attempted,
            });
        }

        self.registry.invalidate();
        tracing::info!(
            "Installed {}/{} model(s), language cache epoch {}",
            report.installed,
            report.attempted,
            self.registry.epoch()
        );
        Ok(report)
    }

    /// Installs every package file found in the store.
    pub async fn install_store(&self, store: &PackageStore) -> Result<InstallReport> {
        let files = store.list_local_package_files()?;
        if files.is_empty() {
            return Err(Error::NoPackageFiles(store.dir().to_path_buf()));
        }
        self.install_all(files, None).await
    }
}

pub fn install_one(runtime: &dyn TranslationRuntime, path: &Path) -> InstallOutcome {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if !path.exists() {
        tracing::warn!("Model file '{}' not found. Skipping.", path.display());
        return InstallOutcome::Missing;
    }

    match runtime.install_package(path) {
        Ok(()) => {
            tracing::info!("Successfully installed model '{}'", name);
            InstallOutcome::Installed
        }
        Err(e) => {
            tracing::error!("Failed to install model '{}': {}", name, e);
            InstallOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;
    use std::sync::atomic::Ordering;

    fn setup() -> (Arc<FakeRuntime>, Arc<LanguageRegistry>, InstallCoordinator) {
        let runtime = Arc::new(FakeRuntime::default());
        let registry = Arc::new(LanguageRegistry::new(runtime.clone()));
        let installer = InstallCoordinator::new(registry.clone());
        (runtime, registry, installer)
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"pkg").unwrap();
        path
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _, installer) = setup();
        let paths = vec![
            touch(dir.path(), "translate-en_sk-1_0.argosmodel"),
            touch(dir.path(), "translate-en_de-1_0.argosmodel"),
            touch(dir.path(), "corrupt-1_0.argosmodel"),
            touch(dir.path(), "translate-de_en-1_0.argosmodel"),
        ];

        let report = installer.install_all(paths, Some(2)).await.unwrap();

        assert_eq!(report.attempted, 4);
        assert_eq!(report.installed, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(runtime.installs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, installer) = setup();
        let paths = vec![
            touch(dir.path(), "translate-en_sk-1_0.argosmodel"),
            dir.path().join("translate-xx_yy-1_0.argosmodel"),
        ];

        let report = installer.install_all(paths, None).await.unwrap();
        assert_eq!(report.installed, 1);
        assert_eq!(report.missing, 1);
    }

    #[tokio::test]
    async fn zero_successes_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (_, registry, installer) = setup();
        let paths = vec![touch(dir.path(), "corrupt-1_0.argosmodel")];

        let err = installer.install_all(paths, None).await.unwrap_err();
        assert!(matches!(err, Error::NoPackagesInstalled { attempted: 1 }));
        assert_eq!(registry.epoch(), 0);
    }

    #[tokio::test]
    async fn successful_install_invalidates_cached_languages() {
        let dir = tempfile::tempdir().unwrap();
        let (_, registry, installer) = setup();
        assert!(registry.installed_languages().unwrap().is_empty());

        installer
            .install_all(vec![touch(dir.path(), "translate-en_sk-1_0.argosmodel")], None)
            .await
            .unwrap();

        let snapshot = registry.installed_languages().unwrap();
        assert_eq!(snapshot.codes(), vec!["en", "sk"]);
        assert!(registry.resolve_translation_path("en", "sk").is_ok());
    }

    #[tokio::test]
    async fn empty_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, installer) = setup();
        let store = PackageStore::new(dir.path().to_path_buf(), "argosmodel");

        assert!(matches!(
            installer.install_store(&store).await,
            Err(Error::NoPackageFiles(_))
        ));
    }
}
