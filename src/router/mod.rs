use crate::error::{Error, Result};
use crate::model::{InstallCoordinator, LanguageRegistry, LanguageSnapshot};
use crate::package::{format_pairs, LanguagePair, PackageStore};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Validates a requested pair against the store, makes sure something is installed, and
/// runs the text through the resolved translation path.
pub struct TranslationRouter {
    store: PackageStore,
    registry: Arc<LanguageRegistry>,
    installer: InstallCoordinator,
}

impl TranslationRouter {
    pub fn new(store: PackageStore, registry: Arc<LanguageRegistry>) -> Self {
        let installer = InstallCoordinator::new(registry.clone());
        Self {
            store,
            registry,
            installer,
        }
    }

    pub fn available_pairs(&self) -> Result<BTreeSet<LanguagePair>> {
        self.store.available_pairs()
    }

    pub fn validate_pair(&self, from_code: &str, to_code: &str) -> Result<()> {
        let pairs = self.available_pairs()?;
        if pairs.contains(&LanguagePair::new(from_code, to_code)) {
            return Ok(());
        }
        Err(Error::PairNotAvailable {
            from: from_code.to_string(),
            to: to_code.to_string(),
            available: format_pairs(&pairs),
        })
    }

    /// Installs the whole store only when the runtime has no languages at all.
    pub async fn ensure_installed(&self) -> Result<Arc<LanguageSnapshot>> {
        let snapshot = self.registry.installed_languages()?;
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }

        tracing::info!("No installed languages found. Installing local models...");
        self.installer.install_store(&self.store).await?;
        self.registry.installed_languages()
    }

    pub async fn route(&self, from_code: &str, to_code: &str, text: &str) -> Result<String> {
        self.validate_pair(from_code, to_code)?;
        self.ensure_installed().await?;

        tracing::info!("Looking for translation path: {} -> {}", from_code, to_code);
        let path = self.registry.resolve_translation_path(from_code, to_code)?;
        tracing::debug!("Using translation path {}→{}", path.from_code(), path.to_code());

        tracing::info!("Translating: '{}'", text);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || path.translate(&text))
            .await
            .map_err(|e| Error::TranslationExecution(e.to_string()))?
            .map_err(|e| match e {
                Error::TranslationExecution(_) => e,
                other => Error::TranslationExecution(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;
    use std::path::Path;
    use std::sync::atomic::Ordering;

    fn router(dir: &Path, runtime: Arc<FakeRuntime>) -> TranslationRouter {
        let store = PackageStore::new(dir.to_path_buf(), "argosmodel");
        TranslationRouter::new(store, Arc::new(LanguageRegistry::new(runtime)))
    }

    fn store_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"pkg").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn available_pair_translates_after_implicit_install() {
        let dir = store_with(&["translate-en_sk-1_0.argosmodel"]);
        let runtime = Arc::new(FakeRuntime::default());
        let router = router(dir.path(), runtime.clone());

        let translated = router.route("en", "sk", "Hello world").await.unwrap();

        assert_eq!(translated, "[en->sk] Hello world");
        assert_eq!(runtime.installs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_pair_lists_valid_combinations() {
        let dir = store_with(&["translate-en_sk-1_0.argosmodel"]);
        let runtime = Arc::new(FakeRuntime::default());
        let router = router(dir.path(), runtime.clone());

        match router.route("sk", "en", "Ahoj svet").await {
            Err(Error::PairNotAvailable { available, .. }) => assert_eq!(available, "en→(sk)"),
            other => panic!("unexpected result: {:?}", other),
        }
        // Validation fails before anything is installed.
        assert_eq!(runtime.installs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn installed_runtime_skips_bulk_install() {
        let dir = store_with(&["translate-en_sk-1_0.argosmodel"]);
        let runtime = Arc::new(FakeRuntime::with_pairs(&[("en", "sk")]));
        let router = router(dir.path(), runtime.clone());

        router.route("en", "sk", "Hi").await.unwrap();
        assert_eq!(runtime.installs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrelated_install_surfaces_install_hint() {
        let dir = store_with(&[
            "translate-en_sk-1_0.argosmodel",
            "translate-en_de-1_0.argosmodel",
        ]);
        // Something is installed, but not the requested target.
        let runtime = Arc::new(FakeRuntime::with_pairs(&[("en", "sk")]));
        let router = router(dir.path(), runtime.clone());

        let err = router.route("en", "de", "Hi").await.unwrap_err();
        assert!(matches!(err, Error::LanguageNotInstalled { ref code, .. } if code == "de"));
        assert!(err.to_string().contains("--install-models"));
        assert_eq!(runtime.installs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn translation_failure_is_reported() {
        let dir = store_with(&["translate-en_sk-1_0.argosmodel"]);
        let runtime = Arc::new(FakeRuntime::failing_translations());
        runtime.add_pair("en", "sk");
        let router = router(dir.path(), runtime);

        assert!(matches!(
            router.route("en", "sk", "Hi").await,
            Err(Error::TranslationExecution(_))
        ));
    }

    #[tokio::test]
    async fn missing_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(&dir.path().join("models"), Arc::new(FakeRuntime::default()));

        assert!(matches!(
            router.route("en", "sk", "Hi").await,
            Err(Error::StoreNotFound(_))
        ));
    }
}
