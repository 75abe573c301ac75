use crate::error::{Error, Result};
use crate::package::LanguagePair;
use crate::runtime::{InstalledLanguage, TranslationPath, TranslationRuntime};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Installed languages as observed at one cache epoch.
#[derive(Debug)]
pub struct LanguageSnapshot {
    epoch: u64,
    languages: Vec<Arc<dyn InstalledLanguage>>,
}

impl LanguageSnapshot {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn languages(&self) -> &[Arc<dyn InstalledLanguage>] {
        &self.languages
    }

    pub fn find(&self, code: &str) -> Option<&Arc<dyn InstalledLanguage>> {
        self.languages.iter().find(|lang| lang.code() == code)
    }

    pub fn codes(&self) -> Vec<&str> {
        self.languages.iter().map(|lang| lang.code()).collect()
    }
}

#[derive(Default)]
struct CacheState {
    epoch: u64,
    languages: Option<Arc<LanguageSnapshot>>,
    paths: HashMap<LanguagePair, Arc<dyn TranslationPath>>,
}

/// Caches the runtime's installed languages and resolved translation paths.
///
/// Every install or cache clean bumps the epoch and drops both caches together. A value
/// computed against an older epoch is never stored or returned.
pub struct LanguageRegistry {
    runtime: Arc<dyn TranslationRuntime>,
    state: RwLock<CacheState>,
    index_cache: Option<PathBuf>,
}

impl LanguageRegistry {
    pub fn new(runtime: Arc<dyn TranslationRuntime>) -> Self {
        Self {
            runtime,
            state: RwLock::new(CacheState::default()),
            index_cache: None,
        }
    }

    /// Also delete this persisted index file on [`clean_cache`](Self::clean_cache).
    pub fn with_index_cache(mut self, path: PathBuf) -> Self {
        self.index_cache = Some(path);
        self
    }

    pub fn runtime(&self) -> &Arc<dyn TranslationRuntime> {
        &self.runtime
    }

    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    pub fn installed_languages(&self) -> Result<Arc<LanguageSnapshot>> {
        loop {
            let observed = {
                let state = self.read();
                if let Some(snapshot) = &state.languages {
                    return Ok(snapshot.clone());
                }
                state.epoch
            };

            let languages = self.runtime.installed_languages()?;

            let mut state = self.write();
            if state.epoch != observed {
                tracing::debug!("Installed languages changed while loading, reloading");
                continue;
            }
            let snapshot = state
                .languages
                .get_or_insert_with(|| {
                    Arc::new(LanguageSnapshot {
                        epoch: observed,
                        languages,
                    })
                })
                .clone();
            return Ok(snapshot);
        }
    }

    pub fn resolve_translation_path(
        &self,
        from_code: &str,
        to_code: &str,
    ) -> Result<Arc<dyn TranslationPath>> {
        let pair = LanguagePair::new(from_code, to_code);

        loop {
            let snapshot = self.installed_languages()?;
            {
                let state = self.read();
                if state.epoch == snapshot.epoch() {
                    if let Some(path) = state.paths.get(&pair) {
                        return Ok(path.clone());
                    }
                }
            }

            let not_installed = |code: &str| Error::LanguageNotInstalled {
                code: code.to_string(),
                installed: installed_list(&snapshot),
            };
            let from = snapshot.find(from_code).ok_or_else(|| not_installed(from_code))?;
            let to = snapshot.find(to_code).ok_or_else(|| not_installed(to_code))?;

            let path = from
                .translation_to(to.as_ref())
                .ok_or_else(|| Error::NoTranslationPath {
                    from: from_code.to_string(),
                    to: to_code.to_string(),
                })?;

            let mut state = self.write();
            if state.epoch != snapshot.epoch() {
                continue;
            }
            tracing::debug!("Resolved translation path {}", pair);
            return Ok(state.paths.entry(pair).or_insert(path).clone());
        }
    }

    /// Drops both caches and starts a new epoch.
    pub fn invalidate(&self) {
        let mut state = self.write();
        state.epoch += 1;
        state.languages = None;
        state.paths.clear();
        tracing::debug!("Language cache invalidated (epoch {})", state.epoch);
    }

    /// Clears the in-memory caches and the persisted index. The caches are invalidated even
    /// when removing the index fails.
    pub fn clean_cache(&self) -> Result<()> {
        let result = match &self.index_cache {
            Some(path) => match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::info!("Removed cached index {:?}", path);
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(e)),
            },
            None => Ok(()),
        };

        self.invalidate();
        result
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn installed_list(snapshot: &LanguageSnapshot) -> String {
    let codes = snapshot.codes();
    if codes.is_empty() {
        "none".to_string()
    } else {
        codes.join(", ")
    }
}
