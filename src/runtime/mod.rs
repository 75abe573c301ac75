//! Boundary to the translation runtime that loads packages and executes translations.

pub mod argos;

pub use argos::ArgosRuntime;

use crate::error::Result;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The model registry of a translation runtime.
///
/// Calls may block on disk or process I/O; async callers run them on the blocking pool.
pub trait TranslationRuntime: Send + Sync {
    /// Languages the runtime can currently use as translation endpoints.
    fn installed_languages(&self) -> Result<Vec<Arc<dyn InstalledLanguage>>>;

    /// Loads one package file into the registry.
    fn install_package(&self, path: &Path) -> Result<()>;
}

pub trait InstalledLanguage: Send + Sync + fmt::Debug {
    fn code(&self) -> &str;

    fn name(&self) -> &str;

    /// A direct capability to `target`, if this language has one.
    fn translation_to(&self, target: &dyn InstalledLanguage) -> Option<Arc<dyn TranslationPath>>;
}

pub trait TranslationPath: Send + Sync + fmt::Debug {
    fn from_code(&self) -> &str;

    fn to_code(&self) -> &str;

    fn translate(&self, text: &str) -> Result<String>;
}

#[cfg(test)]
pub mod fake {
    //! In-memory runtime that "installs" a package by reading the pair out of its filename.

    use super::*;
    use crate::error::Error;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeRuntime {
        pairs: Mutex<BTreeSet<(String, String)>>,
        pub listings: AtomicUsize,
        pub installs: AtomicUsize,
        pub fail_translation: bool,
    }

    impl FakeRuntime {
        pub fn with_pairs(pairs: &[(&str, &str)]) -> Self {
            let runtime = Self::default();
            for (from, to) in pairs {
                runtime.add_pair(from, to);
            }
            runtime
        }

        pub fn failing_translations() -> Self {
            Self {
                fail_translation: true,
                ..Default::default()
            }
        }

        pub fn add_pair(&self, from: &str, to: &str) {
            self.pairs
                .lock()
                .unwrap()
                .insert((from.to_string(), to.to_string()));
        }
    }

    impl TranslationRuntime for FakeRuntime {
        fn installed_languages(&self) -> Result<Vec<Arc<dyn InstalledLanguage>>> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            let pairs = self.pairs.lock().unwrap();

            let mut languages: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for (from, to) in pairs.iter() {
                languages.entry(from.clone()).or_default().insert(to.clone());
                languages.entry(to.clone()).or_default();
            }

            Ok(languages
                .into_iter()
                .map(|(code, targets)| {
                    Arc::new(FakeLanguage {
                        code,
                        targets,
                        fail_translation: self.fail_translation,
                    }) as Arc<dyn InstalledLanguage>
                })
                .collect())
        }

        fn install_package(&self, path: &Path) -> Result<()> {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            if stem.contains("corrupt") {
                return Err(Error::Install {
                    file: stem,
                    reason: "bad archive".to_string(),
                });
            }

            let codes = stem
                .strip_prefix("translate-")
                .and_then(|rest| rest.split_once('-'))
                .and_then(|(codes, _)| codes.split_once('_'))
                .ok_or_else(|| Error::Install {
                    file: stem.clone(),
                    reason: "unrecognized name".to_string(),
                })?;
            self.add_pair(codes.0, codes.1);
            self.installs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FakeLanguage {
        code: String,
        targets: BTreeSet<String>,
        fail_translation: bool,
    }

    impl InstalledLanguage for FakeLanguage {
        fn code(&self) -> &str {
            &self.code
        }

        fn name(&self) -> &str {
            &self.code
        }

        fn translation_to(
            &self,
            target: &dyn InstalledLanguage,
        ) -> Option<Arc<dyn TranslationPath>> {
            self.targets.contains(target.code()).then(|| {
                Arc::new(FakePath {
                    from: self.code.clone(),
                    to: target.code().to_string(),
                    fail: self.fail_translation,
                }) as Arc<dyn TranslationPath>
            })
        }
    }

    #[derive(Debug)]
    struct FakePath {
        from: String,
        to: String,
        fail: bool,
    }

    impl TranslationPath for FakePath {
        fn from_code(&self) -> &str {
            &self.from
        }

        fn to_code(&self) -> &str {
            &self.to
        }

        fn translate(&self, text: &str) -> Result<String> {
            if self.fail {
                return Err(Error::TranslationExecution("model crashed".to_string()));
            }
            Ok(format!("[{}->{}] {}", self.from, self.to, text))
        }
    }
}
