use crate::error::{Error, Result};
use crate::package::{LanguagePair, PackageDescriptor};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const INSTALL_PREFIX: &str = "translate-";

/// The local directory of downloaded package files.
#[derive(Debug, Clone)]
pub struct PackageStore {
    dir: PathBuf,
    extension: String,
}

impl PackageStore {
    pub fn new(dir: PathBuf, extension: impl Into<String>) -> Self {
        Self {
            dir,
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Package files in the store, sorted by name. The directory is never created here.
    pub fn list_local_package_files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(Error::StoreNotFound(self.dir.clone()));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && self.has_package_extension(&path) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn ensure_directory(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            tracing::info!("Created directory: {:?}", self.dir);
        }
        Ok(())
    }

    pub fn destination_path(&self, descriptor: &PackageDescriptor) -> PathBuf {
        self.dir.join(descriptor.filename(&self.extension))
    }

    /// Pairs encoded in `translate-<input>_<output>-<version>` filenames; anything else is skipped.
    pub fn derive_available_pairs(&self, files: &[PathBuf]) -> BTreeSet<LanguagePair> {
        let mut pairs = BTreeSet::new();

        for file in files {
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!("Skipping package with non UTF-8 name: {:?}", file);
                continue;
            };

            match parse_pair(stem) {
                Some(pair) => {
                    tracing::debug!("Derived {} from {}", pair, stem);
                    pairs.insert(pair);
                }
                None => tracing::warn!("Skipping package with unrecognized name: {:?}", file),
            }
        }

        pairs
    }

    /// Lists the store and derives its pairs in one go.
    pub fn available_pairs(&self) -> Result<BTreeSet<LanguagePair>> {
        let files = self.list_local_package_files()?;
        if files.is_empty() {
            return Err(Error::NoPackageFiles(self.dir.clone()));
        }
        Ok(self.derive_available_pairs(&files))
    }

    fn has_package_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

fn parse_pair(stem: &str) -> Option<LanguagePair> {
    let rest = stem.strip_prefix(INSTALL_PREFIX)?;
    let (codes, version) = rest.split_once('-')?;
    if version.is_empty() {
        return None;
    }

    let (input, output) = codes.split_once('_')?;
    let valid = |code: &str| !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid(input) || !valid(output) {
        return None;
    }

    Some(LanguagePair::new(input, output))
}
