use crate::config::Config;
use crate::error::{Error, Result};
use crate::runtime::{InstalledLanguage, TranslationPath, TranslationRuntime};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use zip::ZipArchive;

const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Deserialize)]
struct PackageMetadata {
    #[serde(rename = "type", default)]
    package_type: Option<String>,
    #[serde(default)]
    package_version: Option<String>,
    from_code: String,
    to_code: String,
    #[serde(default)]
    from_name: Option<String>,
    #[serde(default)]
    to_name: Option<String>,
}

/// Installs Argos packages by unpacking them into a packages directory and translates by
/// running the Argos command line translator against that directory.
pub struct ArgosRuntime {
    packages_dir: PathBuf,
    translator: Translator,
}

#[derive(Debug, Clone)]
struct Translator {
    program: String,
    args: Vec<String>,
    packages_dir: PathBuf,
}

impl ArgosRuntime {
    pub fn new(packages_dir: PathBuf, translator_command: &str) -> Result<Self> {
        let mut parts = translator_command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Config("translator command is empty".to_string()))?;

        Ok(Self {
            translator: Translator {
                program,
                args: parts.collect(),
                packages_dir: packages_dir.clone(),
            },
            packages_dir,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.packages_dir.clone(), &config.translator_command)
    }

    fn installed_metadata(&self) -> Result<Vec<PackageMetadata>> {
        if !self.packages_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut packages = Vec::new();
        for entry in fs::read_dir(&self.packages_dir)? {
            let path = entry?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !path.is_dir() || hidden {
                continue;
            }

            match read_metadata(&path.join(METADATA_FILE)) {
                Ok(metadata) if is_translation(&metadata) => packages.push(metadata),
                Ok(_) => tracing::debug!("Ignoring non-translation package {:?}", path),
                Err(e) => tracing::warn!("Ignoring package {:?}: {}", path, e),
            }
        }
        Ok(packages)
    }

    fn unpack(&self, path: &Path) -> Result<PackageMetadata> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let invalid = |reason: &str| Error::Install {
            file: file_name.clone(),
            reason: reason.to_string(),
        };

        let mut archive = ZipArchive::new(File::open(path)?)?;

        let mut root: Option<PathBuf> = None;
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            let name = entry
                .enclosed_name()
                .ok_or_else(|| invalid("archive entry escapes the package root"))?;
            let first = match name.components().next() {
                Some(Component::Normal(first)) => PathBuf::from(first),
                _ => return Err(invalid("archive entry without a package directory")),
            };
            match &root {
                None => root = Some(first),
                Some(existing) if *existing == first => {}
                Some(_) => return Err(invalid("archive has more than one top-level directory")),
            }
        }
        let root = root.ok_or_else(|| invalid("archive is empty"))?;

        let metadata_name = format!("{}/{}", root.display(), METADATA_FILE);
        let metadata: PackageMetadata = {
            let entry = archive
                .by_name(&metadata_name)
                .map_err(|_| invalid("metadata.json not found"))?;
            serde_json::from_reader(entry)?
        };
        if !is_translation(&metadata) {
            return Err(invalid("not a translation package"));
        }

        fs::create_dir_all(&self.packages_dir)?;
        let staging = self
            .packages_dir
            .join(format!(".{}.installing", root.display()));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let Some(relative) = entry
                .enclosed_name()
                .and_then(|name| name.strip_prefix(&root).ok())
                .map(Path::to_path_buf)
            else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }

            let out = staging.join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&out)?;
            } else {
                if let Some(parent) = out.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut outfile = File::create(&out)?;
                io::copy(&mut entry, &mut outfile)?;
            }
        }

        let target = self.packages_dir.join(&root);
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        fs::rename(&staging, &target)?;

        Ok(metadata)
    }
}

impl TranslationRuntime for ArgosRuntime {
    fn installed_languages(&self) -> Result<Vec<Arc<dyn InstalledLanguage>>> {
        let mut languages: BTreeMap<String, (String, BTreeSet<String>)> = BTreeMap::new();

        for package in self.installed_metadata()? {
            let from_name = package.from_name.clone().unwrap_or_else(|| package.from_code.clone());
            let to_name = package.to_name.clone().unwrap_or_else(|| package.to_code.clone());

            languages
                .entry(package.from_code.clone())
                .or_insert_with(|| (from_name, BTreeSet::new()))
                .1
                .insert(package.to_code.clone());
            languages
                .entry(package.to_code.clone())
                .or_insert_with(|| (to_name, BTreeSet::new()));
        }

        Ok(languages
            .into_iter()
            .map(|(code, (name, targets))| {
                Arc::new(ArgosLanguage {
                    code,
                    name,
                    targets,
                    translator: self.translator.clone(),
                }) as Arc<dyn InstalledLanguage>
            })
            .collect())
    }

    fn install_package(&self, path: &Path) -> Result<()> {
        let metadata = self.unpack(path)?;
        tracing::debug!(
            "Unpacked {}→{} (version {})",
            metadata.from_code,
            metadata.to_code,
            metadata.package_version.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }
}

fn read_metadata(path: &Path) -> Result<PackageMetadata> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn is_translation(metadata: &PackageMetadata) -> bool {
    metadata
        .package_type
        .as_deref()
        .map_or(true, |t| t == "translate")
}

#[derive(Debug)]
struct ArgosLanguage {
    code: String,
    name: String,
    targets: BTreeSet<String>,
    translator: Translator,
}

impl InstalledLanguage for ArgosLanguage {
    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn translation_to(&self, target: &dyn InstalledLanguage) -> Option<Arc<dyn TranslationPath>> {
        if !self.targets.contains(target.code()) {
            return None;
        }
        Some(Arc::new(ArgosTranslation {
            from: self.code.clone(),
            to: target.code().to_string(),
            translator: self.translator.clone(),
        }))
    }
}

#[derive(Debug)]
struct ArgosTranslation {
    from: String,
    to: String,
    translator: Translator,
}

impl TranslationPath for ArgosTranslation {
    fn from_code(&self) -> &str {
        &self.from
    }

    fn to_code(&self) -> &str {
        &self.to
    }

    fn translate(&self, text: &str) -> Result<String> {
        let translator = &self.translator;
        let mut child = Command::new(&translator.program)
            .args(&translator.args)
            .args(["--from-lang", &self.from, "--to-lang", &self.to])
            .env("ARGOS_PACKAGES_DIR", &translator.packages_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::TranslationExecution(format!(
                    "could not start '{}': {}",
                    translator.program, e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let input = text.to_string();
            // Written from a separate thread so a chatty child cannot deadlock on a full pipe.
            std::thread::spawn(move || {
                let _ = stdin.write_all(input.as_bytes());
            });
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::TranslationExecution(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::TranslationExecution(format!(
                "'{}' exited with {}: {}",
                translator.program,
                output.status,
                stderr.trim()
            )));
        }

        let translated = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if translated.is_empty() && !text.trim().is_empty() {
            return Err(Error::TranslationExecution(
                "translator produced no output".to_string(),
            ));
        }
        Ok(translated)
    }
}
