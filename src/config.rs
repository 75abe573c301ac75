use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INDEX_URL: &str =
	"https://raw.githubusercontent.com/argosopentech/argospm-index/main/index.json";
pub const DEFAULT_BASE_URL: &str = "https://data.argosopentech.com/argospm/v1/";
pub const PACKAGE_EXTENSION: &str = "argosmodel";

#[derive(Debug, Clone)]
pub struct Config {
	pub models_dir: PathBuf,
	pub data_dir: PathBuf,
	pub packages_dir: PathBuf,
	pub cache_dir: PathBuf,
	pub index_url: String,
	pub base_url: String,
	pub package_extension: String,
	pub request_timeout: Duration,
	pub download_retries: u32,
	pub retry_backoff: Duration,
	pub download_workers: usize,
	pub install_workers: usize,
	pub translator_command: String,
}

/// Optional overrides read from `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
	models_dir: Option<PathBuf>,
	data_dir: Option<PathBuf>,
	packages_dir: Option<PathBuf>,
	index_url: Option<String>,
	base_url: Option<String>,
	request_timeout_secs: Option<u64>,
	download_retries: Option<u32>,
	retry_backoff_secs: Option<u64>,
	download_workers: Option<usize>,
	install_workers: Option<usize>,
	translator_command: Option<String>,
}

impl Config {
	pub fn new() -> Result<Self> {
		let project_dirs = ProjectDirs::from("", "", "uot")
			.ok_or_else(|| Error::Config("Could not determine data directory".to_string()))?;

		let data_dir = project_dirs.data_dir().to_path_buf();
		Ok(Self::with_dirs(
			PathBuf::from("models"),
			data_dir,
			project_dirs.cache_dir().to_path_buf(),
		))
	}

	/// Builds a config rooted at explicit directories, with every other knob at its default.
	pub fn with_dirs(models_dir: PathBuf, data_dir: PathBuf, cache_dir: PathBuf) -> Self {
		let packages_dir = data_dir.join("packages");
		Self {
			models_dir,
			data_dir,
			packages_dir,
			cache_dir,
			index_url: DEFAULT_INDEX_URL.to_string(),
			base_url: DEFAULT_BASE_URL.to_string(),
			package_extension: PACKAGE_EXTENSION.to_string(),
			request_timeout: Duration::from_secs(10),
			download_retries: 3,
			retry_backoff: Duration::from_secs(2),
			download_workers: 3,
			install_workers: 2,
			translator_command: "argos-translate".to_string(),
		}
	}

	/// Defaults, then `config.toml` from the config directory, then environment variables.
	pub fn from_env() -> Result<Self> {
		let mut config = Self::new()?;

		if let Some(project_dirs) = ProjectDirs::from("", "", "uot") {
			let file = project_dirs.config_dir().join("config.toml");
			if file.exists() {
				config.apply_file(&file)?;
			}
		}

		if let Ok(data_dir) = std::env::var("UOT_DATA_DIR") {
			config.set_data_dir(PathBuf::from(data_dir));
		}
		if let Ok(models_dir) = std::env::var("UOT_MODELS_DIR") {
			config.models_dir = PathBuf::from(models_dir);
		}
		if let Ok(packages_dir) = std::env::var("ARGOS_PACKAGES_DIR") {
			config.packages_dir = PathBuf::from(packages_dir);
		}
		if let Ok(url) = std::env::var("UOT_INDEX_URL") {
			config.index_url = url;
		}
		if let Ok(url) = std::env::var("UOT_BASE_URL") {
			config.base_url = url;
		}
		if let Ok(command) = std::env::var("UOT_TRANSLATOR") {
			config.translator_command = command;
		}

		config.validate()?;
		Ok(config)
	}

	fn apply_file(&mut self, path: &Path) -> Result<()> {
		tracing::debug!("Reading configuration from {:?}", path);
		let content = std::fs::read_to_string(path)?;
		let file: FileConfig = toml::from_str(&content)?;

		if let Some(data_dir) = file.data_dir {
			self.set_data_dir(data_dir);
		}
		if let Some(models_dir) = file.models_dir {
			self.models_dir = models_dir;
		}
		if let Some(packages_dir) = file.packages_dir {
			self.packages_dir = packages_dir;
		}
		if let Some(url) = file.index_url {
			self.index_url = url;
		}
		if let Some(url) = file.base_url {
			self.base_url = url;
		}
		if let Some(secs) = file.request_timeout_secs {
			self.request_timeout = Duration::from_secs(secs);
		}
		if let Some(retries) = file.download_retries {
			self.download_retries = retries;
		}
		if let Some(secs) = file.retry_backoff_secs {
			self.retry_backoff = Duration::from_secs(secs);
		}
		if let Some(workers) = file.download_workers {
			self.download_workers = workers;
		}
		if let Some(workers) = file.install_workers {
			self.install_workers = workers;
		}
		if let Some(command) = file.translator_command {
			self.translator_command = command;
		}
		Ok(())
	}

	fn set_data_dir(&mut self, data_dir: PathBuf) {
		self.packages_dir = data_dir.join("packages");
		self.data_dir = data_dir;
	}

	fn validate(&self) -> Result<()> {
		if self.download_retries == 0 {
			return Err(Error::Config("download_retries must be at least 1".to_string()));
		}
		if self.download_workers == 0 || self.install_workers == 0 {
			return Err(Error::Config("worker counts must be at least 1".to_string()));
		}
		if self.translator_command.trim().is_empty() {
			return Err(Error::Config("translator_command cannot be empty".to_string()));
		}
		Ok(())
	}

	/// Location of the last fetched remote index.
	pub fn index_cache_path(&self) -> PathBuf {
		self.cache_dir.join("index.json")
	}
}
