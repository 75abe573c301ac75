use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Models directory '{}' not found. Create it and place .argosmodel files inside, or run `uot --install-models`.", .0.display())]
	StoreNotFound(PathBuf),

	#[error("No model files found in '{}'. Run `uot --install-models` to download the missing packages.", .0.display())]
	NoPackageFiles(PathBuf),

	#[error("Failed to fetch index from {url}: {reason}")]
	IndexFetch { url: String, reason: String },

	#[error("Invalid JSON in index: {0}")]
	IndexParse(String),

	#[error("Download of {url} failed: {reason}")]
	Download { url: String, reason: String },

	#[error("Failed to install model '{file}': {reason}")]
	Install { file: String, reason: String },

	#[error("Failed to install any models from {attempted} package file(s).")]
	NoPackagesInstalled { attempted: usize },

	#[error("Pair {from}→{to} is not available. Available combinations: {available}")]
	PairNotAvailable {
		from: String,
		to: String,
		available: String,
	},

	#[error("Language '{code}' is not installed (installed: {installed}). Run `uot --install-models` to download the missing packages.")]
	LanguageNotInstalled { code: String, installed: String },

	#[error("No translation path from '{from}' to '{to}'. Run `uot --install-models` to download the missing packages.")]
	NoTranslationPath { from: String, to: String },

	#[error("Translation failed: {0}")]
	TranslationExecution(String),

	#[error("{0}")]
	InvalidInput(String),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::Config(err.to_string())
	}
}

impl From<zip::result::ZipError> for Error {
	fn from(err: zip::result::ZipError) -> Self {
		Error::Serialization(format!("invalid package archive: {}", err))
	}
}

pub type Result<T> = std::result::Result<T, Error>;
