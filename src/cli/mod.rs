use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "uot")]
#[command(version, about = "Universal Offline Translator", long_about = None)]
#[command(disable_version_flag = true)]
#[command(after_help = "Examples:\n  uot --il en --ol sk Hello world\n  echo Hello world | uot --il en --ol sk -i")]
pub struct Cli {
	/// Input language code
	#[arg(long = "il", value_name = "CODE", visible_alias = "input-language")]
	pub input_language: Option<String>,

	/// Output language code
	#[arg(long = "ol", value_name = "CODE", visible_alias = "output-language")]
	pub output_language: Option<String>,

	/// Interactive mode (show [INFO] logs on stderr)
	#[arg(short = 'i', long)]
	pub interactive: bool,

	/// Show version info and exit
	#[arg(short = 'v', long = "version", action = ArgAction::Version)]
	#[allow(dead_code)]
	version: Option<bool>,

	/// Download and install models from the Argos package index
	#[arg(long = "install-models", visible_alias = "im")]
	pub install_models: bool,

	/// Clear cached language state and the cached package index
	#[arg(long)]
	pub clean_cache: bool,

	/// List languages the translation runtime has installed
	#[arg(long)]
	pub list_languages: bool,

	/// List language pairs available from the models directory
	#[arg(long)]
	pub list_pairs: bool,

	/// Directory holding .argosmodel package files
	#[arg(long, value_name = "DIR", env = "UOT_MODELS_DIR")]
	pub models_dir: Option<PathBuf>,

	/// Text to translate (read from stdin when omitted)
	#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
	pub text: Vec<String>,
}

impl Cli {
	/// Actions that replace translation. `--clean-cache` is not one of them: it runs first and
	/// translation still follows when languages are given.
	pub fn has_action(&self) -> bool {
		self.install_models || self.list_languages || self.list_pairs
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trailing_words_form_the_text() {
		let cli = Cli::try_parse_from(["uot", "--il", "en", "--ol", "sk", "Hello", "-world"]).unwrap();
		assert_eq!(cli.input_language.as_deref(), Some("en"));
		assert_eq!(cli.output_language.as_deref(), Some("sk"));
		assert_eq!(cli.text, vec!["Hello", "-world"]);
		assert!(!cli.has_action());
	}

	#[test]
	fn actions_parse_without_languages() {
		let cli = Cli::try_parse_from(["uot", "--im", "-i"]).unwrap();
		assert!(cli.install_models);
		assert!(cli.interactive);
		assert!(cli.has_action());
	}

	#[test]
	fn clean_cache_does_not_replace_translation() {
		let cli = Cli::try_parse_from(["uot", "--clean-cache", "--il", "en", "--ol", "sk", "Hello"]).unwrap();
		assert!(cli.clean_cache);
		assert!(!cli.has_action());
		assert_eq!(cli.text, vec!["Hello"]);
	}

	#[test]
	fn cli_definition_is_consistent() {
		use clap::CommandFactory;
		Cli::command().debug_assert();
	}
}
