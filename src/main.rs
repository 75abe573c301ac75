mod cli;
mod config;
mod error;
mod model;
mod package;
mod router;
mod runtime;
#[cfg(test)]
mod testing;

use clap::{CommandFactory, Parser};
use cli::Cli;
use config::Config;
use error::{Error, Result};
use model::LanguageRegistry;
use package::{
    format_pairs, language_codes, pair_groups, AcquisitionReport, Downloader, PackageAcquirer,
    PackageIndexClient, PackageStore,
};
use router::TranslationRouter;
use runtime::ArgosRuntime;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;

fn init_logging(interactive: bool) {
    let default = if interactive { "uot=info" } else { "uot=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 {
        init_logging(false);
        print_help(None);
        return ExitCode::SUCCESS;
    }

    let cli = Cli::parse();
    init_logging(cli.interactive);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            ExitCode::FAILURE
        }
    }
}

struct App {
    config: Config,
    store: PackageStore,
    registry: Arc<LanguageRegistry>,
}

impl App {
    fn new(mut config: Config, models_dir: Option<std::path::PathBuf>) -> Result<Self> {
        if let Some(dir) = models_dir {
            config.models_dir = dir;
        }

        let runtime = Arc::new(ArgosRuntime::from_config(&config)?);
        let registry =
            Arc::new(LanguageRegistry::new(runtime).with_index_cache(config.index_cache_path()));
        let store = PackageStore::new(config.models_dir.clone(), config.package_extension.clone());

        Ok(Self {
            config,
            store,
            registry,
        })
    }

    fn router(&self) -> TranslationRouter {
        TranslationRouter::new(self.store.clone(), self.registry.clone())
    }

    fn acquirer(&self) -> Result<PackageAcquirer> {
        let index =
            PackageIndexClient::new(self.config.index_url.clone(), self.config.request_timeout)?
                .with_cache(self.config.index_cache_path());
        let downloader = Downloader::from_config(&self.config)?;
        let installer = model::InstallCoordinator::new(self.registry.clone());

        Ok(PackageAcquirer::new(
            &self.config,
            self.store.clone(),
            index,
            downloader,
            installer,
        ))
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let app = App::new(Config::from_env()?, cli.models_dir.clone())?;
    tracing::debug!(
        "Models directory {:?}, data directory {:?}",
        app.config.models_dir,
        app.config.data_dir
    );

    if cli.clean_cache {
        app.registry.clean_cache()?;
        println!("Cache cleaned.");
    }

    if cli.has_action() {
        return run_action(&app, &cli).await;
    }

    let (Some(from), Some(to)) = (cli.input_language.as_deref(), cli.output_language.as_deref())
    else {
        if cli.clean_cache {
            return Ok(ExitCode::SUCCESS);
        }
        print_help(Some(&app.store));
        return Ok(ExitCode::FAILURE);
    };

    let router = app.router();
    let text = translation_input(&router, from, to, &cli.text).await?;

    let start = Instant::now();
    let translated = router.route(from, to, &text).await?;
    println!("{}", translated);
    tracing::info!(
        "Translation took {:.2} seconds",
        start.elapsed().as_secs_f64()
    );

    Ok(ExitCode::SUCCESS)
}

async fn run_action(app: &App, cli: &Cli) -> Result<ExitCode> {
    if cli.install_models {
        let acquirer = app.acquirer()?;
        println!("Fetching model index from {}...", acquirer.index_url());
        let report = acquirer.install_from_index().await?;
        print_summary(&report);

        if let Some(err) = report.install_error {
            eprintln!("[ERROR] {}", err);
            return Ok(ExitCode::FAILURE);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let router = app.router();

    if cli.list_pairs {
        for group in pair_groups(&router.available_pairs()?) {
            println!("{}", group);
        }
    }

    if cli.list_languages {
        let snapshot = router.ensure_installed().await?;
        for language in snapshot.languages() {
            println!("{}\t{}", language.code(), language.name());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Checks the pair before touching stdin, so a bad pair fails without waiting for input.
async fn translation_input(
    router: &TranslationRouter,
    from: &str,
    to: &str,
    words: &[String],
) -> Result<String> {
    router.validate_pair(from, to)?;

    let text = if words.is_empty() {
        tracing::info!("Waiting for input from stdin... (Ctrl+D to end)");
        let mut input = String::new();
        tokio::io::stdin().read_to_string(&mut input).await?;
        input
    } else {
        words.join(" ")
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput("No input provided.".to_string()));
    }
    Ok(text.to_string())
}

fn print_help(store: Option<&PackageStore>) {
    let _ = Cli::command().print_help();
    println!();

    let store = match store {
        Some(store) => store.clone(),
        None => match Config::from_env() {
            Ok(config) => PackageStore::new(config.models_dir, config.package_extension),
            Err(_) => return,
        },
    };

    match store.available_pairs() {
        Ok(pairs) => {
            let codes: Vec<_> = language_codes(&pairs).into_iter().collect();
            println!("Available languages: {}", codes.join(", "));
            println!("Available pairs: {}", format_pairs(&pairs));
        }
        Err(e) => println!("No languages available: {}", e),
    }
}

fn print_summary(report: &AcquisitionReport) {
    println!("\nFinished processing.\n");
    println!("Total entries in index: {}", report.total_entries);
    println!("Packages found: {}", report.found);
    println!("Packages downloaded: {}", report.downloaded);
    println!("Packages not found (404): {}", report.not_found);
    println!("Packages failed: {}", report.failed);
    println!("Skipped invalid entries: {}", report.skipped_invalid);
    println!("Packages skipped (already exist): {}", report.already_present);
    println!("Packages installed: {}", report.installed);
}
