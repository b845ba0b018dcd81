use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;

use ckan_downloader::config::{ConfigLoader, ConfigOverrides, ExtractionStrategyKind};
use ckan_downloader::downloader::Downloader;
use ckan_downloader::logger::{LogOptions, Logger, TracingLogger, init_tracing};
use ckan_downloader::output::{OutputMode, print_download};

#[derive(Parser)]
#[command(name = "ckan-dl")]
#[command(about = "Download the resource files of a CKAN dataset package")]
#[command(version, author)]
struct Cli {
    /// Exact name of the package in the catalog
    package: String,

    /// Only download the resource with this file name
    #[arg(long)]
    resource: Option<String>,

    /// Extract downloaded archives
    #[arg(long)]
    extract: bool,

    #[arg(long)]
    strategy: Option<ExtractionStrategyKind>,

    /// Base URL of the CKAN API, e.g. https://data.gov.lv/dati/api/3/
    #[arg(long)]
    catalog_url: Option<String>,

    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    download_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    extract_dir: Option<Utf8PathBuf>,

    /// Path to a ckan-dl.json config file
    #[arg(long)]
    config: Option<String>,

    /// Only print errors
    #[arg(long, short)]
    quiet: bool,

    /// Do not prefix log lines with a timestamp
    #[arg(long)]
    no_timer: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(LogOptions {
        quiet: cli.quiet,
        show_timer: !cli.no_timer,
    });
    let logger = TracingLogger;

    let overrides = ConfigOverrides {
        catalog_url: cli.catalog_url,
        api_key: cli.api_key,
        download_dir: cli.download_dir,
        extract_dir: cli.extract_dir,
        strategy: cli.strategy,
    };
    let config = match ConfigLoader::resolve(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(err) => logger.emergency(&err.to_string()),
    };

    let downloader = match Downloader::connect(config) {
        Ok(downloader) => downloader,
        Err(err) => logger.emergency(&err.to_string()),
    };
    let result = match downloader.download(&cli.package, cli.resource.as_deref(), cli.extract) {
        Ok(result) => result,
        Err(err) => logger.emergency(&err.to_string()),
    };

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    print_download(mode, &result).into_diagnostic()?;
    Ok(())
}
