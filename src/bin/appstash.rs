use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use appstash::app::{App, BatchOutcome};
use appstash::catalog::{CatalogClient, CatalogHttpClient, LookupReply};
use appstash::config::ConfigLoader;
use appstash::domain::{BundleId, Locale, Selection};
use appstash::error::StashError;
use appstash::output::{ConsoleOutput, JsonOutput, OutputMode};
use appstash::store::Store;

#[derive(Parser)]
#[command(name = "appstash")]
#[command(about = "Local App Store metadata and icon cache")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch metadata and icons for bundle ids ('*' selects every cached id)")]
    Fetch(FetchArgs),
    #[command(about = "Download icons for cached apps that are missing one")]
    Icons,
    #[command(about = "List bundle ids with cached metadata")]
    List,
    #[command(about = "Show cached details for one bundle id")]
    Info(InfoArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(required = true)]
    ids: Vec<String>,

    #[arg(long)]
    force: bool,

    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args)]
struct InfoArgs {
    id: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(stash) = report.downcast_ref::<StashError>() {
            return ExitCode::from(map_exit_code(stash));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &StashError) -> u8 {
    match error {
        StashError::AppNotFound(_) | StashError::DocumentNotFound { .. } => 2,
        StashError::ConfigRead(_) | StashError::ConfigParse(_) => 2,
        StashError::CatalogHttp(_)
        | StashError::CatalogTimeout(_)
        | StashError::CatalogStatus { .. }
        | StashError::CatalogSchema(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    let store = Store::from_config(&config).into_diagnostic()?;

    match cli.command {
        Commands::Fetch(args) => {
            if let Some(workers) = args.workers {
                config.workers = workers.max(1);
            }
            let selection = Selection::from_args(&args.ids).into_diagnostic()?;
            let catalog = CatalogHttpClient::new().into_diagnostic()?;
            let app = App::new(store, catalog, config);
            run_fetch(app, &selection, args.force, output_mode)
        }
        Commands::Icons => {
            let catalog = CatalogHttpClient::new().into_diagnostic()?;
            let app = App::new(store, catalog, config);
            run_icons(app, output_mode)
        }
        Commands::List => {
            let app = App::new(store, NopCatalog, config);
            run_list(app, output_mode)
        }
        Commands::Info(args) => {
            let app = App::new(store, NopCatalog, config);
            run_info(app, &args.id, output_mode)
        }
    }
}

#[derive(Clone, Copy)]
struct NopCatalog;

impl CatalogClient for NopCatalog {
    fn lookup(&self, _id: &BundleId, _locale: &Locale) -> Result<LookupReply, StashError> {
        Err(StashError::CatalogHttp(
            "catalog client not configured".to_string(),
        ))
    }

    fn download_asset(&self, _url: &str) -> Result<Vec<u8>, StashError> {
        Err(StashError::CatalogHttp(
            "catalog client not configured".to_string(),
        ))
    }
}

fn run_fetch<C: CatalogClient>(
    app: App<C>,
    selection: &Selection,
    force: bool,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app
                .process_many(selection, force, &JsonOutput)
                .into_diagnostic()?;
            JsonOutput::print_batch(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app
                .process_many(selection, force, &ConsoleOutput)
                .into_diagnostic()?;
            print_batch_summary(&result);
            Ok(())
        }
    }
}

fn run_icons<C: CatalogClient>(app: App<C>, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.download_missing_icons(&JsonOutput).into_diagnostic()?;
            JsonOutput::print_batch(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let result = app.download_missing_icons(&ConsoleOutput).into_diagnostic()?;
            print_batch_summary(&result);
            Ok(())
        }
    }
}

fn run_list<C: CatalogClient>(app: App<C>, output_mode: OutputMode) -> miette::Result<()> {
    let result = app.list().into_diagnostic()?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_list(&result).into_diagnostic(),
        OutputMode::Interactive => {
            for entry in &result.apps {
                let icon = if entry.icon { "icon" } else { "no icon" };
                println!("{} ({}; {})", entry.id, entry.locales.join(", "), icon);
            }
            println!("{} app(s) cached", result.apps.len());
            Ok(())
        }
    }
}

fn run_info<C: CatalogClient>(
    app: App<C>,
    raw_id: &str,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let id = raw_id.parse::<BundleId>().into_diagnostic()?;
    let result = app.info(&id).into_diagnostic()?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_info(&result).into_diagnostic(),
        OutputMode::Interactive => {
            println!("{}", result.id);
            let locales = if result.locales.is_empty() {
                "-".to_string()
            } else {
                result.locales.join(", ")
            };
            println!("  locales: {locales}");
            println!("  icon: {}", if result.icon { "yes" } else { "no" });
            for (locale, name) in &result.names {
                println!("  name[{locale}]: {name}");
            }
            for (genre_id, label) in &result.genres {
                println!("  genre: {label} ({genre_id})");
            }
            Ok(())
        }
    }
}

fn print_batch_summary(result: &BatchOutcome) {
    println!();
    println!(
        "processed {} app(s), {} newly indexable",
        result.processed,
        result.newly_created.len()
    );
    for id in &result.newly_created {
        println!("  new: {id}");
    }
}
