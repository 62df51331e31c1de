use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use arcgis_catalog::config::ConfigLoader;
use arcgis_catalog::connector::ArcgisConnector;
use arcgis_catalog::error::CatalogError;
use arcgis_catalog::output::JsonOutput;

#[derive(Parser)]
#[command(name = "arcgis-catalog")]
#[command(about = "Browse an ArcGIS REST services directory and download layers as GeoJSON")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (defaults to ./arcgis-catalog.json)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Catalog base URL, overrides the config file
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Validate the configuration and check that the catalog answers")]
    Prepare,
    #[command(about = "List folders and resources under a catalog node")]
    List(ListArgs),
    #[command(about = "Download a layer as a GeoJSON file")]
    Get(GetArgs),
    #[command(about = "List map services as datasets")]
    Datasets,
    #[command(about = "Show one dataset")]
    Dataset(DatasetArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Node URL to list, as returned in a previous listing
    #[arg(long)]
    folder: Option<String>,
}

#[derive(Args)]
struct GetArgs {
    /// Layer URL, as returned in a listing
    resource: String,

    #[arg(long, default_value = ".")]
    dest: Utf8PathBuf,
}

#[derive(Args)]
struct DatasetArgs {
    id: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    match error {
        CatalogError::MissingConfig
        | CatalogError::InvalidConfig(_)
        | CatalogError::ConfigRead(_)
        | CatalogError::ConfigParse(_) => 2,
        CatalogError::Unreachable(_)
        | CatalogError::Http(_)
        | CatalogError::Status { .. }
        | CatalogError::Service { .. }
        | CatalogError::Malformed { .. }
        | CatalogError::Download { .. } => 3,
        CatalogError::UnsupportedResourceType(_) => 4,
        CatalogError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref(), cli.url.as_deref())?;
    let connector = ArcgisConnector::from_config(config)?;

    match cli.command {
        Command::Prepare => {
            connector.prepare()?;
            println!("catalog reachable: {}", connector.config().url);
        }
        Command::List(args) => {
            let result = connector.list(args.folder.as_deref())?;
            JsonOutput::print_list(&result).into_diagnostic()?;
        }
        Command::Get(args) => {
            let resource = connector.get_resource(&args.resource, &args.dest)?;
            JsonOutput::print_resource(&resource).into_diagnostic()?;
        }
        Command::Datasets => {
            let result = connector.list_datasets()?;
            JsonOutput::print_datasets(&result).into_diagnostic()?;
        }
        Command::Dataset(args) => match connector.get_dataset(&args.id)? {
            Some(dataset) => JsonOutput::print_dataset(&dataset).into_diagnostic()?,
            None => {
                return Err(miette::Report::msg(format!("dataset not found: {}", args.id)));
            }
        },
    }
    Ok(())
}
