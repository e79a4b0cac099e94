use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use transient_data::app::{App, DEFAULT_SESSION_WAIT, PipelineOptions};
use transient_data::config::{ConfigLoader, ResolvedConfig};
use transient_data::domain::{DataMode, GrbName, PromptBinning, TransientCategory, TransientName};
use transient_data::error::DataError;
use transient_data::output::{HumanOutput, JsonOutput, OutputMode};
use transient_data::remote::HttpSource;
use transient_data::store::Store;
use transient_data::webdriver::WebDriverLauncher;

#[derive(Parser)]
#[command(name = "tdata")]
#[command(about = "Fetch and normalize Swift GRB and open-catalog transient light curves")]
#[command(version, author)]
struct Cli {
    /// Store data under the shared per-user data directory instead of the working directory
    #[arg(long, global = true)]
    default_dir: bool,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, env = "TDATA_WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Seconds to wait for the remote to prepare a download
    #[arg(long, global = true)]
    session_wait: Option<u64>,

    /// Directory with full LGRB_table.txt and SGRB_table.txt trigger tables
    #[arg(long, global = true, env = "TDATA_TABLES_DIR")]
    tables_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Swift BAT+XRT afterglow light curve")]
    Afterglow(AfterglowArgs),
    #[command(about = "Swift XRT-only flux light curve")]
    Xrt(GrbArgs),
    #[command(about = "Swift BAT prompt light curve")]
    Prompt(PromptArgs),
    #[command(about = "Open transient catalog photometry")]
    Catalog(TransientArgs),
    #[command(name = "fix-t0", about = "Rewrite relative times against a known epoch")]
    FixT0(FixT0Args),
    #[command(about = "Fetch everything listed in tdata.json")]
    Sync(SyncArgs),
    #[command(about = "Look up the Swift trigger number of a GRB")]
    Trigger(GrbArgs),
}

#[derive(Args)]
struct GrbArgs {
    grb: String,
}

#[derive(Args)]
struct AfterglowArgs {
    grb: String,

    #[arg(long, value_enum, default_value_t = DataMode::Flux)]
    mode: DataMode,
}

#[derive(Args)]
struct PromptArgs {
    grb: String,

    #[arg(long = "bin", value_enum, default_value_t = PromptBinning::Ms2)]
    binning: PromptBinning,
}

#[derive(Args)]
struct TransientArgs {
    name: String,

    #[arg(long = "type", value_enum)]
    category: TransientCategory,
}

#[derive(Args)]
struct FixT0Args {
    name: String,

    #[arg(long = "type", value_enum)]
    category: TransientCategory,

    /// Epoch of the event in MJD
    #[arg(long, allow_negative_numbers = true)]
    mjd: f64,
}

#[derive(Args)]
struct SyncArgs {
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<DataError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DataError) -> u8 {
    match error {
        DataError::InvalidConfiguration(_)
        | DataError::RawDataMissing(_)
        | DataError::ProcessedDataMissing(_)
        | DataError::MissingConfig
        | DataError::ConfigRead(_)
        | DataError::ConfigParse(_) => 2,
        DataError::RemoteResourceUnavailable(_)
        | DataError::Http(_)
        | DataError::HttpStatus { .. }
        | DataError::Browser(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let store = Store::new()?;

    let config = match &cli.command {
        Commands::Sync(args) => Some(ConfigLoader::resolve(args.config.as_deref())?),
        _ => None,
    };
    let app = build_app(store, &cli, config.as_ref())?;

    match cli.command {
        Commands::Afterglow(args) => {
            let grb: GrbName = args.grb.parse()?;
            let result = app.get_afterglow_data_from_swift(&grb, args.mode)?;
            emit(output_mode, &result, JsonOutput::print_afterglow, HumanOutput::afterglow)
        }
        Commands::Xrt(args) => {
            let grb: GrbName = args.grb.parse()?;
            let result = app.get_xrt_data_from_swift(&grb)?;
            emit(output_mode, &result, JsonOutput::print_xrt, HumanOutput::xrt)
        }
        Commands::Prompt(args) => {
            let grb: GrbName = args.grb.parse()?;
            let result = app.get_prompt_data_from_swift(&grb, args.binning)?;
            emit(output_mode, &result, JsonOutput::print_prompt, HumanOutput::prompt)
        }
        Commands::Catalog(args) => {
            let name: TransientName = args.name.parse()?;
            let result = app.get_open_transient_catalog_data(&name, args.category)?;
            emit(output_mode, &result, JsonOutput::print_catalog, HumanOutput::catalog)
        }
        Commands::FixT0(args) => {
            let name: TransientName = args.name.parse()?;
            let result = app.fix_t0_of_transient(&name, args.category, args.mjd)?;
            emit(output_mode, &result, JsonOutput::print_catalog, HumanOutput::catalog)
        }
        Commands::Sync(_) => {
            let config = config.ok_or(DataError::MissingConfig)?;
            let result = app.sync(&config)?;
            emit(output_mode, &result, JsonOutput::print_sync, |result| {
                HumanOutput::sync(result).join("\n")
            })
        }
        Commands::Trigger(args) => {
            let grb: GrbName = args.grb.parse()?;
            let result = app.trigger_number(&grb);
            emit(output_mode, &result, JsonOutput::print_trigger, |result| {
                format!("GRB{} trigger {}", result.grb, result.trigger)
            })
        }
    }
}

/// Command-line flags win over the batch file.
fn build_app(
    store: Store,
    cli: &Cli,
    config: Option<&ResolvedConfig>,
) -> Result<App<HttpSource, WebDriverLauncher>, DataError> {
    let mut settings = config
        .map(|config| config.webdriver.clone())
        .unwrap_or_default();
    if let Some(url) = &cli.webdriver_url {
        settings.url = url.clone();
    }
    let options = PipelineOptions {
        use_default_directory: cli.default_dir
            || config.is_some_and(|config| config.use_default_directory),
        session_wait: cli
            .session_wait
            .map(Duration::from_secs)
            .or(config.map(|config| config.session_wait))
            .unwrap_or(DEFAULT_SESSION_WAIT),
    };
    let remote = HttpSource::new()?;
    let browser = WebDriverLauncher::new(settings)?;
    let app = App::new(store, remote, browser, options);
    let tables_dir = cli
        .tables_dir
        .as_ref()
        .or(config.and_then(|config| config.tables_dir.as_ref()));
    match tables_dir {
        Some(dir) => app.with_tables_dir(dir),
        None => Ok(app),
    }
}

fn emit<T>(
    mode: OutputMode,
    result: &T,
    json: fn(&T) -> std::io::Result<()>,
    human: impl Fn(&T) -> String,
) -> miette::Result<()> {
    match mode {
        OutputMode::Json => json(result).into_diagnostic(),
        OutputMode::Human => {
            println!("{}", human(result));
            Ok(())
        }
    }
}
