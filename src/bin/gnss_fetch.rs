use std::process::ExitCode;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gnss_archive_fetch::catalog::ArchiveCatalog;
use gnss_archive_fetch::config::{ConfigLoader, ResolvedConfig, Transport};
use gnss_archive_fetch::domain::ProductRequest;
use gnss_archive_fetch::engine::Engine;
use gnss_archive_fetch::epoch::Epoch;
use gnss_archive_fetch::error::GnssError;
use gnss_archive_fetch::http::HttpFetcher;
use gnss_archive_fetch::output::{EpochInfo, JsonOutput, TextOutput};
use gnss_archive_fetch::plan;
use gnss_archive_fetch::report::{
    FetchReport, LogFileReporter, MemoryReporter, MultiReporter, OutcomeSink, TracingReporter,
};
use gnss_archive_fetch::store::Store;
use gnss_archive_fetch::tools::{
    Converter, Crx2RnxConverter, Decompressor, Fetcher, NativeDecompressor, RemoteFile,
    WgetFetcher,
};

const EXIT_FILES_FAILED: u8 = 4;

#[derive(Parser)]
#[command(name = "gnss-fetch")]
#[command(about = "Fetch GNSS observations and products from IGS archives into a canonical local tree")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch every file the config asks for")]
    Fetch(FetchArgs),
    #[command(about = "Print resolved requests and URLs without fetching")]
    Plan(PlanArgs),
    #[command(about = "Convert a date to year, day-of-year and GPS week")]
    Epoch(EpochArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long, default_value_t = 1)]
    jobs: usize,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct PlanArgs {
    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct EpochArgs {
    /// `YYYY-MM-DD`, or a year followed by a day-of-year.
    date: String,
    doy: Option<u32>,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(gnss) = report.downcast_ref::<GnssError>() {
                return ExitCode::from(map_exit_code(gnss));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &GnssError) -> u8 {
    match error {
        GnssError::MissingConfig
        | GnssError::ConfigRead(_)
        | GnssError::ConfigParse(_)
        | GnssError::InvalidConfig(_)
        | GnssError::InvalidSiteCode(_)
        | GnssError::InvalidCenter(_)
        | GnssError::InvalidArchive(_)
        | GnssError::InvalidEpoch(_)
        | GnssError::InvalidHour(_) => 2,
        GnssError::MissingTool(_)
        | GnssError::ToolFailed { .. }
        | GnssError::ToolTimeout { .. }
        | GnssError::Http(_)
        | GnssError::HttpStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::Plan(args) => run_plan(args),
        Commands::Epoch(args) => run_epoch(args),
    }
}

fn open_store(config: &ResolvedConfig) -> miette::Result<Store> {
    let root = match &config.output_root {
        Some(root) => root.clone(),
        None => Store::default_root()?,
    };
    Ok(Store::new(root))
}

fn run_plan(args: PlanArgs) -> miette::Result<ExitCode> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    print_plan(&config)
}

fn print_plan(config: &ResolvedConfig) -> miette::Result<ExitCode> {
    let requests = plan::build_requests(config)?;
    let engine = Engine::new(
        ArchiveCatalog::new(config.mirror),
        open_store(config)?,
        PlanOnly,
        PlanOnly,
        PlanOnly,
    );
    let planned = requests
        .iter()
        .map(|request| engine.preview(request))
        .collect::<Vec<_>>();
    JsonOutput::print_plan(&planned).into_diagnostic()?;
    Ok(ExitCode::SUCCESS)
}

fn run_fetch(args: FetchArgs) -> miette::Result<ExitCode> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    if args.dry_run {
        return print_plan(&config);
    }
    let requests = plan::build_requests(&config)?;

    let converter = Crx2RnxConverter::new(&config.tools);
    if config.observations.is_some() && !converter.is_available() {
        return Err(GnssError::MissingTool("crx2rnx".to_string()).into());
    }
    let decompressor = NativeDecompressor::new(&config.tools);

    let collector = Arc::new(MemoryReporter::new());
    let mut sink = MultiReporter::new()
        .with(Arc::new(TracingReporter))
        .with(collector.clone());
    if let Some(log) = &config.log {
        sink = sink.with(Arc::new(LogFileReporter::open(&log.path, log.mode)?));
    }

    let store = open_store(&config)?;
    let catalog = ArchiveCatalog::new(config.mirror);
    match config.transport {
        Transport::Wget => {
            let fetcher = WgetFetcher::new(&config.tools)?;
            let engine = Engine::new(catalog, store, fetcher, decompressor, converter);
            fetch_all(&engine, &requests, args.jobs, &sink);
        }
        Transport::Http => {
            let fetcher = HttpFetcher::new(config.tools.timeout)?;
            let engine = Engine::new(catalog, store, fetcher, decompressor, converter);
            fetch_all(&engine, &requests, args.jobs, &sink);
        }
    }

    let report = collector.fetch_report();
    finish(&report, &args)
}

fn fetch_all<F: Fetcher, D: Decompressor, C: Converter>(
    engine: &Engine<F, D, C>,
    requests: &[ProductRequest],
    jobs: usize,
    sink: &dyn OutcomeSink,
) {
    info!(
        count = requests.len(),
        jobs,
        mirror = %engine.catalog().mirror(),
        root = %engine.store().root(),
        "fetching"
    );
    engine.acquire_all_parallel(requests, jobs, sink);
}

fn finish(report: &FetchReport, args: &FetchArgs) -> miette::Result<ExitCode> {
    if let Some(path) = &args.report {
        let bytes = JsonOutput::to_bytes(report).into_diagnostic()?;
        Store::write_bytes_atomic(path, &bytes)?;
    }
    if args.json {
        JsonOutput::print_report(report).into_diagnostic()?;
    } else {
        TextOutput::print_summary(report).into_diagnostic()?;
    }
    if report.has_failures() {
        return Ok(ExitCode::from(EXIT_FILES_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_epoch(args: EpochArgs) -> miette::Result<ExitCode> {
    let epoch = match args.doy {
        Some(doy) => {
            let year = args
                .date
                .trim()
                .parse::<i32>()
                .map_err(|_| GnssError::InvalidEpoch(args.date.clone()))?;
            Epoch::from_year_doy(year, doy)?
        }
        None => args.date.parse::<Epoch>()?,
    };
    let info = EpochInfo::from(&epoch);
    if args.json {
        JsonOutput::print_epoch(&info).into_diagnostic()?;
    } else {
        TextOutput::print_epoch(&info).into_diagnostic()?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Stand-in collaborators for planning, which never reaches them.
struct PlanOnly;

impl Fetcher for PlanOnly {
    fn fetch(
        &self,
        _remote: &RemoteFile,
        _work_dir: &Utf8Path,
    ) -> Result<(), GnssError> {
        Err(GnssError::Http("planning does not fetch".to_string()))
    }
}

impl Decompressor for PlanOnly {
    fn decompress(&self, path: &Utf8Path) -> Result<Utf8PathBuf, GnssError> {
        Ok(path.to_path_buf())
    }
}

impl Converter for PlanOnly {
    fn convert(
        &self,
        _input: &Utf8Path,
        _output: &Utf8Path,
    ) -> Result<(), GnssError> {
        Ok(())
    }
}
