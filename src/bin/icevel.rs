use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use icevel_pipeline::blacklist::Blacklist;
use icevel_pipeline::catalog::GranuleFilter;
use icevel_pipeline::checksum::{self, TERMINUS_WINDOW};
use icevel_pipeline::config::ConfigLoader;
use icevel_pipeline::error::IcevelError;
use icevel_pipeline::granule::Source;
use icevel_pipeline::output::{JsonOutput, OutputMode};
use icevel_pipeline::pipeline::{self, Pipeline, QaResult};
use icevel_pipeline::tools::{Cdo, GdalTranslate};

#[derive(Parser)]
#[command(name = "icevel")]
#[command(about = "Ice-velocity granule ingestion and merge pipeline")]
#[command(version, author)]
struct Cli {
    /// Emit machine-readable JSON instead of the human summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Convert and merge every configured parameter")]
    Run(RunArgs),
    #[command(about = "List the filtered granule catalog in merge order")]
    Scan(ScanArgs),
    #[command(about = "Compute domain checksums for one converted artifact")]
    Qa(QaArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct ScanArgs {
    dir: String,

    #[arg(long)]
    source: Option<Source>,

    #[arg(long)]
    grid: Option<String>,

    #[arg(long)]
    parameter: Option<String>,

    #[arg(long)]
    ext: Option<String>,
}

#[derive(Args)]
struct QaArgs {
    file: String,

    parameter: String,

    /// Fill value marking invalid pixels in the vendor product.
    #[arg(long, default_value_t = -2.0e9)]
    fill_value: f64,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<IcevelError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IcevelError) -> u8 {
    match error {
        IcevelError::MissingConfig
        | IcevelError::ConfigRead(_)
        | IcevelError::ConfigParse(_)
        | IcevelError::BlacklistRead(_)
        | IcevelError::UnknownSource(_) => 2,
        IcevelError::MissingTool(_)
        | IcevelError::ConversionFailed(_)
        | IcevelError::MergeFailed(_) => 3,
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
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Run(args) => run_pipeline(args, output_mode),
        Commands::Scan(args) => run_scan(args, output_mode),
        Commands::Qa(args) => run_qa(args, output_mode),
    }
}

fn run_pipeline(args: RunArgs, output_mode: OutputMode) -> miette::Result<()> {
    let resolved = ConfigLoader::resolve(args.config.as_deref()).into_diagnostic()?;
    let blacklist = match &resolved.blacklist {
        Some(path) => Blacklist::load(path).into_diagnostic()?,
        None => Blacklist::empty(),
    };

    let raster = GdalTranslate::new().into_diagnostic()?;
    let time_axis = Cdo::new().into_diagnostic()?;
    let pipeline = Pipeline::new(raster, time_axis);

    let result = pipeline.run(&resolved.plan, &blacklist).into_diagnostic()?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_run(&result).into_diagnostic()?,
        OutputMode::Human => {
            println!(
                "converted {} granule(s), reused {}, blacklisted {}",
                result.converted, result.reused, result.excluded
            );
            for merged in &result.merged {
                println!("merged   {merged}");
            }
            println!("combined {}", result.combined);
        }
    }
    Ok(())
}

fn run_scan(args: ScanArgs, output_mode: OutputMode) -> miette::Result<()> {
    let filter = GranuleFilter {
        source: args.source,
        grid: args.grid,
        parameter: args.parameter,
        extension: args.ext,
        ..GranuleFilter::default()
    };
    let result = pipeline::scan(Utf8Path::new(&args.dir), &filter).into_diagnostic()?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_scan(&result).into_diagnostic()?,
        OutputMode::Human => {
            for entry in &result.entries {
                println!(
                    "{}  {} {}  {}..{}  {}",
                    entry.file_name,
                    entry.source,
                    entry.grid,
                    entry.start_date,
                    entry.end_date,
                    if entry.parameter.is_empty() {
                        "-"
                    } else {
                        &entry.parameter
                    },
                );
            }
            eprintln!("{} granule(s)", result.entries.len());
        }
    }
    Ok(())
}

fn run_qa(args: QaArgs, output_mode: OutputMode) -> miette::Result<()> {
    let reader = Cdo::new().into_diagnostic()?;
    let path = Utf8PathBuf::from(&args.file);
    let slice = checksum::read_first_slice(&reader, &path, &args.parameter, args.fill_value)
        .into_diagnostic()?;

    let result = QaResult {
        file: args.file,
        parameter: args.parameter,
        full_domain: checksum::full_domain_checksum(&slice),
        terminus_window: checksum::window_checksum(&slice, &TERMINUS_WINDOW),
    };

    match output_mode {
        OutputMode::Json => JsonOutput::print_qa(&result).into_diagnostic()?,
        OutputMode::Human => {
            println!("full domain:     {}", result.full_domain);
            println!("terminus window: {}", result.terminus_window);
        }
    }
    Ok(())
}
