use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use golden_cli::render::render_keypoints;
use golden_cli::session::{golden_path_for_model, latest_png, load_grayscale, promote_to_golden};
use golden_cli::{ComparisonRequest, GoldenError, GoldenResult, PipelineConfig, QuerySource};
use golden_core::init_thread_pool;
use golden_sift::SiftExtractor;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Golden-image visual comparison
#[derive(Parser, Debug)]
#[command(name = "golden", author, version, about = "Compare screen captures against a Golden reference image")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a query capture with a Golden image
    Compare(CompareArgs),
    /// Detect keypoints in one image and draw them
    Inspect(InspectArgs),
    /// Store a capture as the Golden image of a model
    Promote(PromoteArgs),
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Golden image file
    #[arg(long, conflicts_with = "model", required_unless_present = "model")]
    golden: Option<PathBuf>,

    /// Model name; the Golden image is `<golden-dir>/<model>.png`
    #[arg(long)]
    model: Option<String>,

    /// Golden library folder used with --model
    #[arg(long, default_value = "screenshots/Golden_image")]
    golden_dir: PathBuf,

    /// Query image file
    #[arg(long, conflicts_with = "query_dir", required_unless_present = "query_dir")]
    query: Option<PathBuf>,

    /// Use the newest PNG in this folder as the query
    #[arg(long)]
    query_dir: Option<PathBuf>,

    /// Save the annotated comparison image into this folder
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Ratio-test factor, overrides the config file
    #[arg(long)]
    ratio: Option<f32>,

    /// Pass threshold in percent, overrides the config file
    #[arg(long)]
    threshold: Option<f64>,

    /// Pipeline configuration (.json or .toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Image to analyse
    image: PathBuf,

    /// Output file for the keypoint overlay (default: `<image>_keypoints.png`)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pipeline configuration (.json or .toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PromoteArgs {
    /// Model name
    #[arg(long)]
    model: String,

    /// Golden library folder
    #[arg(long, default_value = "screenshots/Golden_image")]
    golden_dir: PathBuf,

    /// Capture to promote
    #[arg(long, conflicts_with = "capture_dir", required_unless_present = "capture_dir")]
    capture: Option<PathBuf>,

    /// Promote the newest PNG in this folder
    #[arg(long)]
    capture_dir: Option<PathBuf>,
}

fn setup_logging(verbose: u8) {
    let base_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Logger initialization failed: {}", e);
    }
}

fn load_config(path: Option<&Path>) -> GoldenResult<PipelineConfig> {
    match path {
        Some(path) => {
            let config = PipelineConfig::load(path)?;
            info!(path = %path.display(), "{}", config.summary());
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn size_thread_pool(config: &PipelineConfig) {
    if let Err(e) = init_thread_pool(config.matching.n_threads) {
        warn!("Keeping the existing thread pool: {}", e);
    }
}

fn compare(args: CompareArgs) -> GoldenResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(ratio) = args.ratio {
        config.matching.ratio = ratio;
    }
    if let Some(threshold) = args.threshold {
        config.matching.threshold = threshold;
    }
    size_thread_pool(&config);

    let golden = match (args.golden, args.model) {
        (Some(golden), _) => golden,
        (None, Some(model)) => golden_path_for_model(&args.golden_dir, &model),
        (None, None) => unreachable!("clap requires --golden or --model"),
    };
    let query = match (args.query, args.query_dir) {
        (Some(file), _) => QuerySource::File(file),
        (None, Some(dir)) => QuerySource::LatestIn(dir),
        (None, None) => unreachable!("clap requires --query or --query-dir"),
    };

    let mut request = ComparisonRequest::new(golden, query).with_config(config);
    if let Some(dir) = args.output_dir {
        request = request.with_output_dir(dir);
    }

    let report = request.run()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.result)?);
    } else {
        println!("{}", report.result);
    }
    if let Some(path) = &report.output_path {
        info!(path = %path.display(), "Comparison image written");
    }
    Ok(())
}

fn inspect(args: InspectArgs) -> GoldenResult<()> {
    let config = load_config(args.config.as_deref())?;
    size_thread_pool(&config);

    let img = load_grayscale(&args.image)?;
    let extractor = SiftExtractor::new(config.extractor)?;
    let keypoints = extractor.detect(&img)?;

    let output = args.output.unwrap_or_else(|| {
        let stem = args.image.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
        args.image.with_file_name(format!("{stem}_keypoints.png"))
    });
    render_keypoints(&img, &keypoints)
        .save(&output)
        .map_err(|source| GoldenError::Encode {
            path: output.clone(),
            source,
        })?;

    println!("Detected {} keypoints, overlay saved to {}", keypoints.len(), output.display());
    Ok(())
}

fn promote(args: PromoteArgs) -> GoldenResult<()> {
    let capture = match (args.capture, args.capture_dir) {
        (Some(file), _) => file,
        (None, Some(dir)) => latest_png(&dir)?,
        (None, None) => unreachable!("clap requires --capture or --capture-dir"),
    };
    let target = promote_to_golden(&capture, &args.golden_dir, &args.model)?;
    println!("Golden image for {} saved as {}", args.model, target.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Compare(args) => compare(args),
        Command::Inspect(args) => inspect(args),
        Command::Promote(args) => promote(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
