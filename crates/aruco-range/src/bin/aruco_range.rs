//! aruco-range CLI: generate markers, measure distance and centering offset
//! on single images or image sequences.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use aruco_range::aruco::Dictionary;
use aruco_range::print::{generate_markers, GenerateRequest, MarkerFormat};
use aruco_range::{
    analyze_frame, aruco::ArucoDetector, run_frame_loop, Annotator, AppConfig, DirectorySink,
    FrameAnalysis, FrameProcessor, FrameSink, ImageSequenceSource, LoopOptions, NullSink,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use serde::Serialize;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "aruco-range")]
#[command(about = "Detect ArUco markers and estimate their distance and offset from the frame center")]
#[command(version)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Shorthand for `--log-level debug`.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Args)]
struct Overrides {
    /// Focal length in pixels.
    #[arg(long, global = true)]
    focal_length: Option<f64>,

    /// Real marker side, in the configured distance unit.
    #[arg(long, global = true)]
    marker_width: Option<f64>,

    /// Centering threshold in pixels.
    #[arg(long, global = true)]
    threshold: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write printable marker images.
    Generate(GenerateArgs),

    /// Detect markers in one image.
    Detect(DetectArgs),

    /// Run over an image sequence (sorted by file name).
    Track(TrackArgs),

    /// Print dictionary metadata.
    DictInfo {
        #[arg(long)]
        dictionary: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
struct GenerateArgs {
    #[arg(long)]
    out_dir: PathBuf,

    #[arg(long, default_value = "20")]
    count: u32,

    #[arg(long, default_value = "0")]
    first_id: u32,

    /// Marker side in pixels.
    #[arg(long, default_value = "200")]
    size: usize,

    /// White margin around PNG markers, in pixels.
    #[arg(long, default_value = "0")]
    quiet_zone: usize,

    #[arg(long, value_enum, default_value_t = FormatArg::Png)]
    format: FormatArg,

    /// Dictionary name; defaults to the configured one.
    #[arg(long)]
    dictionary: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    #[arg(long)]
    image: PathBuf,

    /// Annotated output image.
    #[arg(long)]
    out: Option<PathBuf>,

    /// JSON report.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct TrackArgs {
    /// Directory of frames.
    #[arg(long)]
    input: PathBuf,

    /// Directory for annotated frames.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// JSON report with one entry per frame.
    #[arg(long)]
    report: Option<PathBuf>,

    #[arg(long)]
    max_frames: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Png,
    Svg,
}

impl From<FormatArg> for MarkerFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Png => MarkerFormat::Png,
            FormatArg::Svg => MarkerFormat::Svg,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        cli.log_level.into()
    };
    init_logging(level)?;

    let cfg = load_config(cli.config.as_deref(), &cli.overrides)?;

    match cli.command {
        Commands::Generate(args) => run_generate(&cfg, &args),
        Commands::Detect(args) => run_detect(&cfg, &args),
        Commands::Track(args) => run_track(&cfg, &args),
        Commands::DictInfo { dictionary } => run_dict_info(&cfg, dictionary.as_deref()),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(_level: LevelFilter) -> CliResult<()> {
    aruco_range::core::init_tracing(false);
    // Forward `log` records when the subscriber did not install the bridge.
    let _ = tracing_log::LogTracer::init();
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter) -> CliResult<()> {
    aruco_range::core::init_with_level(level)?;
    Ok(())
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> CliResult<AppConfig> {
    let cfg = match path {
        Some(p) => {
            info!("loading config {}", p.display());
            AppConfig::load(p)?
        }
        None => AppConfig::default(),
    };
    Ok(cfg.with_overrides(
        overrides.focal_length,
        overrides.marker_width,
        overrides.threshold,
    )?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    info!("wrote report {}", path.display());
    Ok(())
}

// ── generate ──────────────────────────────────────────────────────────

fn run_generate(cfg: &AppConfig, args: &GenerateArgs) -> CliResult<()> {
    let dict = match &args.dictionary {
        Some(name) => Dictionary::by_name(name)?,
        None => cfg.dictionary()?,
    };
    let request = GenerateRequest {
        first_id: args.first_id,
        count: args.count,
        size_px: args.size,
        quiet_zone_px: args.quiet_zone,
        format: args.format.into(),
    };
    let paths = generate_markers(&dict, &request, &args.out_dir)?;
    for p in &paths {
        println!("{}", p.display());
    }
    Ok(())
}

// ── detect ────────────────────────────────────────────────────────────

fn print_analysis(analysis: &FrameAnalysis, unit: &str) {
    if analysis.markers.is_empty() {
        println!("no markers detected");
        return;
    }
    for m in &analysis.markers {
        println!(
            "marker {}: distance {}, center ({}, {}), offset ({}, {}), {}",
            m.id,
            m.distance_label(unit),
            m.center.x,
            m.center.y,
            m.offset.x,
            m.offset.y,
            if m.alignment.is_centered() {
                "centered"
            } else {
                "off-center"
            }
        );
    }
}

fn run_detect(cfg: &AppConfig, args: &DetectArgs) -> CliResult<()> {
    let rgb = image::open(&args.image)?.to_rgb8();
    let gray = image::imageops::grayscale(&rgb);

    let detector = ArucoDetector::new(cfg.dictionary()?, cfg.detector.clone());
    let analysis = analyze_frame(&detector, &cfg.camera, &cfg.guidance, &gray);
    print_analysis(&analysis, &cfg.unit);

    if let Some(out) = &args.out {
        let annotator = Annotator::new(cfg.overlay.clone(), cfg.unit.clone())?;
        annotator.render(&rgb, &analysis, None).save(out)?;
        info!("wrote {}", out.display());
    }
    if let Some(report) = &args.report {
        write_json(report, &analysis)?;
    }
    Ok(())
}

// ── track ─────────────────────────────────────────────────────────────

fn run_track(cfg: &AppConfig, args: &TrackArgs) -> CliResult<()> {
    let mut source = ImageSequenceSource::from_dir(&args.input)?;
    let mut sink: Box<dyn FrameSink> = match &args.out_dir {
        Some(dir) => Box::new(DirectorySink::new(dir)?),
        None => Box::new(NullSink),
    };
    let mut processor = FrameProcessor::from_config(cfg)?;

    let options = LoopOptions {
        max_frames: args.max_frames,
        keep_reports: args.report.is_some(),
        ..LoopOptions::default()
    };
    ctrlc::set_handler({
        let cancel = options.cancel.clone();
        move || {
            eprintln!("received Ctrl-C, stopping");
            cancel.store(true, Ordering::SeqCst);
        }
    })?;

    let summary = run_frame_loop(&mut source, sink.as_mut(), &mut processor, &options)?;

    for r in &summary.reports {
        println!("[{}] {}", r.index, r.name);
        print_analysis(&r.analysis, &cfg.unit);
    }
    println!(
        "frames: {}, with markers: {}, markers: {}, avg fps: {:.1}{}",
        summary.frames,
        summary.frames_with_markers,
        summary.markers_seen,
        summary.average_fps,
        if summary.cancelled { " (cancelled)" } else { "" }
    );

    if let Some(report) = &args.report {
        write_json(report, &summary)?;
    }
    Ok(())
}

// ── dict-info ─────────────────────────────────────────────────────────

fn run_dict_info(cfg: &AppConfig, name: Option<&str>) -> CliResult<()> {
    let dict = match name {
        Some(n) => Dictionary::by_name(n)?,
        None => cfg.dictionary()?,
    };

    println!("dictionary:      {}", dict.name);
    println!("marker size:     {0}x{0} bits", dict.marker_size);
    println!("markers:         {}", dict.len());
    println!("max correction:  {} bits", dict.max_correction_bits);
    if let Some(first) = dict.code(0) {
        println!("code 0:          0x{first:04X}");
    }
    Ok(())
}
