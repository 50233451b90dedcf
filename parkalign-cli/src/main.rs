use clap::Parser;
use parkalign::image::io::{load_image, save_image};
use parkalign::{
    load_lot_dir, render_overlay, AlignmentDiagnostics, AlignmentOutcome, CenterBox, Detection,
    FailureKind, FallbackPolicy, FeatureConfig, MatchConfig, OccupancyPipeline, OccupancyReport,
    PipelineConfig, PipelineError, RansacConfig, StaticDetector,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "ParkAlign CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for stage timings and counters.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DetectionsFormat {
    /// `[{"x1", "y1", "x2", "y2", "confidence"}]` with confidence in [0, 1].
    #[default]
    Boxes,
    /// `[{"x", "y", "width", "height", "confidence"}]` with confidence in
    /// [0, 100], optionally wrapped as `{"predictions": [...]}`.
    CenterPercent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FallbackConfig {
    #[default]
    Reject,
    UseUnaligned,
}

impl From<FallbackConfig> for FallbackPolicy {
    fn from(value: FallbackConfig) -> Self {
        match value {
            FallbackConfig::Reject => FallbackPolicy::Reject,
            FallbackConfig::UseUnaligned => FallbackPolicy::UseUnaligned,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FeatureConfigJson {
    max_keypoints: usize,
    levels: usize,
    blur_sigma: f32,
    window_sigma: f32,
    harris_k: f32,
    quality_level: f32,
    nms_radius: usize,
    border: usize,
    parallel: bool,
}

impl Default for FeatureConfigJson {
    fn default() -> Self {
        let cfg = FeatureConfig::default();
        Self {
            max_keypoints: cfg.max_keypoints,
            levels: cfg.levels,
            blur_sigma: cfg.blur_sigma,
            window_sigma: cfg.window_sigma,
            harris_k: cfg.harris_k,
            quality_level: cfg.quality_level,
            nms_radius: cfg.nms_radius,
            border: cfg.border,
            parallel: cfg.parallel,
        }
    }
}

impl From<FeatureConfigJson> for FeatureConfig {
    fn from(value: FeatureConfigJson) -> Self {
        Self {
            max_keypoints: value.max_keypoints,
            levels: value.levels,
            blur_sigma: value.blur_sigma,
            window_sigma: value.window_sigma,
            harris_k: value.harris_k,
            quality_level: value.quality_level,
            nms_radius: value.nms_radius,
            border: value.border,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    ratio: f32,
    cross_check: bool,
    parallel: bool,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            ratio: cfg.ratio,
            cross_check: cfg.cross_check,
            parallel: cfg.parallel,
        }
    }
}

impl From<MatchConfigJson> for MatchConfig {
    fn from(value: MatchConfigJson) -> Self {
        Self {
            ratio: value.ratio,
            cross_check: value.cross_check,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RansacConfigJson {
    min_matches: usize,
    reproj_threshold: f64,
    max_iters: usize,
    confidence: f64,
    seed: u64,
    refine: bool,
}

impl Default for RansacConfigJson {
    fn default() -> Self {
        let cfg = RansacConfig::default();
        Self {
            min_matches: cfg.min_matches,
            reproj_threshold: cfg.reproj_threshold,
            max_iters: cfg.max_iters,
            confidence: cfg.confidence,
            seed: cfg.seed,
            refine: cfg.refine,
        }
    }
}

impl From<RansacConfigJson> for RansacConfig {
    fn from(value: RansacConfigJson) -> Self {
        Self {
            min_matches: value.min_matches,
            reproj_threshold: value.reproj_threshold,
            max_iters: value.max_iters,
            confidence: value.confidence,
            seed: value.seed,
            refine: value.refine,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    lots_dir: String,
    lot_id: String,
    image_path: String,
    detections_path: Option<String>,
    detections_format: DetectionsFormat,
    output_path: Option<String>,
    aligned_path: Option<String>,
    overlay_path: Option<String>,
    fallback: FallbackConfig,
    min_inliers: Option<usize>,
    min_confidence: f64,
    background: u8,
    features: FeatureConfigJson,
    matching: MatchConfigJson,
    ransac: RansacConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lots_dir: "lots".to_string(),
            lot_id: String::new(),
            image_path: String::new(),
            detections_path: None,
            detections_format: DetectionsFormat::default(),
            output_path: None,
            aligned_path: None,
            overlay_path: None,
            fallback: FallbackConfig::default(),
            min_inliers: None,
            min_confidence: 0.0,
            background: 0,
            features: FeatureConfigJson::default(),
            matching: MatchConfigJson::default(),
            ransac: RansacConfigJson::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BoxRecord {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CenterFile {
    Wrapped { predictions: Vec<CenterBox> },
    Bare(Vec<CenterBox>),
}

fn load_detections(
    path: &str,
    format: &DetectionsFormat,
) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let detections = match format {
        DetectionsFormat::Boxes => serde_json::from_str::<Vec<BoxRecord>>(&text)?
            .into_iter()
            .map(|b| Detection::new(b.x1, b.y1, b.x2, b.y2, b.confidence))
            .collect::<Result<Vec<_>, _>>()?,
        DetectionsFormat::CenterPercent => {
            let boxes = match serde_json::from_str::<CenterFile>(&text)? {
                CenterFile::Wrapped { predictions } => predictions,
                CenterFile::Bare(boxes) => boxes,
            };
            boxes
                .iter()
                .map(CenterBox::to_detection)
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(detections)
}

#[derive(Debug, Serialize)]
struct Output<'a> {
    lot_id: &'a str,
    aligned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    homography: Option<[[f64; 3]; 3]>,
    diagnostics: AlignmentDiagnostics,
    #[serde(flatten)]
    occupancy: &'a OccupancyReport,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("parkalign=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.lot_id.is_empty() || config.image_path.is_empty() {
        return Err("lot_id and image_path must be set in the config".into());
    }

    let lot = load_lot_dir(&config.lots_dir, &config.lot_id)?;
    let live = load_image(&config.image_path)?;
    let detections = match &config.detections_path {
        Some(path) => load_detections(path, &config.detections_format)?,
        None => Vec::new(),
    };

    let pipeline_config = PipelineConfig {
        features: config.features.into(),
        matching: config.matching.into(),
        ransac: config.ransac.into(),
        background: config.background,
        min_inliers: config.min_inliers,
        min_confidence: config.min_confidence,
        fallback: config.fallback.into(),
    };
    let pipeline = OccupancyPipeline::new(&pipeline_config, StaticDetector::new(detections))?;

    let report = match pipeline.run(&lot, &live) {
        Ok(report) => report,
        Err(PipelineError::Alignment(failure)) => {
            let json = serde_json::to_string_pretty(&failure)?;
            eprintln!("{json}");
            return Err(failure.into());
        }
        Err(err) => return Err(err.into()),
    };

    let (failure, homography) = match &report.alignment {
        AlignmentOutcome::Aligned { homography, .. } => (None, Some(homography.to_rows())),
        AlignmentOutcome::Unaligned(failure) => (Some(failure.kind), None),
    };
    tracing::info!(
        lot_id = %lot.id(),
        aligned = report.alignment.is_aligned(),
        occupied = report.occupancy.occupied().count(),
        "occupancy evaluated"
    );

    if let Some(path) = &config.aligned_path {
        save_image(&report.image, path)?;
    }
    if let Some(path) = &config.overlay_path {
        let overlay = render_overlay(
            &report.image,
            lot.spots(),
            &report.occupancy,
            &report.detections,
        );
        save_image(&overlay, path)?;
    }

    let output = Output {
        lot_id: lot.id(),
        aligned: report.alignment.is_aligned(),
        failure,
        homography,
        diagnostics: *report.alignment.diagnostics(),
        occupancy: &report.occupancy,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
