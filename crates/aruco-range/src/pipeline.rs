//! Frame loop: pull frames from a source, analyze and annotate them, push
//! the result to a sink.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aruco_range_aruco::ArucoDetector;
use image::RgbImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::annotate::Annotator;
use crate::config::AppConfig;
use crate::detect::{analyze_frame, FrameAnalysis};
use crate::fps::FpsMeter;
use crate::guidance::GuidanceParams;
use crate::AppError;
use aruco_range_core::CameraModel;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// One frame pulled from a source.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: usize,
    /// Source name, e.g. the file stem.
    pub name: String,
    pub image: RgbImage,
}

pub trait FrameSource {
    /// Next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, AppError>;

    /// Release the underlying device or files.
    fn release(&mut self) {}
}

pub trait FrameSink {
    fn write(&mut self, frame: &Frame, annotated: &RgbImage) -> Result<(), AppError>;

    fn finish(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Reads image files in order.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    /// All image files in `dir`, sorted by file name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        if paths.is_empty() {
            return Err(AppError::NoFrames(dir.to_path_buf()));
        }
        debug!("found {} frames in {}", paths.len(), dir.display());
        Ok(Self { paths, next: 0 })
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths, next: 0 }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, AppError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let image = image::open(path)?.to_rgb8();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("frame_{:05}", self.next));
        let frame = Frame {
            index: self.next,
            name,
            image,
        };
        self.next += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.next = self.paths.len();
    }
}

/// Writes annotated frames as `<name>.png` into a directory.
///
/// A name already used in this run (`a.png` next to `a.jpg`) gets the frame
/// index appended, `<name>_<index>.png`, so no output is overwritten.
pub struct DirectorySink {
    dir: PathBuf,
    written: usize,
    used: HashSet<String>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: 0,
            used: HashSet::new(),
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for DirectorySink {
    fn write(&mut self, frame: &Frame, annotated: &RgbImage) -> Result<(), AppError> {
        let mut file = format!("{}.png", frame.name);
        if !self.used.insert(file.clone()) {
            file = format!("{}_{:05}.png", frame.name, frame.index);
            debug!("output name {} taken, writing {}", frame.name, file);
            self.used.insert(file.clone());
        }
        annotated.save(self.dir.join(file))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AppError> {
        info!("wrote {} annotated frames to {}", self.written, self.dir.display());
        Ok(())
    }
}

/// Discards frames.
#[derive(Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write(&mut self, _frame: &Frame, _annotated: &RgbImage) -> Result<(), AppError> {
        Ok(())
    }
}

/// Detector, camera and overlay bundled for per-frame processing.
pub struct FrameProcessor {
    detector: ArucoDetector,
    camera: CameraModel,
    guidance: GuidanceParams,
    annotator: Annotator,
    fps: FpsMeter,
}

impl FrameProcessor {
    pub fn new(
        detector: ArucoDetector,
        camera: CameraModel,
        guidance: GuidanceParams,
        annotator: Annotator,
        fps_window: usize,
    ) -> Self {
        Self {
            detector,
            camera,
            guidance,
            annotator,
            fps: FpsMeter::new(fps_window),
        }
    }

    /// Build every component from a validated config.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        cfg.validate()?;
        let detector = ArucoDetector::new(cfg.dictionary()?, cfg.detector.clone());
        let annotator = Annotator::new(cfg.overlay.clone(), cfg.unit.clone())?;
        Ok(Self::new(
            detector,
            cfg.camera,
            cfg.guidance.clone(),
            annotator,
            cfg.fps_window,
        ))
    }

    /// Analyze one RGB frame and return the analysis and the annotated copy.
    pub fn process(&mut self, frame: &RgbImage) -> (FrameAnalysis, RgbImage) {
        let gray = image::imageops::grayscale(frame);
        let analysis = analyze_frame(&self.detector, &self.camera, &self.guidance, &gray);
        let fps = self.fps.tick();
        let annotated = self.annotator.render(frame, &analysis, Some(fps));
        (analysis, annotated)
    }

    pub fn average_fps(&self) -> f64 {
        self.fps.average()
    }
}

/// Per-frame entry of a run report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub index: usize,
    pub name: String,
    #[serde(flatten)]
    pub analysis: FrameAnalysis,
}

/// Outcome of [`run_frame_loop`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub frames: usize,
    pub frames_with_markers: usize,
    pub markers_seen: usize,
    pub average_fps: f64,
    pub cancelled: bool,
    /// Filled only when [`LoopOptions::keep_reports`] is set.
    pub reports: Vec<FrameReport>,
}

/// Stop conditions for [`run_frame_loop`].
#[derive(Clone, Debug, Default)]
pub struct LoopOptions {
    pub max_frames: Option<usize>,
    /// Polled between frames; set it to stop the loop.
    pub cancel: Arc<AtomicBool>,
    /// Keep one [`FrameReport`] per frame in the summary. Off by default so
    /// long runs stay in constant memory.
    pub keep_reports: bool,
}

/// Run the loop until the source is exhausted, `max_frames` is reached or
/// the cancel flag is set.
///
/// The source is always released and the sink always finished, whatever the
/// outcome. The first error wins.
pub fn run_frame_loop(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    processor: &mut FrameProcessor,
    options: &LoopOptions,
) -> Result<RunSummary, AppError> {
    let result = drive(source, sink, processor, options);
    source.release();
    let finished = sink.finish();
    let summary = result?;
    finished?;
    Ok(summary)
}

fn drive(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    processor: &mut FrameProcessor,
    options: &LoopOptions,
) -> Result<RunSummary, AppError> {
    let mut summary = RunSummary::default();
    loop {
        if options.cancel.load(Ordering::SeqCst) {
            warn!("cancel requested, stopping after {} frames", summary.frames);
            summary.cancelled = true;
            break;
        }
        if options.max_frames.is_some_and(|max| summary.frames >= max) {
            break;
        }
        let Some(frame) = source.next_frame()? else {
            break;
        };

        let (analysis, annotated) = processor.process(&frame.image);
        sink.write(&frame, &annotated)?;

        info!(
            "frame {} ({}): {} markers",
            frame.index,
            frame.name,
            analysis.markers.len()
        );
        summary.frames += 1;
        summary.markers_seen += analysis.markers.len();
        if !analysis.markers.is_empty() {
            summary.frames_with_markers += 1;
        }
        if options.keep_reports {
            summary.reports.push(FrameReport {
                index: frame.index,
                name: frame.name,
                analysis,
            });
        }
    }
    summary.average_fps = processor.average_fps();
    Ok(summary)
}
