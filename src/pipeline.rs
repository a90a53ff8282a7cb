use crate::error::OverlayError;
use crate::parser;
use crate::planner::{build_plan, OverlaySpec, PlanOptions};
use crate::render::{RenderJob, RenderSettings, Renderer};

use std::path::{Path, PathBuf};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv"];
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt"];

const OUTPUT_SUFFIX: &str = "_with_subs.mp4";

/// The two files a run works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub video_path: PathBuf,
    pub subtitle_path: PathBuf,
}

impl RenderRequest {
    pub fn new<V: Into<PathBuf>, S: Into<PathBuf>>(video_path: V, subtitle_path: S) -> Self {
        Self {
            video_path: video_path.into(),
            subtitle_path: subtitle_path.into(),
        }
    }

    /// `<dir>/<stem>_with_subs.mp4`, next to the source video.
    pub fn output_path(&self) -> PathBuf {
        let stem = self
            .video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.video_path
            .with_file_name(format!("{}{}", stem, OUTPUT_SUFFIX))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Milestone {
    ParseComplete { entries: usize },
    PlanComplete { overlays: usize },
    RenderComplete { output: PathBuf },
}

impl Milestone {
    /// Overall progress in `0.0..=1.0` once this milestone is reached.
    pub fn fraction(&self) -> f32 {
        match self {
            Milestone::ParseComplete { .. } => 0.1,
            Milestone::PlanComplete { .. } => 0.6,
            Milestone::RenderComplete { .. } => 1.0,
        }
    }
}

pub trait ProgressCallback {
    fn on_milestone(&self, milestone: &Milestone);
}

impl<F: Fn(&Milestone)> ProgressCallback for F {
    fn on_milestone(&self, milestone: &Milestone) {
        self(milestone)
    }
}

/// Parse and plan a subtitle file without rendering anything.
pub fn plan_file(path: &Path, options: &PlanOptions) -> Result<Vec<OverlaySpec>, OverlayError> {
    let data = std::fs::read_to_string(path)?;
    let subs = parser::parse(&data)?;
    build_plan(&subs, options)
}

/// Burn the request's subtitles into its video. Returns the written file.
pub fn process(
    request: &RenderRequest,
    options: &PlanOptions,
    settings: &RenderSettings,
    renderer: &dyn Renderer,
    progress: &dyn ProgressCallback,
) -> Result<PathBuf, OverlayError> {
    validate(request)?;

    let data = std::fs::read_to_string(&request.subtitle_path)?;
    let subs = parser::parse(&data)?;
    if subs.is_empty() {
        return Err(OverlayError::Parse(format!(
            "No subtitles found in '{}'",
            request.subtitle_path.display()
        )));
    }
    progress.on_milestone(&Milestone::ParseComplete {
        entries: subs.len(),
    });

    let plan = build_plan(&subs, options)?;
    progress.on_milestone(&Milestone::PlanComplete {
        overlays: plan.len(),
    });

    let job = RenderJob {
        input: request.video_path.clone(),
        output: request.output_path(),
        settings: settings.clone(),
    };
    log::info!(
        "Rendering {} overlays onto {}",
        plan.len(),
        job.input.display()
    );
    renderer.render(&job, &plan)?;
    progress.on_milestone(&Milestone::RenderComplete {
        output: job.output.clone(),
    });

    Ok(job.output)
}

fn validate(request: &RenderRequest) -> Result<(), OverlayError> {
    check_input("video", &request.video_path, VIDEO_EXTENSIONS)?;
    check_input("subtitle file", &request.subtitle_path, SUBTITLE_EXTENSIONS)
}

fn check_input(what: &'static str, path: &Path, allowed: &[&str]) -> Result<(), OverlayError> {
    if path.as_os_str().is_empty() {
        return Err(OverlayError::MissingInput {
            what,
            detail: "no file selected".to_string(),
        });
    }

    let supported = path
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            allowed.iter().any(|a| ext.eq_ignore_ascii_case(a))
        })
        .unwrap_or(false);
    if !supported {
        return Err(OverlayError::UnsupportedInput {
            what,
            path: path.to_path_buf(),
            expected: allowed
                .iter()
                .map(|a| format!("*.{}", a))
                .collect::<Vec<_>>()
                .join(" "),
        });
    }

    if !path.is_file() {
        return Err(OverlayError::MissingInput {
            what,
            detail: format!("'{}' does not exist", path.display()),
        });
    }
    Ok(())
}
