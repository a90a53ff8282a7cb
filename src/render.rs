use crate::error::OverlayError;
use crate::planner::OverlaySpec;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub frame_width: u32,
    pub frame_height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            frame_width: 1080,
            frame_height: 1920,
            fps: 24,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub settings: RenderSettings,
}

/// Composites an overlay plan onto a video and encodes the result.
pub trait Renderer {
    fn render(&self, job: &RenderJob, plan: &[OverlaySpec]) -> Result<(), OverlayError>;
}

/// Renders by running the `ffmpeg` executable with one `drawtext` filter per overlay.
#[derive(Debug, Default, Clone)]
pub struct FfmpegRenderer {
    binary: Option<PathBuf>,
}

impl FfmpegRenderer {
    pub fn new() -> Self {
        Self { binary: None }
    }

    pub fn with_binary<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    fn locate(&self) -> Result<PathBuf, OverlayError> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => which::which("ffmpeg")
                .map_err(|err| OverlayError::Render(format!("ffmpeg not found on PATH: {}", err))),
        }
    }
}

impl Renderer for FfmpegRenderer {
    fn render(&self, job: &RenderJob, plan: &[OverlaySpec]) -> Result<(), OverlayError> {
        let ffmpeg = self.locate()?;

        // drawtext reads captions from files, which avoids filtergraph escaping of the text.
        let scratch = tempfile::tempdir()
            .map_err(|err| OverlayError::Render(format!("failed to create scratch dir: {}", err)))?;
        let mut text_files = Vec::with_capacity(plan.len());
        for (idx, spec) in plan.iter().enumerate() {
            let path = scratch.path().join(format!("caption_{:04}.txt", idx + 1));
            std::fs::write(&path, spec.text()).map_err(|err| {
                OverlayError::Render(format!("failed to write {}: {}", path.display(), err))
            })?;
            text_files.push(path);
        }

        let args = build_args(job, plan, &text_files);
        log::debug!("Running {} {:?}", ffmpeg.display(), args);

        let output = Command::new(&ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                OverlayError::Render(format!("failed to start {}: {}", ffmpeg.display(), err))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::debug!("ffmpeg stderr:\n{}", stderr);
            return Err(OverlayError::Render(format!(
                "ffmpeg exited with status {:?}: {}",
                output.status.code(),
                error_summary(&stderr)
            )));
        }

        log::info!("Wrote {}", job.output.display());
        Ok(())
    }
}

/// Command line for compositing `plan` onto the job's input. `text_files[i]`
/// holds the caption text of `plan[i]`.
pub fn build_args(job: &RenderJob, plan: &[OverlaySpec], text_files: &[PathBuf]) -> Vec<String> {
    let settings = &job.settings;
    vec![
        "-hide_banner".into(),
        "-y".into(),
        "-i".into(),
        job.input.to_string_lossy().to_string(),
        "-vf".into(),
        video_filter(settings, plan, text_files),
        "-r".into(),
        settings.fps.to_string(),
        "-c:v".into(),
        settings.video_codec.clone(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        settings.audio_codec.clone(),
        job.output.to_string_lossy().to_string(),
    ]
}

fn video_filter(settings: &RenderSettings, plan: &[OverlaySpec], text_files: &[PathBuf]) -> String {
    let (w, h) = (settings.frame_width, settings.frame_height);
    // Scale to the frame width and place the video at the top of a black canvas.
    let mut filters = vec![
        format!("scale={}:-2", w),
        format!("crop={}:'min(ih,{})':0:0", w, h),
        format!("pad={}:{}:0:0:color=black", w, h),
    ];
    for (spec, file) in plan.iter().zip(text_files) {
        filters.push(drawtext(spec, file));
    }
    filters.join(",")
}

fn drawtext(spec: &OverlaySpec, text_file: &Path) -> String {
    format!(
        "drawtext=textfile='{file}':expansion=none:font='{font}':fontsize={size}:\
         fontcolor={color}:box=1:boxcolor={background}:boxborderw=10:text_align=C:\
         x=(w-text_w)/2:y={y}:enable='between(t,{start},{end})'",
        file = escape_ffmpeg_path(text_file),
        font = spec.style.font.replace('\'', ""),
        size = spec.style.font_size,
        color = spec.style.color,
        background = spec.style.background,
        y = spec.anchor.y,
        start = format_time(spec.start),
        end = format_time(spec.end()),
    )
}

fn format_time(value: Duration) -> String {
    format!("{:.3}", value.as_secs_f64())
}

fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

/// The lines of ffmpeg's stderr that report errors, or its last line.
fn error_summary(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.contains("error") || line.contains("Error") || line.contains("ERROR"))
        .collect();
    if errors.is_empty() {
        lines.last().copied().unwrap_or("no output").to_string()
    } else {
        errors.join("\n")
    }
}
