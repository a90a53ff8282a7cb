mod error;
mod layout;
mod parser;
mod pipeline;
mod planner;
mod render;
mod serialiser;
mod srt;

use crate::pipeline::{Milestone, RenderRequest};
use crate::planner::{Anchor, OverlayStyle, PlanOptions};
use crate::render::{FfmpegRenderer, RenderSettings};

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser as ClapParser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(()) => (),
        Err(err) => {
            eprintln!("Error: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Burn SRT subtitles into a vertical video")]
struct Cli {
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Log more (repeatable)")]
    verbose: u8,
    #[arg(short, long, global = true, help = "Only log errors")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the subtitles onto the video as `<stem>_with_subs.mp4`.
    Render {
        #[arg(long, value_name = "FILE", help = "Source video (*.mp4, *.avi, *.mkv)")]
        video: PathBuf,
        #[arg(long, value_name = "FILE", help = "Subtitle file (*.srt)")]
        subs: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        #[arg(long, default_value_t = 24, help = "Output frame rate")]
        fps: u32,
        #[arg(long, value_name = "PATH", help = "ffmpeg executable to use instead of the one on PATH")]
        ffmpeg: Option<PathBuf>,
    },
    /// Print the overlay plan for a subtitle file as JSON.
    Plan {
        #[arg(long, value_name = "FILE")]
        subs: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        #[arg(long, help = "Pretty-print the JSON")]
        pretty: bool,
    },
    /// Re-emit a subtitle file in canonical SRT form.
    Normalise {
        #[arg(long, value_name = "FILE")]
        subs: PathBuf,
        #[arg(
            short,
            long,
            value_name = "FILE",
            help = "The file to write to. If not supplied, the subtitles will be written to standard output.",
            default_value = "-"
        )]
        output: String,
    },
}

#[derive(Args)]
struct LayoutArgs {
    #[arg(long, default_value_t = 40, help = "Wrap captions at this many characters")]
    width: usize,
    #[arg(long, default_value_t = 650, help = "Caption offset from the top of the frame, in pixels")]
    y_offset: u32,
    #[arg(long, default_value = "Courier", help = "Monospace font family")]
    font: String,
    #[arg(long, default_value_t = 40, help = "Font size, in points")]
    font_size: u32,
    #[arg(long, help = "Remove formatting tags such as <i> and {\\an8} from captions")]
    strip_markup: bool,
}

impl LayoutArgs {
    fn into_options(self) -> PlanOptions {
        PlanOptions {
            width: self.width,
            anchor: Anchor {
                y: self.y_offset,
                ..Anchor::default()
            },
            style: OverlayStyle {
                font: self.font,
                font_size: self.font_size,
                ..OverlayStyle::default()
            },
            strip_markup: self.strip_markup,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Render {
            video,
            subs,
            layout,
            fps,
            ffmpeg,
        } => render(RenderRequest::new(video, subs), layout.into_options(), fps, ffmpeg),
        Command::Plan {
            subs,
            layout,
            pretty,
        } => {
            let plan = pipeline::plan_file(&subs, &layout.into_options())
                .with_context(|| format!("Failed to plan subtitles from '{}'", subs.display()))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if pretty {
                serde_json::to_writer_pretty(&mut out, &plan)?;
            } else {
                serde_json::to_writer(&mut out, &plan)?;
            }
            writeln!(out)?;
            Ok(())
        }
        Command::Normalise { subs, output } => {
            let data = std::fs::read_to_string(&subs)
                .with_context(|| format!("Failed to open input file: '{}'", subs.display()))?;
            let parsed = parser::parse(&data)
                .with_context(|| format!("Failed to parse SRT file: '{}'", subs.display()))?;
            if output == "-" {
                print!("{}", serialiser::to_srt_string(&parsed)?);
            } else {
                let dst = std::fs::File::create(&output)
                    .with_context(|| format!("Failed to create output file: '{}'", output))?;
                serialiser::serialise(&parsed, dst)?;
            }
            Ok(())
        }
    }
}

fn render(
    request: RenderRequest,
    options: PlanOptions,
    fps: u32,
    ffmpeg: Option<PathBuf>,
) -> Result<()> {
    let settings = RenderSettings {
        fps,
        ..RenderSettings::default()
    };
    let renderer = match ffmpeg {
        Some(path) => FfmpegRenderer::with_binary(path),
        None => FfmpegRenderer::new(),
    };

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {percent:>3}% {msg}")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Processing video...");

    let progress = |milestone: &Milestone| {
        pb.set_position((milestone.fraction() * 100.0) as u64);
        match milestone {
            Milestone::ParseComplete { entries } => {
                pb.set_message(format!("Parsed {} subtitles", entries))
            }
            Milestone::PlanComplete { overlays } => {
                pb.set_message(format!("Rendering {} captions...", overlays))
            }
            Milestone::RenderComplete { .. } => pb.set_message("Done"),
        }
    };

    match pipeline::process(&request, &options, &settings, &renderer, &progress) {
        Ok(output) => {
            pb.finish_and_clear();
            let name = output
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| output.display().to_string());
            println!("Video saved as: {}", name);
            Ok(())
        }
        Err(err) => {
            pb.abandon_with_message("Failed");
            Err(err).context("Failed to burn subtitles into video")
        }
    }
}
