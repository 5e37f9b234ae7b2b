use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use ffrender::{FfmpegRenderer, OutputFormat, RenderConfig, RenderOutput, RenderRequest};

#[derive(Parser, Debug)]
#[command(name = "ffrender", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a composition spec or flat image to an encoded still image.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input: a `*.ffrender.json` spec, an image path, or an image URL.
    #[arg(long = "in")]
    in_file: String,

    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// Output format. Defaults to the output extension, else png.
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Encoder quality 1-100 (jpeg only).
    #[arg(long)]
    quality: Option<f64>,

    /// ffmpeg executable override (defaults to `ffmpeg` on PATH).
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Font file for text layers without a per-layer override.
    #[arg(long)]
    font_file: Option<PathBuf>,

    /// ffmpeg timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Log the full ffmpeg command line before spawning.
    #[arg(long, default_value_t = false)]
    log_command: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let format = match args.format {
        Some(f) => f,
        None => args
            .out
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
            .unwrap_or_default(),
    };

    let config = RenderConfig {
        ffmpeg_path: args.ffmpeg,
        font_file: args.font_file,
        timeout: Duration::from_millis(args.timeout_ms),
        log_command: args.log_command,
        temp_root: None,
    };

    let renderer = FfmpegRenderer::new(config);
    let request = RenderRequest {
        file: args.in_file,
        format: Some(format),
        quality: args.quality,
        multi_page: false,
        data: None,
    };

    let output = renderer.render_request(&request)?;
    let b64 = match output {
        RenderOutput::Single(b64) => b64,
        RenderOutput::Pages(mut pages) => pages.pop().unwrap_or_default(),
    };
    let bytes = {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(b64)
            .context("decode renderer output")?
    };

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("write output '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
