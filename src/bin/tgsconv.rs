use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "tgsconv", version)]
#[command(about = "Convert animated stickers (.tgs) to GIF, WebP and MP4")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a sticker to one or more outputs (requires Chrome; WebP/MP4 need `gif2webp`/`ffmpeg`).
    Convert(ConvertArgs),
    /// Print the animation header of a sticker.
    Inspect(InspectArgs),
    /// Write the decompressed animation JSON.
    Extract(ExtractArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input sticker.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path; the format comes from the extension (.gif, .webp, .mp4). Repeatable.
    #[arg(long = "out", required = true)]
    out: Vec<PathBuf>,

    /// Frame width in pixels.
    #[arg(long, default_value_t = 512)]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Fixed GIF frame delay in milliseconds (default: derived from the frame rate).
    #[arg(long)]
    delay_ms: Option<u32>,

    /// Play the GIF this many times instead of looping forever.
    #[arg(long)]
    loop_count: Option<u16>,

    /// Wait inserted between captured frames.
    #[arg(long, value_enum, default_value_t = PacingChoice::None)]
    pacing: PacingChoice,

    /// Settle time per frame for `--pacing settle`.
    #[arg(long, default_value_t = 50)]
    settle_ms: u64,

    /// How long to wait for the player to initialize.
    #[arg(long, default_value_t = 5000)]
    ready_timeout_ms: u64,

    /// Bound on each browser call (navigation, seek, screenshot).
    #[arg(long, default_value_t = 30_000)]
    capture_timeout_ms: u64,

    /// Player library: a URL or a local .js file to inline.
    #[arg(long)]
    player_script: Option<String>,

    /// Chrome/Chromium executable.
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Launch the browser without its sandbox (needed when running as root in containers).
    #[arg(long)]
    no_sandbox: bool,

    /// Show the browser window.
    #[arg(long)]
    headful: bool,

    /// WebP quality (0-100).
    #[arg(long, default_value_t = tgsconv::DEFAULT_WEBP_QUALITY)]
    webp_quality: u8,

    /// WebP encoder.
    #[arg(long, value_enum, default_value_t = WebpChoice::Auto)]
    webp_tool: WebpChoice,

    /// Keep existing output files instead of overwriting them.
    #[arg(long)]
    no_overwrite: bool,

    /// Directory for per-request scratch workspaces (default: system temp dir).
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input sticker.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input sticker.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PacingChoice {
    None,
    Settle,
    Realtime,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WebpChoice {
    Auto,
    Gif2webp,
    Ffmpeg,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Convert(args) => cmd_convert(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Extract(args) => cmd_extract(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let targets = args
        .out
        .iter()
        .map(tgsconv::OutputTarget::from_path)
        .collect::<Result<Vec<_>, _>>()?;

    let opts = convert_opts(&args)?;
    let converter = tgsconv::Converter::new(&args.in_path).with_opts(opts);
    let written = converter
        .convert(&targets)
        .with_context(|| format!("convert '{}'", args.in_path.display()))?;

    for path in written {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn convert_opts(args: &ConvertArgs) -> anyhow::Result<tgsconv::ConvertOpts> {
    let pacing = match args.pacing {
        PacingChoice::None => tgsconv::FramePacing::None,
        PacingChoice::Settle => {
            tgsconv::FramePacing::Settle(Duration::from_millis(args.settle_ms))
        }
        PacingChoice::Realtime => tgsconv::FramePacing::RealTime,
    };

    let render = tgsconv::RenderOpts {
        viewport: tgsconv::Viewport::new(args.width, args.height)?,
        ready_timeout: Duration::from_millis(args.ready_timeout_ms),
        capture_timeout: Duration::from_millis(args.capture_timeout_ms),
        pacing,
        player_script: args
            .player_script
            .as_deref()
            .map(tgsconv::PlayerScript::parse)
            .unwrap_or_default(),
        chrome: tgsconv::ChromeOpts {
            path: args.chrome.clone(),
            headless: !args.headful,
            sandbox: !args.no_sandbox,
        },
    };

    let transcode = tgsconv::TranscodeConfig {
        webp_quality: args.webp_quality,
        webp_tool: match args.webp_tool {
            WebpChoice::Auto => tgsconv::WebpTool::Auto,
            WebpChoice::Gif2webp => tgsconv::WebpTool::Gif2Webp,
            WebpChoice::Ffmpeg => tgsconv::WebpTool::Ffmpeg,
        },
        overwrite: !args.no_overwrite,
        ..tgsconv::TranscodeConfig::default()
    };

    let opts = tgsconv::ConvertOpts {
        render,
        gif_timing: args
            .delay_ms
            .map(tgsconv::GifTiming::FixedMs)
            .unwrap_or_default(),
        gif_loop: args
            .loop_count
            .map(tgsconv::GifLoop::Times)
            .unwrap_or_default(),
        transcode,
        work_root: args.work_dir.clone(),
        ..tgsconv::ConvertOpts::default()
    };
    opts.validate()?;
    Ok(opts)
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let anim = tgsconv::decode_file(&args.in_path)
        .with_context(|| format!("decode '{}'", args.in_path.display()))?;
    let header = anim.header();

    println!("name:       {}", header.name.as_deref().unwrap_or("-"));
    println!("in_point:   {}", header.in_point);
    println!("out_point:  {}", header.out_point);
    println!("frame_rate: {}", header.frame_rate);
    println!("frames:     {}", anim.frame_count());
    println!("duration:   {:.3}s", anim.duration_secs());
    match (header.width, header.height) {
        (Some(w), Some(h)) => println!("size:       {w}x{h}"),
        _ => println!("size:       -"),
    }
    let layers = anim
        .document()
        .get("layers")
        .and_then(|l| l.as_array())
        .map_or(0, Vec::len);
    println!("layers:     {layers}");
    Ok(())
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let anim = tgsconv::decode_file(&args.in_path)
        .with_context(|| format!("decode '{}'", args.in_path.display()))?;
    tgsconv::ensure_parent_dir(&args.out)?;
    anim.write_json(&args.out)
        .with_context(|| format!("write json '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
