use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use mapgif::{CancelToken, Framing, RenderConfig, Wad};

#[derive(Parser, Debug)]
#[command(name = "mapgif", version, about = "Doom map GIF maker")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one map as an animated GIF.
    Render(RenderArgs),
    /// Render every map in a WAD, skipping maps that fail.
    All(AllArgs),
    /// List the maps in a WAD.
    List(ListArgs),
    /// Print the block structure of a GIF.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input WAD file.
    wad: PathBuf,

    /// Map marker name, e.g. MAP01 or E1M1 (case-insensitive).
    map: String,

    /// Output GIF path [default: <WAD>_<MAP>.gif].
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct AllArgs {
    /// Input WAD file.
    wad: PathBuf,

    /// Directory for the GIFs [default: next to the WAD].
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Input WAD file.
    wad: PathBuf,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// GIF file to inspect.
    gif: PathBuf,

    /// Print one line per frame.
    #[arg(long)]
    frames: bool,
}

#[derive(clap::Args, Debug)]
struct StyleArgs {
    /// Render settings JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image width in pixels, border included.
    #[arg(long)]
    width: Option<u32>,

    /// Border size in pixels.
    #[arg(long)]
    border: Option<u32>,

    /// Length of each frame in seconds.
    #[arg(long)]
    frame_secs: Option<f64>,

    /// How long the finished map is held before looping, in seconds.
    #[arg(long)]
    loop_delay_secs: Option<f64>,

    /// Play the animation once instead of looping.
    #[arg(long)]
    no_loop: bool,

    /// One frame per traced group of lines instead of one per line.
    #[arg(long)]
    per_shape: bool,

    /// Redraw two-sided lines when their second sector is traced.
    #[arg(long)]
    draw_twice: bool,

    /// Outline each frame's bounding box (debugging).
    #[arg(long)]
    show_bbox: bool,

    /// Make the background colour transparent.
    #[arg(long)]
    transparent_bg: bool,
}

impl StyleArgs {
    fn to_config(&self) -> anyhow::Result<RenderConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("read render config '{}'", path.display()))?;
                RenderConfig::from_json_str(&json)
                    .with_context(|| format!("parse render config '{}'", path.display()))?
            }
            None => RenderConfig::default(),
        };

        if let Some(v) = self.width {
            cfg.image_width = v;
        }
        if let Some(v) = self.border {
            cfg.border = v;
        }
        if let Some(v) = self.frame_secs {
            cfg.frame_secs = v;
        }
        if let Some(v) = self.loop_delay_secs {
            cfg.loop_delay_secs = v;
        }
        cfg.looping &= !self.no_loop;
        if self.per_shape {
            cfg.framing = Framing::PerShape;
        }
        cfg.draw_twice |= self.draw_twice;
        cfg.show_bbox |= self.show_bbox;
        cfg.transparent_background |= self.transparent_bg;

        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::All(args) => cmd_all(args),
        Command::List(args) => cmd_list(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Ctrl-C stops the render at the next run boundary; the GIF is still finalized.
fn install_cancel_handler() -> CancelToken {
    let token = CancelToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    token
}

fn open_wad(path: &Path) -> anyhow::Result<Wad> {
    Wad::from_file(path).with_context(|| format!("unable to load WAD '{}'", path.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = args.style.to_config()?;
    let wad = open_wad(&args.wad)?;
    let map = wad
        .load_map(&args.map)
        .with_context(|| format!("load map {} from '{}'", args.map, args.wad.display()))?;

    let out = args
        .out
        .unwrap_or_else(|| mapgif::default_output_path(&args.wad, &map.name));
    let cancel = install_cancel_handler();

    let start = Instant::now();
    let stats = mapgif::render_map_to_file(&map, &out, &cfg, &cancel)
        .with_context(|| format!("render {}", map.name))?;

    if stats.cancelled {
        eprintln!("Rendering canceled.");
    }
    eprintln!(
        "Rendered {} linedefs into {} frames in {:.3} seconds.",
        stats.segments_drawn,
        stats.frames,
        start.elapsed().as_secs_f64()
    );
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_all(args: AllArgs) -> anyhow::Result<()> {
    let cfg = args.style.to_config()?;
    let wad = open_wad(&args.wad)?;
    let cancel = install_cancel_handler();

    let report = mapgif::render_wad(&wad, &args.wad, args.out_dir.as_deref(), &cfg, &cancel)?;

    for (name, path, stats) in &report.rendered {
        eprintln!("{name}: {} frames, wrote {}", stats.frames, path.display());
    }
    for (name, err) in &report.failed {
        eprintln!("Error in {name}: {err}.");
    }
    if !report.skipped.is_empty() {
        eprintln!("Rendering canceled; skipped {}.", report.skipped.join(", "));
    }

    if !report.failed.is_empty() {
        anyhow::bail!(
            "{} of {} maps failed",
            report.failed.len(),
            report.rendered.len() + report.failed.len()
        );
    }
    Ok(())
}

fn cmd_list(args: ListArgs) -> anyhow::Result<()> {
    let wad = open_wad(&args.wad)?;
    for name in wad.map_names() {
        let format = wad
            .map_format(name)
            .map(|f| format!("{f:?}"))
            .unwrap_or_default();
        println!("{name}\t{format}");
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(&args.gif).with_context(|| format!("read GIF '{}'", args.gif.display()))?;
    let summary = mapgif::gif::scan(&bytes)
        .with_context(|| format!("parse GIF '{}'", args.gif.display()))?;

    println!(
        "{}x{}, {} frames, looping: {}, terminated: {}, {} bytes",
        summary.width,
        summary.height,
        summary.frames.len(),
        summary.looping,
        summary.terminated,
        bytes.len()
    );
    if args.frames {
        for (i, f) in summary.frames.iter().enumerate() {
            let delay = f.control.map(|c| c.delay.centis()).unwrap_or(0);
            println!(
                "{i:>6}  {}x{} at {},{}  delay {delay}cs",
                f.width, f.height, f.left, f.top
            );
        }
    }
    Ok(())
}
