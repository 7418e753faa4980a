use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "heatmap", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a point set as a PNG heatmap.
    Render(RenderArgs),
    /// Write the configured gradient's 256-entry palette as a PNG strip.
    Palette(PaletteArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input points JSON (array of {"x", "y", "value"}).
    #[arg(long)]
    points: PathBuf,

    /// Optional configuration overrides JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Canvas width in pixels.
    #[arg(long)]
    width: u32,

    /// Canvas height in pixels.
    #[arg(long)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Backend id (overrides the configuration file).
    #[arg(long)]
    backend: Option<String>,
}

#[derive(Parser, Debug)]
struct PaletteArgs {
    /// Optional configuration overrides JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Strip height in pixels.
    #[arg(long, default_value_t = 16)]
    height: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Palette(args) => cmd_palette(args),
    }
}

fn read_points_json(path: &Path) -> anyhow::Result<Vec<heatmap::Point>> {
    let f = File::open(path).with_context(|| format!("open points '{}'", path.display()))?;
    let points: Vec<heatmap::Point> = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse points JSON '{}'", path.display()))?;
    Ok(points)
}

fn read_overrides(path: Option<&Path>) -> anyhow::Result<heatmap::ConfigOverrides> {
    let Some(path) = path else {
        return Ok(heatmap::ConfigOverrides::default());
    };
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    heatmap::ConfigOverrides::from_json(&s)
        .with_context(|| format!("parse config JSON '{}'", path.display()))
}

fn write_png(path: &Path, img: &image::RgbaImage) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let points = read_points_json(&args.points)?;
    let mut overrides = read_overrides(args.config.as_deref())?;
    if let Some(id) = args.backend {
        overrides.backend = Some(id);
    }
    let config = heatmap::HeatmapConfig::from_overrides(overrides)?;

    let raster = heatmap::render_heatmap(&points, args.width, args.height, &config)?;
    tracing::info!(
        points = points.len(),
        width = raster.width,
        height = raster.height,
        backend = %config.backend,
        "rendered heatmap"
    );

    write_png(&args.out, &raster.into_rgba_image()?)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_palette(args: PaletteArgs) -> anyhow::Result<()> {
    if args.height == 0 {
        anyhow::bail!("--height must be > 0");
    }
    let config = heatmap::HeatmapConfig::from_overrides(read_overrides(args.config.as_deref())?)?;
    let strip = heatmap::Palette::from_gradient(&config.gradient).to_rgba_strip();
    let data = strip.repeat(args.height as usize);

    let img = image::RgbaImage::from_raw(heatmap::PALETTE_LEN as u32, args.height, data)
        .ok_or_else(|| anyhow::anyhow!("palette strip does not match 256x{}", args.height))?;
    write_png(&args.out, &img)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
