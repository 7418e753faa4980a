use std::time::{Duration, Instant};

use anyhow::Context as _;
use sha2::Digest as _;

#[derive(Clone, Debug)]
struct BenchArgs {
    width: u32,
    height: u32,
    points: u32,
    radius: f64,
    blur: f64,
    seed: u64,
    warmup: u32,
    repeats: u32,
    backend: String,
}

#[derive(Clone, Debug, Default)]
struct RunMetrics {
    stamp_build: Duration,
    composite: Duration,
    colorize: Duration,
    render_cached: Duration,
    render_total: Duration,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.width == 0 || args.height == 0 {
        anyhow::bail!("--width/--height must be > 0");
    }
    if args.points == 0 {
        anyhow::bail!("--points must be > 0");
    }

    let config = heatmap::HeatmapConfig::from_overrides(heatmap::ConfigOverrides {
        backend: Some(args.backend.clone()),
        radius: Some(args.radius),
        blur: Some(args.blur),
        ..heatmap::ConfigOverrides::default()
    })
    .context("build bench config")?;
    let points = scatter_points(&args);

    if args.warmup > 0 {
        eprintln!("warmup: {} run(s)", args.warmup);
        for _ in 0..args.warmup {
            let _ = run_once(&args, &config, &points)?;
        }
    }

    eprintln!(
        "bench: {repeats} run(s) ({profile} build), {w}x{h}, {n} points, radius={radius}, blur={blur}, backend={backend}",
        repeats = args.repeats,
        profile = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        w = args.width,
        h = args.height,
        n = args.points,
        radius = args.radius,
        blur = args.blur,
        backend = args.backend,
    );

    let mut runs = Vec::<RunMetrics>::with_capacity(args.repeats as usize);
    let mut digest: Option<String> = None;
    for i in 0..args.repeats {
        let (metrics, hex) = run_once(&args, &config, &points)?;
        match &digest {
            None => {
                eprintln!("output sha256: {hex}");
                digest = Some(hex);
            }
            Some(first) if *first != hex => {
                anyhow::bail!("run {i} produced a different raster ({hex} != {first})")
            }
            Some(_) => {}
        }
        runs.push(metrics);
    }

    report_percentiles(&runs);
    Ok(())
}

fn run_once(
    args: &BenchArgs,
    config: &heatmap::HeatmapConfig,
    points: &[heatmap::Point],
) -> anyhow::Result<(RunMetrics, String)> {
    let mut m = RunMetrics::default();

    let t = Instant::now();
    let _ = heatmap::Stamp::build(config.radius, config.blur)?;
    m.stamp_build = t.elapsed();

    let canvas = heatmap::Canvas::new(args.width, args.height)?;
    let range = heatmap::ValueRange::from_points(points)
        .ok_or_else(|| anyhow::anyhow!("bench point set has no finite values"))?;
    let mut stamps = heatmap::StampCache::new(1);
    let mut buffer = heatmap::IntensityBuffer::new(canvas)?;

    let t = Instant::now();
    heatmap::composite(&mut buffer, points, config, range, &mut stamps)?;
    m.composite = t.elapsed();

    let t = Instant::now();
    let raster = heatmap::colorize(&buffer, config)?;
    m.colorize = t.elapsed();

    let t = Instant::now();
    let full = heatmap::render_heatmap(points, args.width, args.height, config)?;
    m.render_total = t.elapsed();
    if full != raster {
        anyhow::bail!("staged and one-shot renders disagree");
    }

    let mut renderer =
        heatmap::HeatmapRenderer::new(config.clone(), heatmap::RenderSettings::default())?;
    let _ = renderer.render(points, args.width, args.height)?;
    let t = Instant::now();
    let _ = renderer.render(points, args.width, args.height)?;
    m.render_cached = t.elapsed();

    Ok((m, sha256_hex(&raster.data)))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut s = String::with_capacity(digest.len() * 2);
    for b in digest {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Clustered point cloud: a few hot spots plus uniform background noise.
fn scatter_points(args: &BenchArgs) -> Vec<heatmap::Point> {
    let unit = |h: u64| (h >> 11) as f64 / (1u64 << 53) as f64;
    let (w, h) = (f64::from(args.width), f64::from(args.height));

    let hubs: Vec<(f64, f64)> = (0..4u64)
        .map(|i| {
            (
                unit(mix64(args.seed ^ (0x100 + i))) * w,
                unit(mix64(args.seed ^ (0x200 + i))) * h,
            )
        })
        .collect();

    (0..u64::from(args.points))
        .map(|i| {
            let a = unit(mix64(args.seed ^ (i * 4)));
            let b = unit(mix64(args.seed ^ (i * 4 + 1)));
            let c = unit(mix64(args.seed ^ (i * 4 + 2)));
            let (x, y) = if i % 4 == 0 {
                (a * w, b * h)
            } else {
                let (hx, hy) = hubs[(i as usize) % hubs.len()];
                let spread = 0.1 * w.min(h);
                (hx + (a - 0.5) * 2.0 * spread, hy + (b - 0.5) * 2.0 * spread)
            };
            heatmap::Point::new(x, y, (c * 100.0).round())
        })
        .collect()
}

fn parse_args() -> anyhow::Result<BenchArgs> {
    let mut args = std::env::args().skip(1);

    let mut out = BenchArgs {
        width: 1024,
        height: 768,
        points: 5_000,
        radius: 25.0,
        blur: 0.95,
        seed: 1,
        warmup: 1,
        repeats: 50,
        backend: heatmap::DEFAULT_BACKEND_ID.to_string(),
    };

    while let Some(a) = args.next() {
        match a.as_str() {
            "--width" => out.width = parse_u32(args.next(), "--width")?,
            "--height" => out.height = parse_u32(args.next(), "--height")?,
            "--points" => out.points = parse_u32(args.next(), "--points")?,
            "--radius" => out.radius = parse_f64(args.next(), "--radius")?,
            "--blur" => out.blur = parse_f64(args.next(), "--blur")?,
            "--seed" => out.seed = u64::from(parse_u32(args.next(), "--seed")?),
            "--warmup" => out.warmup = parse_u32(args.next(), "--warmup")?,
            "--repeats" => out.repeats = parse_u32(args.next(), "--repeats")?,
            "--backend" => {
                out.backend = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing value for --backend"))?
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => anyhow::bail!("unknown arg '{a}' (try --help)"),
        }
    }

    Ok(out)
}

fn print_help() {
    eprintln!(
        r#"heatmap-bench

Renders a synthetic point cloud repeatedly and reports p50/p90/p99 for each stage.

Usage:
  cargo run -q --release
  cargo run -q --release -- --points 20000 --radius 40
  cargo run -q --release -- --width 256 --height 256 --repeats 500

Args:
  --width N      (default 1024)
  --height N     (default 768)
  --points N     (default 5000)
  --radius R     (default 25)
  --blur B       (default 0.95)
  --seed N       (default 1)
  --warmup N     (default 1)
  --repeats N    (default 50)
  --backend ID   (default software)
"#
    );
}

fn parse_u32(v: Option<String>, flag: &str) -> anyhow::Result<u32> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<u32>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}

fn parse_f64(v: Option<String>, flag: &str) -> anyhow::Result<f64> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<f64>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}

fn report_percentiles(runs: &[RunMetrics]) {
    type Getter = fn(&RunMetrics) -> Duration;
    type Field = (&'static str, Getter);

    fn collect(runs: &[RunMetrics], f: fn(&RunMetrics) -> Duration) -> Vec<Duration> {
        let mut v = runs.iter().map(f).collect::<Vec<_>>();
        v.sort_by_key(|d| d.as_nanos());
        v
    }

    fn p(v: &[Duration], p: f64) -> Duration {
        if v.is_empty() {
            return Duration::ZERO;
        }
        let n = v.len();
        let rank = (p * (n as f64)).ceil().clamp(1.0, n as f64) as usize;
        v[rank - 1]
    }

    fn fmt_ms(d: Duration) -> String {
        format!("{:.3}ms", d.as_secs_f64() * 1000.0)
    }

    let fields: &[Field] = &[
        ("stamp_build", |m| m.stamp_build),
        ("composite", |m| m.composite),
        ("colorize", |m| m.colorize),
        ("render_cached", |m| m.render_cached),
        ("render_total", |m| m.render_total),
    ];

    eprintln!("\npercentiles across runs (p50/p90/p99):");
    for (name, getter) in fields {
        let v = collect(runs, *getter);
        let p50 = p(&v, 0.50);
        let p90 = p(&v, 0.90);
        let p99 = p(&v, 0.99);
        eprintln!(
            "  {name:14} p50={p50:>10}  p90={p90:>10}  p99={p99:>10}",
            name = *name,
            p50 = fmt_ms(p50),
            p90 = fmt_ms(p90),
            p99 = fmt_ms(p99)
        );
    }
}
