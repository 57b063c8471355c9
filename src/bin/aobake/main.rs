//! aobake CLI - Bake ambient occlusion maps for procedural scenes.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use aobake::build_info;
use aobake::occlusion::bake_occlusion;
use aobake::postprocess::{gaussian_blur_async, invert_async};
use aobake::prelude::*;
use aobake::raster::{coverage, rasterize_async};
use aobake::scene::SCENE_NAMES;

/// Options of the `bake` command.
#[derive(Debug, Default)]
struct BakeArgs {
    scene: String,
    output: PathBuf,
    config: Option<PathBuf>,
    indices: Option<PathBuf>,
    size: Option<(u32, u32)>,
    quality: Option<u32>,
    seed: Option<u64>,
    workers: Option<usize>,
    no_blur: bool,
    no_invert: bool,
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("aobake");

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }

    let _guard = init_tracing(level);

    let Some((&cmd, rest)) = filtered_args.split_first() else {
        print_usage(prog);
        return Ok(());
    };

    match cmd {
        "bake" | "b" => cmd_bake(parse_bake_args(rest)?),
        "scenes" | "s" => {
            for name in SCENE_NAMES {
                println!("{name}");
            }
            Ok(())
        }
        "info" | "i" => {
            let Some(name) = rest.first() else {
                bail!("Usage: {prog} info <scene>");
            };
            cmd_info(name)
        }
        "config" | "c" => {
            println!("{}", BakeConfig::default().to_json_string()?);
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!(
                "aobake {} (built {} {} for {})",
                build_info::VERSION,
                build_info::DATE,
                build_info::TIME,
                build_info::TARGET
            );
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_usage(prog);
            Ok(())
        }
        other => {
            print_usage(prog);
            bail!("Unknown command: {other}");
        }
    }
}

/// Console logging, plus a Chrome trace in `trace.json` when `AOBAKE_TRACE=1`.
fn init_tracing(level: &str) -> Option<tracing_chrome::FlushGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let fmt = tracing_subscriber::fmt::layer().with_target(false);

    if env::var("AOBAKE_TRACE").ok().as_deref() != Some("1") {
        let _ = tracing_subscriber::registry().with(filter).with(fmt).try_init();
        return None;
    }

    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .file("trace.json")
        .build();
    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(chrome_layer)
        .try_init()
        .is_err()
    {
        return None;
    }
    Some(guard)
}

fn print_usage(prog: &str) {
    println!("aobake - Per-texel ambient occlusion baker");
    println!();
    println!("Usage: {} [options] <command> [args]", prog);
    println!();
    println!("Commands:");
    println!("  b, bake <scene> <out>   Bake a scene's target mesh into an image");
    println!("  s, scenes               List procedural scenes");
    println!("  i, info <scene>         Show scene meshes");
    println!("  c, config               Print the default configuration as JSON");
    println!("  h, help                 Show this help");
    println!("  --version               Show version and build info");
    println!();
    println!("Bake options:");
    println!("  --config <file.json>    Load settings (missing fields use defaults)");
    println!("  --size <W>x<H>          Output resolution");
    println!("  --quality <N>           Ray batches per texel (8 rays each)");
    println!("  --seed <N>              Fixed random seed");
    println!("  --workers <N>           Worker count");
    println!("  --indices <file>        Also write the triangle indices map");
    println!("  --no-blur               Skip the Gaussian blur");
    println!("  --no-invert             Keep 1 = occluded");
    println!();
    println!("Options:");
    println!("  -v, --verbose  Debug output");
    println!("  -vv, --trace   Trace output (very verbose)");
    println!("  -q, --quiet    Errors only");
    println!();
    println!("Output format follows the extension: png, bmp, tga, hdr, exr.");
}

fn parse_bake_args(args: &[&str]) -> anyhow::Result<BakeArgs> {
    let mut out = BakeArgs::default();
    let mut positional = Vec::new();
    let mut iter = args.iter().copied();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| iter.next().with_context(|| format!("{flag} needs a value"));
        match arg {
            "--config" => out.config = Some(PathBuf::from(value(arg)?)),
            "--indices" => out.indices = Some(PathBuf::from(value(arg)?)),
            "--size" => out.size = Some(parse_size(value(arg)?)?),
            "--quality" => out.quality = Some(value(arg)?.parse().context("--quality expects an integer")?),
            "--seed" => out.seed = Some(value(arg)?.parse().context("--seed expects an integer")?),
            "--workers" => out.workers = Some(value(arg)?.parse().context("--workers expects an integer")?),
            "--no-blur" => out.no_blur = true,
            "--no-invert" => out.no_invert = true,
            flag if flag.starts_with("--") => bail!("Unknown bake option: {flag}"),
            _ => positional.push(arg),
        }
    }

    let &[scene, output] = positional.as_slice() else {
        bail!("bake expects <scene> <output>, got {} arguments", positional.len());
    };
    out.scene = scene.to_string();
    out.output = PathBuf::from(output);
    Ok(out)
}

fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s.split_once(['x', 'X']).with_context(|| format!("size must look like 512x512, got {s}"))?;
    Ok((w.parse().context("bad width")?, h.parse().context("bad height")?))
}

fn load_config(args: &BakeArgs) -> anyhow::Result<BakeConfig> {
    let mut config = match &args.config {
        Some(path) => BakeConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => BakeConfig::default(),
    };
    if let Some((w, h)) = args.size {
        config.width = w;
        config.height = h;
    }
    if let Some(q) = args.quality {
        config.occlusion.quality = q;
    }
    if let Some(n) = args.workers {
        config.occlusion.worker_num = n;
    }
    if args.seed.is_some() {
        config.occlusion.seed = args.seed;
    }
    if args.no_blur {
        config.blur.num_pass = 0;
    }
    if args.no_invert {
        config.invert = false;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn cmd_bake(args: BakeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    // Fail on a bad extension before spending time on the bake
    let ext = ImageExtension::from_path(&args.output)?;

    let scene = Scene::named(&args.scene)?;
    tracing::info!(scene = %args.scene, target = %scene.target().stats(), "scene loaded");

    let mut service = CpuScene::new();
    scene.register(&mut service);
    service.commit()?;
    let service = Arc::new(service);

    let pool = WorkerPool::new(config.occlusion.worker_num);
    let mesh = Arc::new(scene.target().clone());
    let (w, h) = (config.width, config.height);

    let indices = rasterize_async(&pool, Arc::clone(&mesh), w, h, config.supersampling)?.wait()?;
    tracing::info!("indices map {}x{}, {:.1}% covered", w, h, coverage(&indices) * 100.0);

    let writer = ImageCrateWriter;
    if let Some(path) = &args.indices {
        writer.write_auto(path, &DynImage::from(indices.clone()))?;
    }

    let (mut map, stats) =
        bake_occlusion(&pool, service, mesh, &config.occlusion, Arc::new(indices), Image::new(w, h))?
            .wait_with_stats()?;
    tracing::debug!(?stats, "bake finished");

    let blur = &config.blur;
    if blur.num_pass > 0 {
        map = gaussian_blur_async(&pool, map, blur.num_pass, blur.kernel_size, blur.sigma)?.wait()?;
    }
    if config.invert {
        map = invert_async(&pool, map).wait()?;
    }

    writer.write(Path::new(&args.output), &DynImage::from(map), ext)?;
    println!("{}", args.output.display());
    Ok(())
}

fn cmd_info(name: &str) -> anyhow::Result<()> {
    let scene = Scene::named(name)?;
    println!("Scene: {name}");
    for (id, mesh) in scene.meshes().iter().enumerate() {
        let role = if id == scene.target_id() { "target" } else { "occluder" };
        println!("  mesh {id} ({role}): {}", mesh.stats());
    }
    Ok(())
}
