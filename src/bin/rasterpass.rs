use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rasterpass", version)]
struct Cli {
    /// Emit debug logs on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a shader pipeline and write the result as a PNG.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Pipeline definition JSON.
    #[arg(long)]
    pipeline: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Start from this image instead of the pipeline background.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Override the number of worker bands per pass.
    #[arg(long)]
    threads: Option<usize>,

    /// Progress report interval in milliseconds.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Suppress progress output.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut def = rasterpass::PipelineDef::from_path(&args.pipeline)?;
    if let Some(threads) = args.threads {
        def.dispatch.bands = Some(threads);
        def.dispatch.validate()?;
    }
    let input = args
        .input
        .as_deref()
        .map(rasterpass::RasterBuffer::<rasterpass::Rgba8>::load_image)
        .transpose()?;

    let session = rasterpass::RenderSession::new();
    let mut engine = def.build_engine(session.token(), input)?;
    let quiet = args.quiet;
    let report = engine.dispatch_with_progress(Duration::from_millis(args.interval_ms), |p| {
        if !quiet {
            eprintln!("progress {:>5.1}%", p * 100.0);
        }
        Ok(())
    })?;
    if report.outcome != rasterpass::DispatchOutcome::Completed {
        anyhow::bail!("render of '{}' was aborted", args.pipeline.display());
    }

    engine
        .raster()
        .save_png(&args.out)
        .with_context(|| format!("save '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} passes, {} pixels in {:.1?})",
        args.out.display(),
        report.passes.iter().filter(|p| !p.skipped).count(),
        report.pixels_rendered,
        report.wall_time
    );
    Ok(())
}
