use crate::{
    batch::{self, Batch},
    config::Config,
    engine::python::PythonEngine,
    engine::Engine,
    report::RunReport,
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "docbatch")]
#[command(about = "Idempotent batch PDF exporter (Docling, multi-format output bundles)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./docbatch.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the Python interpreter and Docling installation.
    Doctor {},
    /// Convert a single PDF into its output bundle.
    Convert {
        #[arg(long)]
        input: PathBuf,
    },
    /// Convert every unprocessed PDF in the input directory.
    Run {
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg)?;
            doctor(&cfg)
        }
        Command::Convert { input } => {
            let _guard = init_logging(&args, &cfg)?;
            convert(&cfg, input)
        }
        Command::Run { input_dir, out_dir } => {
            run(&args, &cfg, input_dir.as_deref(), out_dir.as_deref())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> PathBuf {
    if let Some(p) = user {
        return p.to_path_buf();
    }
    let default = PathBuf::from("docbatch.toml");
    if default.exists() {
        default
    } else {
        PathBuf::from("docbatch.example.toml")
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = if let Some(path) = resolve_log_path(cfg) {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(&path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.out_dir).join("docbatch.log"))
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = PythonEngine::new(cfg)?;
    let diag = engine.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn convert(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(input)?;

    let out_dir = PathBuf::from(&cfg.paths.out_dir);
    let stem = batch::stem_of(input)?;
    if !cfg.run.force && batch::is_processed(&out_dir, &stem) {
        info!("skipping {stem}: output bundle already present");
        return Ok(());
    }

    let engine = PythonEngine::new(cfg)?;
    let converter = Batch::new(cfg, engine);
    converter.convert_one(input)?;
    Ok(())
}

fn run(args: &Args, cfg: &Config, input_dir: Option<&Path>, out_dir: Option<&Path>) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(dir) = input_dir {
        cfg.paths.input_dir = dir.display().to_string();
    }
    if let Some(dir) = out_dir {
        cfg.paths.out_dir = dir.display().to_string();
    }

    let _guard = init_logging(args, &cfg)?;

    let engine = PythonEngine::new(&cfg)?;
    let converter = Batch::new(&cfg, engine);

    let started = now_rfc3339();
    let outcome = converter.run()?;
    let finished = now_rfc3339();

    let out_dir = PathBuf::from(&cfg.paths.out_dir);

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(&cfg).unwrap_or_default();
        std::fs::write(out_dir.join("effective-config.toml"), raw)?;
    }

    let report_path = out_dir.join(&cfg.output.report_filename);
    if cfg.output.write_report_json {
        let report = RunReport {
            started,
            finished,
            input_dir: cfg.paths.input_dir.clone(),
            out_dir: cfg.paths.out_dir.clone(),
            processed: outcome.summary.processed,
            skipped: outcome.summary.skipped,
            failed: outcome.summary.failed,
            documents: outcome.documents,
        };
        std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing {}", report_path.display()))?;
    }

    if cfg.run.print_summary {
        println!("processed={}", outcome.summary.processed);
        println!("skipped={}", outcome.summary.skipped);
        println!("failed={}", outcome.summary.failed);
    }

    if outcome.summary.failed > 0 {
        bail!("{} document(s) failed", outcome.summary.failed);
    }
    Ok(())
}

fn validate_input(input: &Path) -> Result<()> {
    if !input.exists() {
        bail!("input does not exist: {}", input.display());
    }
    match input.extension().and_then(|s| s.to_str()) {
        Some("pdf") => {}
        Some(other) => bail!("input is not a PDF (.{other}): {}", input.display()),
        None => warn!("input has no extension; assuming PDF: {}", input.display()),
    }
    Ok(())
}
