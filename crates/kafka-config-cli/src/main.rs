//! kafka-config: resolve provider tags in Kafka client configuration files
//!
//! Every input is resolved before anything is written. Any failure exits
//! non-zero and leaves no output behind.

mod logger;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kafka_config_core::{load_document, Resolver, ResolverSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::logger::TracingLogger;
use crate::output::{write_all, OutputFormat, Rendered};

#[derive(Parser, Debug)]
#[command(name = "kafka-config")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration documents to resolve (YAML, or JSON by extension)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Resolver settings file (YAML); environment overrides still apply
    #[arg(short, long, env = "KAFKA_CONFIG_SETTINGS")]
    settings: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Directory to write resolved documents into; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "kafka_config=debug" } else { "kafka_config=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Args) -> Result<()> {
    let settings = match &args.settings {
        Some(path) => ResolverSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => ResolverSettings::from_env(),
    };
    tracing::debug!(target: "kafka_config", ?settings, "Loaded resolver settings");

    let resolver = Resolver::new(&settings).with_logger(Arc::new(TracingLogger));

    let mut rendered = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let document = load_document(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let resolution = resolver
            .resolve_with_report(document)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        for stage in resolution.stages.iter().filter(|s| !s.skipped()) {
            tracing::info!(
                target: "kafka_config",
                file = %path.display(),
                backend = stage.provider.backend_name(),
                resolved = stage.resolved,
                "Stage complete"
            );
        }
        rendered.push(Rendered {
            source: path.clone(),
            contents: args.format.render(&resolution.document)?,
        });
    }

    match &args.output {
        Some(dir) => {
            for path in write_all(dir, &rendered, args.format)? {
                tracing::info!(target: "kafka_config", "Wrote {}", path.display());
            }
        }
        None => {
            let separate = args.format == OutputFormat::Yaml && rendered.len() > 1;
            for output in &rendered {
                if separate {
                    println!("---");
                }
                print!("{}", output.contents);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run(args)
}
