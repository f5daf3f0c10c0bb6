//! Catalog Resolve CLI
//!
//! Resolves a directory (or single JSON file) of media library records and
//! reports the resulting catalog.

use std::path::PathBuf;
use std::sync::Arc;

use catalog_graph::{loader, CatalogConfig, LoadConfig, Resolver, SchemaRegistry};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-resolve")]
#[command(about = "Resolve flat media library records into a catalog graph")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve records and print a summary or export
    Resolve {
        /// Records directory or JSON file (defaults to input.records_dir)
        input: Option<PathBuf>,

        /// Skip bad records instead of aborting
        #[arg(long)]
        lenient: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "summary")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the kind processing order
    Order,

    /// Export the kind graph in DOT format
    Kinds,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
    Dot,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CatalogConfig::load_from(cli.config.as_deref())?;
    let registry = Arc::new(SchemaRegistry::media_library());

    match cli.command {
        Commands::Resolve {
            input,
            lenient,
            format,
            output,
        } => {
            let mut resolver_config = config.resolver.clone();
            if lenient {
                resolver_config.strict_mode = false;
            }
            let resolver = Resolver::new(registry, resolver_config);

            let input = input.unwrap_or_else(|| config.records_dir());
            let batch = loader::load_path(&input, &LoadConfig::from(&config.input))?;
            tracing::info!(records = batch.len(), input = %input.display(), "Loaded batch");

            let resolution = resolver.resolve(&batch)?;
            let catalog = &resolution.catalog;

            let rendered = match format {
                OutputFormat::Summary => {
                    let mut out = String::new();
                    for kind in catalog.kinds() {
                        out.push_str(&format!("  {:<10} {}\n", kind.name(), catalog.count(*kind)));
                    }
                    out.push_str(&format!("  fingerprint {}\n", catalog.fingerprint()?));
                    out
                }
                OutputFormat::Json => catalog.to_json()?,
                OutputFormat::Dot => catalog.to_dot(),
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, &rendered)?;
                    println!("✅ Wrote {:?}", path);
                }
                None => print!("{}", rendered),
            }

            if !resolution.is_clean() {
                eprintln!("⚠️  {} record(s) skipped:", resolution.errors.len());
                for error in &resolution.errors {
                    eprintln!("  - {}", error);
                }
            }
            Ok(())
        }

        Commands::Order => {
            let resolver = Resolver::new(registry, config.resolver);
            for (i, kind) in resolver.processing_order()?.iter().enumerate() {
                println!("{}. {}", i + 1, kind);
            }
            Ok(())
        }

        Commands::Kinds => {
            let resolver = Resolver::new(registry, config.resolver);
            print!("{}", resolver.kind_graph().to_dot());
            Ok(())
        }
    }
}
