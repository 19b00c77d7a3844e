//! quill: developer CLI for the query compiler
//!
//! # Usage
//!
//! ```bash
//! # Compile a JSON query model against a mapping schema
//! quill compile query.json --schema schema.toml
//!
//! # List the method signatures handled out of the box
//! quill methods
//!
//! # Check whether a signature has a transformer
//! quill signature "String.Substring(Int32, Int32)"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use quill::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Compile query trees into parameterized SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    quill compile query.json --schema schema.toml
    quill compile query.json --schema schema.toml --format json
    quill signature 'String.Contains(String)'")]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON query model
    Compile {
        /// Path to the query model (JSON)
        query: PathBuf,

        /// Mapping schema (TOML)
        #[arg(short, long, env = "QUILL_SCHEMA")]
        schema: PathBuf,

        /// Compile options (TOML); defaults to the user config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List the default method signatures
    Methods,
    /// Parse a method signature and look it up
    Signature {
        /// e.g. "String.Substring(Int32, Int32)" or "DateTime.Year"
        text: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Compile {
            query,
            schema,
            config,
            format,
        } => compile_query(query, schema, config.as_deref(), *format),
        Commands::Methods => {
            list_methods();
            Ok(())
        }
        Commands::Signature { text } => check_signature(text),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "quill=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();
}

fn compile_query(
    query: &Path,
    schema: &Path,
    config: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let content = std::fs::read_to_string(query)
        .with_context(|| format!("failed to read query model {}", query.display()))?;
    let model: QueryModel = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse query model {}", query.display()))?;
    let resolver = SchemaMappingResolver::new(
        MappingSchema::load(schema).with_context(|| format!("failed to load schema {}", schema.display()))?,
    );
    let options = match config {
        Some(path) => CompileOptions::load(path)?,
        None => CompileOptions::load_default()?,
    };
    let registry = MethodCallTransformerRegistry::with_defaults();

    let command = compile(&model, &registry, &resolver, &options)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&command)?),
        OutputFormat::Text => {
            println!("{}", "Generated SQL:".green().bold());
            println!("{}", command.command_text.white());
            if !command.parameters.is_empty() {
                println!();
                println!("{}", "Parameters:".cyan());
                for parameter in &command.parameters {
                    println!("  {} = {}", parameter.name, parameter.value.to_string().yellow());
                }
            }
        }
    }
    Ok(())
}

fn list_methods() {
    let registry = MethodCallTransformerRegistry::with_defaults();
    println!(
        "{}",
        format!("{} registered signatures", registry.len()).cyan().bold()
    );
    for signature in registry.signatures() {
        println!("  {}", signature);
    }
}

fn check_signature(text: &str) -> Result<()> {
    let signature: MethodSignature = text.parse()?;
    let registry = MethodCallTransformerRegistry::with_defaults();
    if registry.contains(&signature) {
        println!("{} {}", "✓".green(), signature.to_string().white());
    } else {
        println!("{} {} {}", "✗".red(), signature.to_string().white(), "(no transformer)".dimmed());
    }
    Ok(())
}
