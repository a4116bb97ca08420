//! timeql CLI
//!
//! Command-line interface for the report query compiler:
//! - Compile a query to JSON
//! - Check a query and point at errors
//! - Dump tokens or the syntax tree
//! - Generate a default config file

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use timeql::config::{Config, LoggingConfig};
use timeql::query::{ast, tokenize, Position, QueryError};
use timeql::Compiler;

#[derive(Parser)]
#[command(name = "timeql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile time-entry report queries")]
#[command(long_about = "timeql compiles report queries such as\n  WHERE year = 2024 SHOW project, SUM(hours) GROUP BY project\ninto a structured query and column definitions.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: user config dir, then ./timeql.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pub pretty: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a query to JSON: { query, columns, warnings }
    Compile(SourceArgs),

    /// Check a query for errors and warnings
    Check(SourceArgs),

    /// Print the token stream
    Tokens(SourceArgs),

    /// Print the syntax tree
    Ast {
        #[command(flatten)]
        source: SourceArgs,
        /// Print node statistics instead of the tree
        #[arg(long)]
        stats: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Where to read the query from
#[derive(Args)]
pub struct SourceArgs {
    /// Query file ("-" for stdin)
    pub file: Option<PathBuf>,

    /// Query text given inline
    #[arg(short, long, conflicts_with = "file")]
    pub expr: Option<String>,
}

impl SourceArgs {
    fn read(&self) -> anyhow::Result<String> {
        match (&self.expr, &self.file) {
            (Some(expr), _) => Ok(expr.clone()),
            (None, Some(path)) if path.as_os_str() == "-" => {
                let mut source = String::new();
                std::io::stdin()
                    .read_to_string(&mut source)
                    .context("Failed to read query from stdin")?;
                Ok(source)
            }
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read query file {:?}", path)),
            (None, None) => bail!("Provide a query FILE, '-' for stdin, or --expr QUERY"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Compile(source) => {
            let source = source.read()?;
            let compiled = Compiler::new(&config).compile(&source)?;
            print_json(&compiled, cli.pretty)?;
        }

        Commands::Check(source) => {
            let source = source.read()?;
            if !check(&Compiler::new(&config), &source) {
                std::process::exit(1);
            }
        }

        Commands::Tokens(source) => {
            let source = source.read()?;
            let tokens = tokenize(&source).map_err(QueryError::from)?;
            print_json(&tokens, cli.pretty)?;
        }

        Commands::Ast { source, stats } => {
            let source = source.read()?;
            let query = Compiler::new(&config).parse(&source)?;
            if stats {
                print_json(&ast::stats(&query), cli.pretty)?;
            } else {
                print_json(&query, cli.pretty)?;
            }
        }

        Commands::Config { output } => {
            let config = timeql::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays parseable
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("timeql={}", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

/// Report every problem with a query; returns whether it compiles
fn check(compiler: &Compiler, source: &str) -> bool {
    let query = match compiler.parse(source) {
        Ok(query) => query,
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(position) = e.position() {
                eprintln!("{}", caret(source, position));
            }
            return false;
        }
    };

    let validation = compiler.validate(&query);
    for warning in &validation.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &validation.errors {
        eprintln!("error: {}", error);
    }
    if !validation.is_valid() {
        return false;
    }

    match compiler.interpret(&query) {
        Ok(interpretation) => {
            for warning in &interpretation.warnings {
                eprintln!("warning: {}", warning);
            }
            println!("ok: {} clause(s)", query.clauses.len());
            true
        }
        Err(e) => {
            eprintln!("error: {}", e);
            false
        }
    }
}

/// The offending source line with a `^` under `position`
fn caret(source: &str, position: Position) -> String {
    let line = source.lines().nth(position.line.saturating_sub(1)).unwrap_or("");
    let gutter = position.line.to_string();
    let pad = " ".repeat(gutter.len());
    let indent: String = line
        .chars()
        .take(position.column.saturating_sub(1))
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();

    format!("{pad} |\n{gutter} | {line}\n{pad} | {indent}^")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_caret_points_at_column() {
        let rendered = caret("SHOW hours\nWHERE year 2024", Position::new(2, 12));
        assert_eq!(rendered, "  |\n2 | WHERE year 2024\n  |            ^");
    }

    #[test]
    fn test_caret_keeps_tabs() {
        let rendered = caret("\tVIEW x", Position::new(1, 7));
        assert_eq!(rendered, "  |\n1 | \tVIEW x\n  | \t     ^");
    }

    #[test]
    fn test_source_args_prefers_expr() {
        let args = SourceArgs {
            file: None,
            expr: Some("VIEW table".to_string()),
        };
        assert_eq!(args.read().unwrap(), "VIEW table");

        let args = SourceArgs {
            file: None,
            expr: None,
        };
        assert!(args.read().is_err());
    }
}
