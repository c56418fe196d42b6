//! sqlloom CLI - compile extracted entities to SQL
//!
//! Usage:
//!   sqlloom compile --schema <schema.json> --input <extraction.json> [--dialect <dialect>]
//!   sqlloom validate --schema <schema.json>
//!
//! Examples:
//!   sqlloom compile --schema funds_schema.json --input question.json
//!   sqlloom compile --schema funds_schema.json --input question.json --dialect duckdb --output verbose
//!   sqlloom validate --schema funds_schema.json

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use sqlloom::compile::Compiler;
use sqlloom::config::Settings;
use sqlloom::intent::Intent;
use sqlloom::resolve::Entity;
use sqlloom::schema::SchemaGraph;
use sqlloom::sql::{Dialect, SqlDialect};

#[derive(Parser)]
#[command(name = "sqlloom")]
#[command(about = "sqlloom - compiles semantically-resolved entities to dialect-aware SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an extraction file against a schema
    Compile {
        /// Path to the schema definition (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Path to the extraction file: {"entities": [...], "intent": {...}}
        #[arg(short, long)]
        input: PathBuf,

        /// SQL dialect to generate
        #[arg(short, long, default_value = "postgres")]
        dialect: DialectArg,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// Validate a schema definition without compiling anything
    Validate {
        /// Path to the schema definition (JSON)
        #[arg(short, long)]
        schema: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Ansi,
    Postgres,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Ansi => Dialect::Ansi,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output SQL with compile metadata as comments
    Verbose,
}

/// The upstream extraction payload.
#[derive(Deserialize)]
struct Extraction {
    entities: Vec<Entity>,
    intent: Intent,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlloom=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            schema,
            input,
            dialect,
            output,
        } => cmd_compile(schema, input, dialect, output).await,
        Commands::Validate { schema } => cmd_validate(schema),
    }
}

fn load_schema(path: &PathBuf) -> Result<SchemaGraph, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Error reading schema '{}': {}", path.display(), e))?;
    SchemaGraph::from_json(&json)
        .map_err(|e| format!("Invalid schema '{}': {}", path.display(), e))
}

async fn cmd_compile(
    schema_path: PathBuf,
    input: PathBuf,
    dialect: DialectArg,
    output: OutputFormat,
) -> ExitCode {
    let schema = match load_schema(&schema_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let extraction: Extraction = match fs::read_to_string(&input)
        .map_err(|e| format!("Error reading input '{}': {}", input.display(), e))
        .and_then(|json| {
            serde_json::from_str(&json)
                .map_err(|e| format!("Invalid extraction '{}': {}", input.display(), e))
        }) {
        Ok(x) => x,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let dialect: Dialect = dialect.into();
    settings.dialect = Some(dialect.name().to_string());

    let compiler = match Compiler::new(Arc::new(schema), settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Compiler error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match compiler.compile(&extraction.entities, &extraction.intent).await {
        Ok(compiled) => {
            match output {
                OutputFormat::Sql => println!("{}", compiled.sql),
                OutputFormat::Verbose => {
                    println!("-- sqlloom compiled SQL");
                    println!("-- Schema: {}", schema_path.display());
                    println!("-- Tables: {}", compiled.tables_used.join(", "));
                    println!(
                        "-- Joins: {}, filters: {}",
                        compiled.join_count, compiled.where_count
                    );
                    if !compiled.aggregations_applied.is_empty() {
                        println!(
                            "-- Aggregations: {}",
                            compiled.aggregations_applied.join(", ")
                        );
                    }
                    for warning in &compiled.warnings {
                        println!("-- Warning: {}", warning);
                    }
                    println!();
                    println!("{}", compiled.sql);
                }
            }
            if matches!(output, OutputFormat::Sql) {
                for warning in &compiled.warnings {
                    eprintln!("warning: {}", warning);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(schema_path: PathBuf) -> ExitCode {
    match load_schema(&schema_path) {
        Ok(schema) => {
            let tables = schema.table_names();
            println!("Schema OK: {} tables", tables.len());
            for name in tables {
                if let Some(table) = schema.table(name) {
                    println!("  {} ({} columns)", name, table.columns.len());
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
