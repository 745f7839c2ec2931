//! quintet-compile - compile a JSON column list to SQL
//!
//! Reads a compile request (`{"columns": [...]}` or a bare column array)
//! from a file or stdin and prints the compiled SELECT statement.
//!
//! Usage:
//!   quintet-compile --table tenant1 columns.json
//!   cat columns.json | quintet-compile --table tenant1

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use quintet::{EngineConfig, QueryColumn, QueryCompiler, QueryRequest};

#[derive(Parser)]
#[command(name = "quintet-compile", about = "Compile a column list to one self-join SELECT")]
struct Args {
    /// Tenant table to compile against
    #[arg(short, long)]
    table: String,

    /// JSON file with the column list; stdin when omitted
    input: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let payload = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    // Accept both the request envelope and a bare column array
    let columns: Vec<QueryColumn> = match serde_json::from_str::<QueryRequest>(&payload) {
        Ok(req) => req.columns,
        Err(_) => serde_json::from_str(&payload).context("parsing column list")?,
    };

    let compiled = QueryCompiler::new(EngineConfig::default())
        .compile(&columns, &args.table)
        .context("compiling query")?;

    if !compiled.forced.is_empty() {
        eprintln!(
            "warning: cross product for type(s) {:?} - no relationship found",
            compiled.forced
        );
    }
    println!("{}", compiled.sql);
    Ok(())
}
