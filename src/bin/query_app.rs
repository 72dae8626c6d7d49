//! CLI application running structured queries against an index snapshot.

use std::fs;
use std::path::PathBuf;

use annograph::SearchEngine;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "annograph-query")]
#[command(about = "Run structured queries against an indexed corpus")]
#[command(version)]
struct Args {
    /// Query file: one query per line
    #[arg(short = 'q', long)]
    queries: PathBuf,

    /// Index directory produced by annograph-index
    #[arg(short = 'i', long, default_value = "./index")]
    index: PathBuf,

    /// Maximum matches reported per query
    #[arg(short = 'n', long, default_value_t = 100)]
    num_results: usize,

    /// Print full JSON instead of the short summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let snapshot = args.index.join("index.json");
    let engine = SearchEngine::open(&snapshot)
        .with_context(|| format!("opening index snapshot {}", snapshot.display()))?;
    info!("opened index with {} documents", engine.num_docs());

    let queries = fs::read_to_string(&args.queries)
        .with_context(|| format!("reading {}", args.queries.display()))?;

    for query in queries.lines() {
        let query = query.trim();
        if query.is_empty() {
            continue;
        }
        println!("--- Query: {query}");
        match engine.search(query, args.num_results) {
            Ok(response) => {
                if args.json {
                    println!("{}", response.to_json_pretty());
                } else {
                    print!("{}", response.summary());
                }
            }
            Err(e) => {
                eprintln!("query failed: {e}");
            }
        }
    }
    Ok(())
}
